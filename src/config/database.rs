//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs, unique constraints included.

use crate::entities::{
    Access, Customer, Department, DocumentComment, Enquiry, EnquiryItem, Product, Quotation, QuotationItem,
    QuotationRevision, Role, SalesOrder, SalesOrderItem, SequenceCounter, StatusHistory, User, role,
};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
    sea_query::Index,
};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/erp.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Connects to the given database URL.
///
/// In-memory databases are limited to a single pooled connection: every new
/// connection to `sqlite::memory:` would otherwise open its own empty database.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    if database_url.contains(":memory:") {
        options.max_connections(1);
    }
    options.sqlx_logging(false);

    debug!(%database_url, "Connecting to database");
    Database::connect(options).await.map_err(Into::into)
}

/// Establishes a connection using [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    connect(&get_database_url()).await
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Role names are unique per department. `SQLite` treats NULLs as distinct, so
/// roles without a department are checked in [`crate::core::user::create_role`].
async fn create_role_name_index(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let statement = Index::create()
        .name("idx_roles_name_department")
        .table(Role)
        .col(role::Column::Name)
        .col(role::Column::DepartmentId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table the core needs, parents before children. Safe to run on an
/// existing database.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, SequenceCounter).await?;
    create_table(db, &schema, Department).await?;
    create_table(db, &schema, Role).await?;
    create_role_name_index(db).await?;
    create_table(db, &schema, Access).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Customer).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Enquiry).await?;
    create_table(db, &schema, EnquiryItem).await?;
    create_table(db, &schema, Quotation).await?;
    create_table(db, &schema, QuotationItem).await?;
    create_table(db, &schema, QuotationRevision).await?;
    create_table(db, &schema, SalesOrder).await?;
    create_table(db, &schema, SalesOrderItem).await?;
    create_table(db, &schema, StatusHistory).await?;
    create_table(db, &schema, DocumentComment).await?;

    info!("Database tables ensured");
    Ok(())
}
