//! Shared test utilities for the ERP core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    api::AppState,
    core::{
        access::{FeatureArea, PermissionGroup, Principal},
        customer::{self, NewCustomer},
        document::LineRequest,
        product::{self, NewProduct},
        report::TabularTextRenderer,
        sales_order::{self, NewSalesOrder, SalesOrderDetail},
        user::{self, NewRole, NewUser},
    },
    entities,
    errors::Result,
    notify::RecordingMailer,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::config::database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a test-friendly tracing subscriber. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Handler state over a fresh database, recording emails instead of sending them.
pub async fn setup_test_state() -> Result<AppState> {
    let db = setup_test_db().await?;
    Ok(AppState::new(
        db,
        Arc::new(RecordingMailer::default()),
        Arc::new(TabularTextRenderer),
    ))
}

/// Creates a business customer.
///
/// # Arguments
/// * `code` - Explicit `CUS` code, or `None` to allocate the next one
/// * `email` - Unique email address
pub async fn create_custom_customer(
    db: &DatabaseConnection,
    code: Option<&str>,
    email: &str,
) -> Result<entities::customer::Model> {
    customer::create_customer(
        db,
        NewCustomer {
            customer_code: code.map(str::to_string),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            customer_type: "Business".to_string(),
            company_name: Some("Hopper Systems".to_string()),
            status: "Active".to_string(),
            email: email.to_string(),
            phone_number: None,
            city: Some("Arlington".to_string()),
            credit_limit: Decimal::from(5000),
            available_limit: None,
        },
    )
    .await
}

/// Creates a product with the given price and tax rate.
///
/// # Defaults
/// * type: "Goods"
/// * uom: "Nos"
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    unit_price: Decimal,
    tax_pct: Decimal,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            product_type: "Goods".to_string(),
            description: None,
            category: None,
            uom: "Nos".to_string(),
            unit_price,
            tax_pct,
        },
    )
    .await
}

/// Creates an active user `{username}@example.com` with an optional role.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role_id: Option<i64>,
) -> Result<entities::user::Model> {
    user::create_user(
        db,
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            role_id,
        },
    )
    .await
}

/// Inserts a role without any access record.
pub async fn create_bare_role(db: &DatabaseConnection, name: &str) -> Result<entities::role::Model> {
    entities::role::ActiveModel {
        name: Set(name.to_string()),
        department_id: Set(None),
        description: Set(None),
        is_admin: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a user holding a dedicated role with exactly `grants`.
pub async fn create_user_with_access(
    db: &DatabaseConnection,
    username: &str,
    grants: &[(FeatureArea, PermissionGroup)],
) -> Result<entities::user::Model> {
    let role = user::create_role(
        db,
        NewRole {
            name: format!("{username} role"),
            grants: grants.to_vec(),
            ..NewRole::default()
        },
    )
    .await?;
    create_test_user(db, username, Some(role.role.id)).await
}

/// Creates an administrator with full access to every area.
pub async fn create_test_admin(db: &DatabaseConnection) -> Result<entities::user::Model> {
    let role = user::create_role(
        db,
        NewRole {
            name: "Test Administrator".to_string(),
            is_admin: true,
            grants: FeatureArea::ALL
                .into_iter()
                .map(|area| (area, PermissionGroup::FULL))
                .collect(),
            ..NewRole::default()
        },
    )
    .await?;
    create_test_user(db, "admin", Some(role.role.id)).await
}

/// Fresh database with an administrator, one customer and one product.
///
/// # Defaults
/// * customer: `CUS0001`, "buyer@example.com"
/// * product: "Catalog Widget", 100.00 at 5% tax
pub async fn setup_with_catalog() -> Result<(
    DatabaseConnection,
    Principal,
    entities::customer::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let admin = create_test_admin(&db).await?;
    let customer = create_custom_customer(&db, None, "buyer@example.com").await?;
    let product = create_custom_product(&db, "Catalog Widget", Decimal::from(100), Decimal::from(5)).await?;
    Ok((db, Principal { user_id: admin.id }, customer, product))
}

/// [`setup_with_catalog`] wrapped in handler state.
pub async fn setup_state_with_catalog() -> Result<(
    AppState,
    Principal,
    entities::customer::Model,
    entities::product::Model,
)> {
    let (db, admin, customer, product) = setup_with_catalog().await?;
    let state = AppState::new(
        db,
        Arc::new(RecordingMailer::default()),
        Arc::new(TabularTextRenderer),
    );
    Ok((state, admin, customer, product))
}

/// Creates a draft `Standard` USD order with two units of one product.
pub async fn create_test_sales_order(
    db: &DatabaseConnection,
    author: Principal,
    customer_id: i64,
    product_id: i64,
) -> Result<SalesOrderDetail> {
    sales_order::create_sales_order(
        db,
        author,
        NewSalesOrder {
            customer_id,
            order_date: None,
            order_type: "Standard".to_string(),
            currency: "USD".to_string(),
            payment_method: None,
            due_date: None,
            expected_delivery: None,
            shipping_method: None,
            tracking_number: None,
            internal_notes: None,
            customer_notes: None,
            global_discount: Decimal::ZERO,
            shipping_charges: Decimal::ZERO,
            items: vec![LineRequest::new(product_id, 2)],
        },
    )
    .await
}
