//! Product entity - The sellable catalog.
//!
//! Products are identified by a `CVB` series code and carry the default unit price
//! and tax percentage used when they are added to a quotation or sales order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business identifier, e.g. `CVB0001`
    #[sea_orm(unique)]
    pub product_code: String,
    /// Display name
    pub name: String,
    /// Kind of product (e.g. "Goods", "Service")
    pub product_type: String,
    /// Free-form description
    pub description: Option<String>,
    /// Catalog category
    pub category: Option<String>,
    /// Unit of measure (e.g. "pcs", "kg")
    pub uom: String,
    /// Default unit price
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    /// Default tax percentage
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_pct: Decimal,
    /// Inactive products cannot be added to new documents
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Products are referenced by line items but own nothing themselves
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
