//! Sales order entity - Confirmed customer orders.
//!
//! Orders are created directly or by converting an approved quotation. Like
//! quotations, the grand total is recomputed from the line items on every read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business identifier, e.g. `SO0001`
    #[sea_orm(unique)]
    pub order_number: String,
    /// Ordering customer
    pub customer_id: i64,
    /// Quotation this order was converted from, if any
    pub quotation_id: Option<i64>,
    /// Order date
    pub order_date: Date,
    /// "Standard", "Rush" or "Backorder"
    pub order_type: String,
    /// ISO currency code
    pub currency: String,
    /// How the customer pays
    pub payment_method: Option<String>,
    /// Payment due date
    pub due_date: Option<Date>,
    /// Expected delivery date
    pub expected_delivery: Option<Date>,
    /// Carrier or delivery method
    pub shipping_method: Option<String>,
    /// Carrier tracking number
    pub tracking_number: Option<String>,
    /// Notes visible to staff only
    pub internal_notes: Option<String>,
    /// Notes printed for the customer
    pub customer_notes: Option<String>,
    /// Header-level discount percentage
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub global_discount: Decimal,
    /// Flat shipping charge added after the header discount
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub shipping_charges: Decimal,
    /// Current status, see [`crate::core::status::SalesOrderStatus`]
    pub status: String,
    /// User who created the order
    pub created_by: i64,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SalesOrder` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// One order has many line items
    #[sea_orm(has_many = "super::sales_order_item::Entity")]
    Items,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::sales_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
