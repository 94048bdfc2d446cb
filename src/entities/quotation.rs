//! Quotation entity - Priced offers sent to customers.
//!
//! A quotation owns its line items and revisions. Its grand total is never stored;
//! it is recomputed from the line items, `global_discount` and `shipping_charges`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quotation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotations")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business identifier, e.g. `QUO001`
    #[sea_orm(unique)]
    pub quotation_number: String,
    /// Customer the quotation is addressed to
    pub customer_id: i64,
    /// Customer purchase-order reference
    pub customer_po_reference: Option<String>,
    /// "Standard", "Blanket" or "Service"
    pub quotation_type: String,
    /// Date of issue
    pub quotation_date: Date,
    /// Last day the offer is valid
    pub expiry_date: Date,
    /// ISO currency code
    pub currency: String,
    /// Payment terms (e.g. "Net 30")
    pub payment_terms: Option<String>,
    /// Expected delivery date
    pub expected_delivery: Option<Date>,
    /// Current status, see [`crate::core::status::QuotationStatus`]
    pub status: String,
    /// Number of content revisions recorded so far
    pub revision_count: i32,
    /// Header-level discount percentage
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub global_discount: Decimal,
    /// Flat shipping charge added after the header discount
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub shipping_charges: Decimal,
    /// User who created the quotation
    pub created_by: i64,
    /// When the quotation was created
    pub created_at: DateTimeUtc,
    /// When the quotation was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Quotation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each quotation belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// One quotation has many line items
    #[sea_orm(has_many = "super::quotation_item::Entity")]
    Items,
    /// One quotation has many revisions
    #[sea_orm(has_many = "super::quotation_revision::Entity")]
    Revisions,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::quotation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::quotation_revision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Revisions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
