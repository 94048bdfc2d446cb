//! Quotation line item entity.
//!
//! `total` is a cache of [`crate::core::totals::line_total`] over the other monetary
//! fields; it is rewritten every time the item is saved and is never set directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quotation line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotation_items")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning quotation
    pub quotation_id: i64,
    /// Position within the quotation, starting at 0
    pub position: i32,
    /// Product being quoted
    pub product_id: i64,
    /// Product name captured when the line was saved
    pub product_name: String,
    /// Unit of measure
    pub uom: String,
    /// Price per unit
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    /// Quantity (never negative)
    pub quantity: i32,
    /// Discount percentage, 0 to 100
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_pct: Decimal,
    /// Tax percentage
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_pct: Decimal,
    /// Derived line total
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
}

/// Defines relationships between `QuotationItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one quotation and goes away with it
    #[sea_orm(
        belongs_to = "super::quotation::Entity",
        from = "Column::QuotationId",
        to = "super::quotation::Column::Id",
        on_delete = "Cascade"
    )]
    Quotation,
}

impl Related<super::quotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
