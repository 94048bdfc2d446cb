//! Sales order line item entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales order line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_order_items")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning order
    pub sales_order_id: i64,
    /// Position within the order, starting at 0
    pub position: i32,
    /// Ordered product
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

/// Defines relationships between `SalesOrderItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order and goes away with it
    #[sea_orm(
        belongs_to = "super::sales_order::Entity",
        from = "Column::SalesOrderId",
        to = "super::sales_order::Column::Id",
        on_delete = "Cascade"
    )]
    SalesOrder,
}

impl Related<super::sales_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
