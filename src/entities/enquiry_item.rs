//! Enquiry item entity.
//!
//! `total_amount` is always `selling_price * quantity`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enquiry item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enquiry_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub enquiry_id: i64,
    pub position: i32,
    pub item_code: String,
    pub product_description: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub cost_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub selling_price: Decimal,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,
}

/// Defines relationships between `EnquiryItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one enquiry
    #[sea_orm(
        belongs_to = "super::enquiry::Entity",
        from = "Column::EnquiryId",
        to = "super::enquiry::Column::Id",
        on_delete = "Cascade"
    )]
    Enquiry,
}

impl Related<super::enquiry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enquiry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
