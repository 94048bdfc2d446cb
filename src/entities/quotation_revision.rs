//! Quotation revision entity - Snapshots of a quotation's content.
//!
//! Revisions are recorded explicitly; status changes never create one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quotation revision database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotation_revisions")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Revised quotation
    pub quotation_id: i64,
    /// 1-based revision number
    pub revision_number: i32,
    /// Revision date
    pub date: Date,
    /// User who recorded the revision
    pub created_by: i64,
    /// Status of the quotation when the revision was taken
    pub status: String,
    /// Free-form note
    pub comment: String,
    /// Line items at revision time
    pub snapshot: Json,
    /// When the revision was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `QuotationRevision` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each revision belongs to one quotation
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
