//! Status history entity - Append-only log of document status changes.
//!
//! One row is written for every successful transition of a quotation or sales
//! order. Rows are never updated; they only disappear together with their document.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "status_history")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"quotation"` or `"sales_order"`
    pub document_kind: String,
    /// Row id of the document
    pub document_id: i64,
    /// Status before the transition
    pub from_status: String,
    /// Status after the transition
    pub to_status: String,
    /// Action that was requested (e.g. `"submit"`)
    pub action: String,
    /// User who performed the transition
    pub actor_id: i64,
    /// When the transition happened
    pub recorded_at: DateTimeUtc,
}

/// History rows point at documents of several kinds, so no foreign key is declared
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
