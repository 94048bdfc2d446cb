//! Document comment entity - Discussion threads on quotations and sales orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Document comment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_comments")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"quotation"` or `"sales_order"`
    pub document_kind: String,
    /// Row id of the document
    pub document_id: i64,
    /// User who wrote the comment
    pub author_id: i64,
    /// Comment text
    pub body: String,
    /// When the comment was written
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
