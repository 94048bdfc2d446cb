//! Enquiry entity - Inbound sales leads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enquiry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enquiries")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business identifier, e.g. `ENQ001`
    #[sea_orm(unique)]
    pub enquiry_number: String,
    /// Contact given name
    pub first_name: String,
    /// Contact family name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone number
    pub phone_number: String,
    /// Contact city
    pub city: String,
    /// "Product" or "Service"
    pub enquiry_type: String,
    /// What the contact asked about
    pub description: Option<String>,
    /// Lead source (e.g. "WebSite", "Referral")
    pub source: Option<String>,
    /// "New", "In Process" or "Closed"
    pub status: String,
    /// "High", "Medium" or "Low"
    pub priority: Option<String>,
    /// User who captured the enquiry
    pub created_by: i64,
    /// When the enquiry was captured
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Enquiry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One enquiry has many items
    #[sea_orm(has_many = "super::enquiry_item::Entity")]
    Items,
}

impl Related<super::enquiry_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
