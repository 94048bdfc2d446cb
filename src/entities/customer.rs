//! Customer entity - CRM customer records.
//!
//! Every customer carries a human-readable `customer_code` from the `CUS` series
//! (or supplied by the caller / bulk import) and a unique email address.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business identifier, e.g. `CUS0001`
    #[sea_orm(unique)]
    pub customer_code: String,
    /// Given name
    pub first_name: String,
    /// Family name, may be empty
    pub last_name: String,
    /// Customer classification (e.g. "Individual", "Business")
    pub customer_type: String,
    /// Company the customer belongs to, if any
    pub company_name: Option<String>,
    /// Lifecycle status (e.g. "Active", "Inactive")
    pub status: String,
    /// Contact email, unique across customers
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone number
    pub phone_number: Option<String>,
    /// City of the primary address
    pub city: Option<String>,
    /// Credit limit granted to the customer
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub credit_limit: Decimal,
    /// Credit still available, defaults to zero
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub available_limit: Decimal,
    /// When the customer was created
    pub created_at: DateTimeUtc,
    /// When the customer was last edited
    pub last_edit_date: DateTimeUtc,
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One customer has many quotations
    #[sea_orm(has_many = "super::quotation::Entity")]
    Quotations,
    /// One customer has many sales orders
    #[sea_orm(has_many = "super::sales_order::Entity")]
    SalesOrders,
}

impl Related<super::quotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotations.def()
    }
}

impl Related<super::sales_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
