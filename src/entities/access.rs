//! Access entity - The flat permission matrix owned by a role.
//!
//! One group of five booleans per feature area. `*_full_access` is stored as set by
//! the administrator; the access gate treats it as implying the four narrower
//! actions without rewriting the row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access database model
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role_access")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning role, one access record per role
    #[sea_orm(unique)]
    pub role_id: i64,
    // dashboard
    pub dashboard_full_access: bool,
    pub dashboard_view: bool,
    pub dashboard_create: bool,
    pub dashboard_edit: bool,
    pub dashboard_delete: bool,
    // task
    pub task_full_access: bool,
    pub task_view: bool,
    pub task_create: bool,
    pub task_edit: bool,
    pub task_delete: bool,
    // project tracker
    pub project_tracker_full_access: bool,
    pub project_tracker_view: bool,
    pub project_tracker_create: bool,
    pub project_tracker_edit: bool,
    pub project_tracker_delete: bool,
    // onboarding
    pub onboarding_full_access: bool,
    pub onboarding_view: bool,
    pub onboarding_create: bool,
    pub onboarding_edit: bool,
    pub onboarding_delete: bool,
    // attendance
    pub attendance_full_access: bool,
    pub attendance_view: bool,
    pub attendance_create: bool,
    pub attendance_edit: bool,
    pub attendance_delete: bool,
    // customer
    pub customer_full_access: bool,
    pub customer_view: bool,
    pub customer_create: bool,
    pub customer_edit: bool,
    pub customer_delete: bool,
    // product
    pub product_full_access: bool,
    pub product_view: bool,
    pub product_create: bool,
    pub product_edit: bool,
    pub product_delete: bool,
    // enquiry
    pub enquiry_full_access: bool,
    pub enquiry_view: bool,
    pub enquiry_create: bool,
    pub enquiry_edit: bool,
    pub enquiry_delete: bool,
    // quotation
    pub quotation_full_access: bool,
    pub quotation_view: bool,
    pub quotation_create: bool,
    pub quotation_edit: bool,
    pub quotation_delete: bool,
    // sales order
    pub sales_order_full_access: bool,
    pub sales_order_view: bool,
    pub sales_order_create: bool,
    pub sales_order_edit: bool,
    pub sales_order_delete: bool,
}

/// Defines relationships between Access and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each access record belongs to one role
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id",
        on_delete = "Cascade"
    )]
    Role,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
