//! Role entity - Named job roles that own an access record.
//!
//! Role names are unique within a department. `(name, department_id)` is backed
//! by a unique index created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    /// Row identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Role name (e.g. "Sales Representative")
    pub name: String,
    /// Department the role belongs to, if any
    pub department_id: Option<i64>,
    /// Free-form description
    pub description: Option<String>,
    /// Administrators may manage users and roles
    pub is_admin: bool,
    /// When the role was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Role and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A role owns exactly one access record
    #[sea_orm(has_one = "super::access::Entity")]
    Access,
    /// Many users share one role
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
    /// Each role sits in at most one department
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_delete = "Cascade"
    )]
    Department,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::access::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Access.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
