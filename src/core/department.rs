//! Departments - Organisational units that own roles.
//!
//! Departments are addressed by their short code. Deleting a department removes
//! its roles as well; users holding those roles keep their accounts without a role.

use crate::{
    config::roles::{Config, DepartmentConfig},
    core::{user, validate},
    entities::{Department, Role, department, role},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Longest accepted department code.
pub const MAX_CODE_CHARS: usize = 10;
/// Longest accepted department name.
pub const MAX_NAME_CHARS: usize = 100;

/// Fields for a new department.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDepartment {
    /// Unique short code
    pub code: String,
    /// Unique display name
    pub department_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl From<&DepartmentConfig> for NewDepartment {
    fn from(config: &DepartmentConfig) -> Self {
        Self {
            code: config.code.clone(),
            department_name: config.department_name.clone(),
            description: config.description.clone(),
            branch: config.branch.clone(),
        }
    }
}

/// Partial update of a department. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepartmentUpdate {
    pub code: Option<String>,
    pub department_name: Option<String>,
    /// Blank clears the description
    pub description: Option<String>,
    /// Blank clears the branch
    pub branch: Option<String>,
}

/// A department with the roles defined in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentDetail {
    pub department: department::Model,
    pub roles: Vec<role::Model>,
}

fn department_not_found(key: &str) -> Error {
    Error::NotFound {
        entity: "department",
        key: key.to_string(),
    }
}

/// Looks a department up by row id.
pub async fn get_department_by_id<C>(db: &C, department_id: i64) -> Result<Option<department::Model>>
where
    C: ConnectionTrait,
{
    Department::find_by_id(department_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks a department up by its code.
pub async fn get_department_by_code<C>(db: &C, code: &str) -> Result<Option<department::Model>>
where
    C: ConnectionTrait,
{
    Department::find()
        .filter(department::Column::Code.eq(code.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks a department up by code, then by name.
pub async fn find_department<C>(db: &C, key: &str) -> Result<Option<department::Model>>
where
    C: ConnectionTrait,
{
    let key = key.trim();
    Department::find()
        .filter(
            Condition::any()
                .add(department::Column::Code.eq(key))
                .add(department::Column::DepartmentName.eq(key)),
        )
        .order_by_asc(department::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves an optional department code or name to its row id. Blank means none.
///
/// # Errors
/// Returns [`Error::NotFound`] when no department matches.
pub async fn resolve<C>(db: &C, key: Option<&str>) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let department = find_department(db, key)
        .await?
        .ok_or_else(|| department_not_found(key))?;
    Ok(Some(department.id))
}

async fn check_unique<C>(db: &C, code: Option<&str>, name: Option<&str>, own_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let other = |model: &department::Model| Some(model.id) != own_id;
    if let Some(code) = code {
        let clash = Department::find()
            .filter(department::Column::Code.eq(code))
            .one(db)
            .await?;
        if clash.as_ref().is_some_and(other) {
            return Err(Error::DuplicateKey {
                field: "code".to_string(),
                value: code.to_string(),
            });
        }
    }
    if let Some(name) = name {
        let clash = Department::find()
            .filter(department::Column::DepartmentName.eq(name))
            .one(db)
            .await?;
        if clash.as_ref().is_some_and(other) {
            return Err(Error::DuplicateKey {
                field: "department_name".to_string(),
                value: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Creates a department.
///
/// # Errors
/// Returns an error if:
/// - The code or name is blank or too long
/// - The code or name belongs to another department
#[instrument(skip(db, input), fields(code = %input.code))]
pub async fn create_department<C>(db: &C, input: NewDepartment) -> Result<department::Model>
where
    C: ConnectionTrait,
{
    let code = validate::bounded_text("code", &input.code, MAX_CODE_CHARS)?;
    let department_name = validate::bounded_text("department_name", &input.department_name, MAX_NAME_CHARS)?;
    check_unique(db, Some(&code), Some(&department_name), None).await?;

    let now = Utc::now();
    let department = department::ActiveModel {
        code: Set(code.clone()),
        department_name: Set(department_name.clone()),
        description: Set(validate::optional_text(input.description)),
        branch: Set(validate::optional_text(input.branch)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        Error::from_unique_insert(e, &[("code", code.as_str()), ("department_name", department_name.as_str())])
    })?;

    info!(department_id = department.id, "Created department");
    Ok(department)
}

/// Loads a department by code with its roles ordered by name.
pub async fn get_department(db: &DatabaseConnection, code: &str) -> Result<Option<DepartmentDetail>> {
    let Some(department) = get_department_by_code(db, code).await? else {
        return Ok(None);
    };
    let roles = Role::find()
        .filter(role::Column::DepartmentId.eq(department.id))
        .order_by_asc(role::Column::Name)
        .all(db)
        .await?;
    Ok(Some(DepartmentDetail { department, roles }))
}

/// All departments in creation order.
pub async fn list_departments(db: &DatabaseConnection) -> Result<Vec<department::Model>> {
    Department::find()
        .order_by_asc(department::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to the department with `code`.
///
/// # Errors
/// Returns an error if a provided field is invalid, the department does not
/// exist, or the new code or name belongs to another department.
pub async fn update_department(
    db: &DatabaseConnection,
    code: &str,
    update: DepartmentUpdate,
) -> Result<department::Model> {
    let new_code = update
        .code
        .map(|v| validate::bounded_text("code", &v, MAX_CODE_CHARS))
        .transpose()?;
    let new_name = update
        .department_name
        .map(|v| validate::bounded_text("department_name", &v, MAX_NAME_CHARS))
        .transpose()?;

    let existing = get_department_by_code(db, code)
        .await?
        .ok_or_else(|| department_not_found(code))?;
    check_unique(db, new_code.as_deref(), new_name.as_deref(), Some(existing.id)).await?;

    let mut department: department::ActiveModel = existing.into();
    if let Some(new_code) = new_code {
        department.code = Set(new_code);
    }
    if let Some(new_name) = new_name {
        department.department_name = Set(new_name);
    }
    if let Some(description) = update.description {
        department.description = Set(validate::optional_text(Some(description)));
    }
    if let Some(branch) = update.branch {
        department.branch = Set(validate::optional_text(Some(branch)));
    }
    department.updated_at = Set(Utc::now());

    department.update(db).await.map_err(Into::into)
}

/// Deletes a department together with its roles.
pub async fn delete_department(db: &DatabaseConnection, code: &str) -> Result<()> {
    let txn = db.begin().await?;
    let department = get_department_by_code(&txn, code)
        .await?
        .ok_or_else(|| department_not_found(code))?;
    let roles = Role::find()
        .filter(role::Column::DepartmentId.eq(department.id))
        .all(&txn)
        .await?;
    for role in &roles {
        user::remove_role(&txn, role).await?;
    }
    Department::delete_by_id(department.id).exec(&txn).await?;
    txn.commit().await?;

    info!(code = %department.code, roles = roles.len(), "Deleted department");
    Ok(())
}

/// Creates the configured departments whose code is not stored yet. Returns the
/// number created.
pub async fn seed_departments(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    let mut created = 0;
    for entry in &config.departments {
        if get_department_by_code(db, &entry.code).await?.is_some() {
            continue;
        }
        create_department(db, NewDepartment::from(entry)).await?;
        created += 1;
    }
    if created > 0 {
        info!(created, "Seeded departments");
    }
    Ok(created)
}
