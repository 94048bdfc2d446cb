//! Users and roles - HR-side management of who can act and with which grants.
//!
//! Every role owns exactly one access record. [`create_role`] writes both in one
//! transaction; [`set_role_access`] rewrites the grants of an existing role. Role
//! names are unique within their department.

use crate::{
    config::roles::{Config, RoleConfig},
    core::{
        access::{self, FeatureArea, PermissionGroup, Principal},
        department, validate,
    },
    entities::{Access, Role, User, access as access_entity, role, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Fields for a new role.
#[derive(Debug, Clone, Default)]
pub struct NewRole {
    /// Role name, unique within the department
    pub name: String,
    /// Owning department (row id)
    pub department_id: Option<i64>,
    pub description: Option<String>,
    /// May manage users and roles
    pub is_admin: bool,
    /// Granted groups; areas not listed get nothing
    pub grants: Vec<(FeatureArea, PermissionGroup)>,
}

/// Department names are resolved separately, see [`department::resolve`].
impl TryFrom<&RoleConfig> for NewRole {
    type Error = Error;

    fn try_from(config: &RoleConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            department_id: None,
            description: config.description.clone(),
            is_admin: config.is_admin,
            grants: config.permission_groups()?,
        })
    }
}

/// A role with its access record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDetail {
    pub role: role::Model,
    pub access: access_entity::Model,
}

/// Fields for a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    pub full_name: String,
    /// Assigned role, if any
    #[serde(default)]
    pub role_id: Option<i64>,
}

fn role_not_found(role_id: i64) -> Error {
    Error::NotFound {
        entity: "role",
        key: role_id.to_string(),
    }
}

fn user_not_found(user_id: i64) -> Error {
    Error::NotFound {
        entity: "user",
        key: user_id.to_string(),
    }
}

fn access_record(role_id: i64, grants: &[(FeatureArea, PermissionGroup)]) -> access_entity::ActiveModel {
    let mut record = access_entity::ActiveModel {
        role_id: Set(role_id),
        ..Default::default()
    };
    for area in FeatureArea::ALL {
        access::set_group(&mut record, area, PermissionGroup::default());
    }
    for (area, group) in grants {
        access::set_group(&mut record, *area, *group);
    }
    record
}

/// Creates a role and its access record.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank name, [`Error::NotFound`] for an
/// unknown department and [`Error::DuplicateKey`] when the department already has
/// a role of that name.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_role<C>(db: &C, input: NewRole) -> Result<RoleDetail>
where
    C: ConnectionTrait + TransactionTrait,
{
    let name = validate::required_text("name", &input.name)?;

    let txn = db.begin().await?;
    if let Some(department_id) = input.department_id {
        department::get_department_by_id(&txn, department_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "department",
                key: department_id.to_string(),
            })?;
    }
    if find_role(&txn, &name, input.department_id).await?.is_some() {
        return Err(Error::DuplicateKey {
            field: "name".to_string(),
            value: name,
        });
    }

    let role = role::ActiveModel {
        name: Set(name.clone()),
        department_id: Set(input.department_id),
        description: Set(validate::optional_text(input.description)),
        is_admin: Set(input.is_admin),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::from_insert(e, "name", &name))?;
    let access = access_record(role.id, &input.grants).insert(&txn).await?;
    txn.commit().await?;

    info!(role_id = role.id, is_admin = role.is_admin, "Created role");
    Ok(RoleDetail { role, access })
}

/// Replaces every grant of a role. Areas not listed are cleared.
#[instrument(skip(db, grants))]
pub async fn set_role_access(
    db: &DatabaseConnection,
    role_id: i64,
    grants: &[(FeatureArea, PermissionGroup)],
) -> Result<access_entity::Model> {
    let txn = db.begin().await?;
    Role::find_by_id(role_id)
        .one(&txn)
        .await?
        .ok_or_else(|| role_not_found(role_id))?;

    Access::delete_many()
        .filter(access_entity::Column::RoleId.eq(role_id))
        .exec(&txn)
        .await?;
    let access = access_record(role_id, grants).insert(&txn).await?;
    txn.commit().await?;

    info!(role_id, areas = grants.len(), "Updated role access");
    Ok(access)
}

async fn find_role<C>(db: &C, name: &str, department_id: Option<i64>) -> Result<Option<role::Model>>
where
    C: ConnectionTrait,
{
    let department = match department_id {
        Some(id) => role::Column::DepartmentId.eq(id),
        None => role::Column::DepartmentId.is_null(),
    };
    Role::find()
        .filter(role::Column::Name.eq(name))
        .filter(department)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a role with its access record.
pub async fn get_role(db: &DatabaseConnection, role_id: i64) -> Result<Option<RoleDetail>> {
    let Some(role) = Role::find_by_id(role_id).one(db).await? else {
        return Ok(None);
    };
    let access = Access::find()
        .filter(access_entity::Column::RoleId.eq(role.id))
        .one(db)
        .await?
        .unwrap_or_else(|| access_entity::Model {
            role_id: role.id,
            ..access_entity::Model::default()
        });
    Ok(Some(RoleDetail { role, access }))
}

/// All roles ordered by name.
pub async fn list_roles(db: &DatabaseConnection) -> Result<Vec<role::Model>> {
    Role::find()
        .order_by_asc(role::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a role and its access record. Holders keep their account without a role.
pub async fn delete_role(db: &DatabaseConnection, role_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let role = Role::find_by_id(role_id)
        .one(&txn)
        .await?
        .ok_or_else(|| role_not_found(role_id))?;
    remove_role(&txn, &role).await?;
    txn.commit().await?;

    info!(role = %role.name, "Deleted role");
    Ok(())
}

/// Detaches a role's users and deletes the role with its access record. Runs
/// inside the caller's transaction.
pub(crate) async fn remove_role<C>(db: &C, role: &role::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    User::update_many()
        .col_expr(user::Column::RoleId, Expr::value(Option::<i64>::None))
        .filter(user::Column::RoleId.eq(role.id))
        .exec(db)
        .await?;
    Access::delete_many()
        .filter(access_entity::Column::RoleId.eq(role.id))
        .exec(db)
        .await?;
    Role::delete_by_id(role.id).exec(db).await?;
    Ok(())
}

/// Creates the configured departments and roles that do not exist yet. Existing
/// records are left as they are. Returns the number of roles created.
///
/// # Errors
/// Returns [`Error::Config`] when a configured grant names an unknown area or
/// permission, or a role names a department that is neither stored nor
/// configured; no role is created in that case.
pub async fn seed_roles(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    department::seed_departments(db, config).await?;

    let mut roles = Vec::with_capacity(config.roles.len());
    for role_config in &config.roles {
        let mut role = NewRole::try_from(role_config)?;
        role.department_id = department::resolve(db, role_config.department.as_deref())
            .await
            .map_err(|e| match e {
                Error::NotFound { key, .. } => Error::Config {
                    message: format!("Role '{}': unknown department '{key}'", role_config.name),
                },
                other => other,
            })?;
        roles.push(role);
    }

    let mut created = 0;
    for role in roles {
        if find_role(db, role.name.trim(), role.department_id).await?.is_some() {
            continue;
        }
        create_role(db, role).await?;
        created += 1;
    }
    if created > 0 {
        info!(created, "Seeded roles");
    }
    Ok(created)
}

/// Creates a user.
///
/// # Errors
/// Returns an error if:
/// - The username or name is blank or the email is malformed
/// - The username or email is taken
/// - The role does not exist
#[instrument(skip(db, input), fields(username = %input.username))]
pub async fn create_user<C>(db: &C, input: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let username = validate::required_text("username", &input.username)?;
    let full_name = validate::required_text("full_name", &input.full_name)?;
    let email = validate::email("email", &input.email)?;

    if let Some(role_id) = input.role_id {
        Role::find_by_id(role_id)
            .one(db)
            .await?
            .ok_or_else(|| role_not_found(role_id))?;
    }
    let taken = User::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(username.as_str()))
                .add(user::Column::Email.eq(email.as_str())),
        )
        .one(db)
        .await?;
    if let Some(existing) = taken {
        let (field, value) = if existing.username == username {
            ("username", username)
        } else {
            ("email", email)
        };
        return Err(Error::DuplicateKey {
            field: field.to_string(),
            value,
        });
    }

    let user = user::ActiveModel {
        username: Set(username.clone()),
        email: Set(email.clone()),
        full_name: Set(full_name),
        role_id: Set(input.role_id),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        Error::from_unique_insert(e, &[("username", username.as_str()), ("email", email.as_str())])
    })?;

    info!(user_id = user.id, "Created user");
    Ok(user)
}

/// Loads a user.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// All users ordered by username.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Assigns a role to a user, or clears it with `None`.
pub async fn assign_role(
    db: &DatabaseConnection,
    user_id: i64,
    role_id: Option<i64>,
) -> Result<user::Model> {
    if let Some(role_id) = role_id {
        Role::find_by_id(role_id)
            .one(db)
            .await?
            .ok_or_else(|| role_not_found(role_id))?;
    }
    let existing = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;

    let mut user: user::ActiveModel = existing.into();
    user.role_id = Set(role_id);
    let user = user.update(db).await?;
    info!(user_id, role_id, "Assigned role");
    Ok(user)
}

/// Activates or deactivates a user. Inactive users are denied everything.
pub async fn set_active(db: &DatabaseConnection, user_id: i64, active: bool) -> Result<user::Model> {
    let existing = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;

    let mut user: user::ActiveModel = existing.into();
    user.is_active = Set(active);
    let user = user.update(db).await?;
    info!(user_id, active, "Changed user activation");
    Ok(user)
}

/// Deletes a user. The acting user cannot delete themselves.
pub async fn delete_user(db: &DatabaseConnection, acting: Principal, user_id: i64) -> Result<()> {
    if acting.user_id == user_id {
        warn!(user_id, "Refused self-deletion");
        return Err(Error::validation("user", "you cannot delete your own account"));
    }
    let result = User::delete_by_id(user_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(user_not_found(user_id));
    }
    info!(user_id, "Deleted user");
    Ok(())
}
