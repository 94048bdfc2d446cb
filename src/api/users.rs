use super::{ApiResponse, AppState, found, parse_body, require_admin, respond, respond_empty};
use crate::{
    config::roles::RoleConfig,
    core::{
        access::Principal,
        department,
        user::{self, NewRole, NewUser},
    },
    errors::{Error, Result},
};
use http::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;

/// Resolves textual grants. Unknown names are a validation error on `access`.
fn role_from_config(config: &RoleConfig) -> Result<NewRole> {
    NewRole::try_from(config).map_err(|e| match e {
        Error::Config { message } => Error::validation("access", message),
        other => other,
    })
}

/// Lists users by username.
pub async fn list_users(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        user::list_users(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one user.
pub async fn get_user(state: &AppState, principal: Principal, user_id: i64) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let record = user::get_user(&state.database, user_id).await?;
        found(record, "user", user_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a user from a [`NewUser`] body.
pub async fn create_user(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let input: NewUser = parse_body(body)?;
        user::create_user(&state.database, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Assigns or clears a user's role.
pub async fn assign_role(state: &AppState, principal: Principal, user_id: i64, role_id: Option<i64>) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        user::assign_role(&state.database, user_id, role_id).await
    };
    respond(StatusCode::OK, result.await)
}

/// Activates or deactivates a user.
pub async fn set_active(state: &AppState, principal: Principal, user_id: i64, active: bool) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        user::set_active(&state.database, user_id, active).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes a user other than the caller.
pub async fn delete_user(state: &AppState, principal: Principal, user_id: i64) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        user::delete_user(&state.database, principal, user_id).await
    };
    respond_empty(result.await)
}

/// Lists roles by name.
pub async fn list_roles(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        user::list_roles(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one role with its grants.
pub async fn get_role(state: &AppState, principal: Principal, role_id: i64) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let detail = user::get_role(&state.database, role_id).await?;
        found(detail, "role", role_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a role from a body shaped like a `[[roles]]` config entry. The
/// department is named by code or name.
pub async fn create_role(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let config: RoleConfig = parse_body(body)?;
        let mut role = role_from_config(&config)?;
        role.department_id = department::resolve(&state.database, config.department.as_deref()).await?;
        user::create_role(&state.database, role).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Replaces a role's grants with a map of area name to permission names.
pub async fn set_role_access(state: &AppState, principal: Principal, role_id: i64, body: Value) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let access: BTreeMap<String, Vec<String>> = parse_body(body)?;
        let config = RoleConfig {
            name: format!("#{role_id}"),
            department: None,
            description: None,
            is_admin: false,
            access,
        };
        let grants = role_from_config(&config)?.grants;
        user::set_role_access(&state.database, role_id, &grants).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes a role. Its users are left without a role.
pub async fn delete_role(state: &AppState, principal: Principal, role_id: i64) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        user::delete_role(&state.database, role_id).await
    };
    respond_empty(result.await)
}
