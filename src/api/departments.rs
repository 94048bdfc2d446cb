use super::{ApiResponse, AppState, found, parse_body, require_admin, respond, respond_empty};
use crate::core::{
    access::Principal,
    department::{self, DepartmentUpdate, NewDepartment},
};
use http::StatusCode;
use serde_json::Value;

/// Lists departments in creation order.
pub async fn list_departments(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        department::list_departments(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one department with its roles.
pub async fn get_department(state: &AppState, principal: Principal, code: &str) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let detail = department::get_department(&state.database, code).await?;
        found(detail, "department", code)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a department from a [`NewDepartment`] body.
pub async fn create_department(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let input: NewDepartment = parse_body(body)?;
        department::create_department(&state.database, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Applies a [`DepartmentUpdate`] body.
pub async fn update_department(state: &AppState, principal: Principal, code: &str, body: Value) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        let update: DepartmentUpdate = parse_body(body)?;
        department::update_department(&state.database, code, update).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes a department and its roles.
pub async fn delete_department(state: &AppState, principal: Principal, code: &str) -> ApiResponse {
    let result = async {
        require_admin(state, principal).await?;
        department::delete_department(&state.database, code).await
    };
    respond_empty(result.await)
}
