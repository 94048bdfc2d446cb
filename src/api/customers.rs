use super::{ApiResponse, AppState, found, parse_body, respond, respond_empty};
use crate::core::{
    access::{Action, FeatureArea, Principal},
    customer::{self, CustomerUpdate, NewCustomer},
    import,
};
use http::StatusCode;
use serde_json::Value;

const AREA: FeatureArea = FeatureArea::Customer;

/// Lists all customers.
pub async fn list(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        customer::list_customers(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one customer.
pub async fn get(state: &AppState, principal: Principal, customer_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let record = customer::get_customer_by_id(&state.database, customer_id).await?;
        found(record, "customer", customer_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a customer from a [`NewCustomer`] body.
pub async fn create(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Create).await?;
        let input: NewCustomer = parse_body(body)?;
        customer::create_customer(&state.database, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Applies a [`CustomerUpdate`] body.
pub async fn update(state: &AppState, principal: Principal, customer_id: i64, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        let update: CustomerUpdate = parse_body(body)?;
        customer::update_customer(&state.database, customer_id, update).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes a customer without documents.
pub async fn delete(state: &AppState, principal: Principal, customer_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Delete).await?;
        customer::delete_customer(&state.database, customer_id).await
    };
    respond_empty(result.await)
}

/// Imports customers from an uploaded delimited file.
pub async fn import(state: &AppState, principal: Principal, file: &[u8], delimiter: u8) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Create).await?;
        import::import_customers(&state.database, file, delimiter).await
    };
    respond(StatusCode::OK, result.await)
}
