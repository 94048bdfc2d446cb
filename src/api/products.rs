use super::{ApiResponse, AppState, found, parse_body, respond};
use crate::core::{
    access::{Action, FeatureArea, Principal},
    product::{self, NewProduct, ProductUpdate},
};
use http::StatusCode;
use serde_json::Value;

const AREA: FeatureArea = FeatureArea::Product;

/// Lists active products.
pub async fn list(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        product::get_all_active_products(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one product, retired or not.
pub async fn get(state: &AppState, principal: Principal, product_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let record = product::get_product_by_id(&state.database, product_id).await?;
        found(record, "product", product_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a product from a [`NewProduct`] body.
pub async fn create(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Create).await?;
        let input: NewProduct = parse_body(body)?;
        product::create_product(&state.database, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Applies a [`ProductUpdate`] body.
pub async fn update(state: &AppState, principal: Principal, product_id: i64, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        let update: ProductUpdate = parse_body(body)?;
        product::update_product(&state.database, product_id, update).await
    };
    respond(StatusCode::OK, result.await)
}

/// Retires a product and returns it.
pub async fn delete(state: &AppState, principal: Principal, product_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Delete).await?;
        product::delete_product(&state.database, product_id).await
    };
    respond(StatusCode::OK, result.await)
}
