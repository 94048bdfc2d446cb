use super::{ApiResponse, AppState, found, parse_body, respond, respond_empty};
use crate::core::{
    access::{Action, FeatureArea, Principal},
    enquiry::{self, EnquiryUpdate, NewEnquiry},
};
use http::StatusCode;
use serde_json::Value;

const AREA: FeatureArea = FeatureArea::Enquiry;

/// Lists enquiries.
pub async fn list(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        enquiry::list_enquiries(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one enquiry with its items and total.
pub async fn get(state: &AppState, principal: Principal, enquiry_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let detail = enquiry::get_enquiry(&state.database, enquiry_id).await?;
        found(detail, "enquiry", enquiry_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates an enquiry from a [`NewEnquiry`] body, authored by the caller.
pub async fn create(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Create).await?;
        let input: NewEnquiry = parse_body(body)?;
        enquiry::create_enquiry(&state.database, principal, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Applies an [`EnquiryUpdate`] body.
pub async fn update(state: &AppState, principal: Principal, enquiry_id: i64, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        let update: EnquiryUpdate = parse_body(body)?;
        enquiry::update_enquiry(&state.database, enquiry_id, update).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes an enquiry with its items.
pub async fn delete(state: &AppState, principal: Principal, enquiry_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Delete).await?;
        enquiry::delete_enquiry(&state.database, enquiry_id).await
    };
    respond_empty(result.await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::PermissionGroup;
    use crate::errors::Result;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_enquiry_handlers() -> Result<()> {
        let state = setup_test_state().await?;
        let agent = create_user_with_access(&state.database, "agent", &[(AREA, PermissionGroup::FULL)]).await?;
        let agent = Principal { user_id: agent.id };

        let created = create(
            &state,
            agent,
            json!({
                "first_name": "Lin",
                "last_name": "Chen",
                "email": "lin@example.com",
                "phone_number": "555-0100",
                "city": "Austin",
                "enquiry_type": "Product",
                "items": [
                    { "item_code": "A1", "product_description": "Pump", "selling_price": "12.50", "quantity": 4 }
                ]
            }),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body["enquiry"]["enquiry_number"], "ENQ001");
        assert_eq!(created.body["enquiry"]["status"], "New");
        let id = created.body["enquiry"]["id"].as_i64().unwrap_or_default();

        let closed = update(&state, agent, id, json!({ "status": "Closed" })).await;
        assert_eq!(closed.status, StatusCode::OK);
        let unknown = update(&state, agent, id, json!({ "status": "Done" })).await;
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

        assert_eq!(delete(&state, agent, id).await.status, StatusCode::NO_CONTENT);
        assert_eq!(get(&state, agent, id).await.status, StatusCode::NOT_FOUND);

        Ok(())
    }
}
