use super::{ApiResponse, AppState, parse_body, quotations::Download, respond, respond_empty};
use crate::{
    core::{
        access::{Action, FeatureArea, Principal},
        report,
        sales_order::{self, NewSalesOrder, SalesOrderUpdate},
    },
    errors::Error,
    notify,
};
use http::StatusCode;
use serde_json::Value;

const AREA: FeatureArea = FeatureArea::SalesOrder;

/// Lists sales orders.
pub async fn list(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        sales_order::list_sales_orders(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one order with lines and totals.
pub async fn get(state: &AppState, principal: Principal, order_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let detail = sales_order::get_sales_order(&state.database, order_id).await?;
        super::found(detail, "sales order", order_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a draft order from a [`NewSalesOrder`] body.
pub async fn create(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Create).await?;
        let input: NewSalesOrder = parse_body(body)?;
        sales_order::create_sales_order(&state.database, principal, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Applies a [`SalesOrderUpdate`] body.
pub async fn update(state: &AppState, principal: Principal, order_id: i64, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        let update: SalesOrderUpdate = parse_body(body)?;
        sales_order::update_sales_order(&state.database, order_id, update).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes an order.
pub async fn delete(state: &AppState, principal: Principal, order_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Delete).await?;
        sales_order::delete_sales_order(&state.database, order_id).await
    };
    respond_empty(result.await)
}

/// Applies a status action (`save_draft`, `submit`, `submit_pd`, `cancel`).
pub async fn transition(state: &AppState, principal: Principal, order_id: i64, action: &str) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        sales_order::transition_sales_order(&state.database, order_id, action, principal).await
    };
    respond(StatusCode::OK, result.await)
}

/// Lists status history.
pub async fn history(state: &AppState, principal: Principal, order_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        sales_order::sales_order_history(&state.database, order_id).await
    };
    respond(StatusCode::OK, result.await)
}

/// Adds a comment. Viewers may comment.
pub async fn comment(state: &AppState, principal: Principal, order_id: i64, text: &str) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        sales_order::comment_on_sales_order(&state.database, order_id, principal, text).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Lists comments.
pub async fn comments(state: &AppState, principal: Principal, order_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        sales_order::sales_order_comments(&state.database, order_id).await
    };
    respond(StatusCode::OK, result.await)
}

/// Renders the order with the configured renderer.
pub async fn render(state: &AppState, principal: Principal, order_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let summary = report::summarize_sales_order(&state.database, order_id).await?;
        state.renderer.render(&summary).map(Download::from)
    };
    respond(StatusCode::OK, result.await)
}

/// Emails the rendered order to `recipient`, or to the customer when `None`.
pub async fn email(state: &AppState, principal: Principal, order_id: i64, recipient: Option<&str>) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let summary = report::summarize_sales_order(&state.database, order_id).await?;
        let sent = notify::send_document(state.mailer.as_ref(), state.renderer.as_ref(), &summary, recipient).await?;
        Ok::<_, Error>(serde_json::json!({ "recipient": sent.recipient, "subject": sent.subject }))
    };
    respond(StatusCode::OK, result.await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sales_order_handlers() -> Result<()> {
        let (state, admin, customer, product) = setup_state_with_catalog().await?;

        let created = create(
            &state,
            admin,
            json!({
                "customer_id": customer.id,
                "order_type": "Rush",
                "currency": "USD",
                "shipping_charges": "20",
                "items": [{ "product_id": product.id, "quantity": 1 }]
            }),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body["order"]["order_number"], "SO0001");
        let id = created.body["order"]["id"].as_i64().unwrap_or_default();

        let missing_customer = create(
            &state,
            admin,
            json!({ "customer_id": 404, "order_type": "Standard", "currency": "USD" }),
        )
        .await;
        assert_eq!(missing_customer.status, StatusCode::NOT_FOUND);

        assert_eq!(transition(&state, admin, id, "submit_pd").await.status, StatusCode::OK);
        assert_eq!(transition(&state, admin, id, "cancel").await.status, StatusCode::OK);
        let after_cancel = transition(&state, admin, id, "submit").await;
        assert_eq!(after_cancel.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(after_cancel.body["from"], "Cancelled");

        assert_eq!(comment(&state, admin, id, "Customer called").await.status, StatusCode::CREATED);
        assert_eq!(comments(&state, admin, id).await.body.as_array().map(Vec::len), Some(1));

        let rendered = render(&state, admin, id).await;
        assert_eq!(rendered.body["file_name"], "SO0001.txt");
        let emailed = email(&state, admin, id, Some("ops@example.com")).await;
        assert_eq!(emailed.body["recipient"], "ops@example.com");

        assert_eq!(delete(&state, admin, id).await.status, StatusCode::NO_CONTENT);
        assert_eq!(get(&state, admin, id).await.status, StatusCode::NOT_FOUND);
        assert_eq!(list(&state, admin).await.body, json!([]));

        Ok(())
    }
}
