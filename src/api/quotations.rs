use super::{ApiResponse, AppState, parse_body, respond, respond_empty};
use crate::{
    core::{
        access::{Action, FeatureArea, Principal},
        quotation::{self, NewQuotation, NewRevision, QuotationUpdate},
        report::{self, RenderedDocument},
    },
    errors::Error,
    notify,
};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

const AREA: FeatureArea = FeatureArea::Quotation;

/// Rendered document in a JSON-friendly shape.
#[derive(Debug, Serialize)]
pub(crate) struct Download {
    pub(crate) content_type: String,
    pub(crate) file_name: String,
    pub(crate) content: String,
}

impl From<RenderedDocument> for Download {
    fn from(document: RenderedDocument) -> Self {
        Self {
            content_type: document.content_type,
            file_name: document.file_name,
            content: String::from_utf8_lossy(&document.bytes).into_owned(),
        }
    }
}

/// Lists quotations.
pub async fn list(state: &AppState, principal: Principal) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        quotation::list_quotations(&state.database).await
    };
    respond(StatusCode::OK, result.await)
}

/// Shows one quotation with lines and totals.
pub async fn get(state: &AppState, principal: Principal, quotation_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let detail = quotation::get_quotation(&state.database, quotation_id).await?;
        super::found(detail, "quotation", quotation_id)
    };
    respond(StatusCode::OK, result.await)
}

/// Creates a draft quotation from a [`NewQuotation`] body.
pub async fn create(state: &AppState, principal: Principal, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Create).await?;
        let input: NewQuotation = parse_body(body)?;
        quotation::create_quotation(&state.database, principal, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Applies a [`QuotationUpdate`] body.
pub async fn update(state: &AppState, principal: Principal, quotation_id: i64, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        let update: QuotationUpdate = parse_body(body)?;
        quotation::update_quotation(&state.database, quotation_id, update).await
    };
    respond(StatusCode::OK, result.await)
}

/// Deletes a quotation.
pub async fn delete(state: &AppState, principal: Principal, quotation_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Delete).await?;
        quotation::delete_quotation(&state.database, quotation_id).await
    };
    respond_empty(result.await)
}

/// Applies a status action. `convert_to_so` also needs sales order create rights.
pub async fn transition(state: &AppState, principal: Principal, quotation_id: i64, action: &str) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        if action == "convert_to_so" {
            state.require(principal, FeatureArea::SalesOrder, Action::Create).await?;
        }
        quotation::transition_quotation(&state.database, quotation_id, action, principal).await
    };
    respond(StatusCode::OK, result.await)
}

/// Records a revision from a [`NewRevision`] body.
pub async fn revise(state: &AppState, principal: Principal, quotation_id: i64, body: Value) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::Edit).await?;
        let input: NewRevision = parse_body(body)?;
        quotation::create_revision(&state.database, quotation_id, principal, input).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Lists revisions.
pub async fn revisions(state: &AppState, principal: Principal, quotation_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        quotation::list_revisions(&state.database, quotation_id).await
    };
    respond(StatusCode::OK, result.await)
}

/// Lists status history.
pub async fn history(state: &AppState, principal: Principal, quotation_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        quotation::quotation_history(&state.database, quotation_id).await
    };
    respond(StatusCode::OK, result.await)
}

/// Adds a comment. Viewers may comment.
pub async fn comment(state: &AppState, principal: Principal, quotation_id: i64, text: &str) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        quotation::comment_on_quotation(&state.database, quotation_id, principal, text).await
    };
    respond(StatusCode::CREATED, result.await)
}

/// Lists comments.
pub async fn comments(state: &AppState, principal: Principal, quotation_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        quotation::quotation_comments(&state.database, quotation_id).await
    };
    respond(StatusCode::OK, result.await)
}

/// Renders the quotation with the configured renderer.
pub async fn render(state: &AppState, principal: Principal, quotation_id: i64) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let summary = report::summarize_quotation(&state.database, quotation_id).await?;
        state.renderer.render(&summary).map(Download::from)
    };
    respond(StatusCode::OK, result.await)
}

/// Emails the rendered quotation to `recipient`, or to the customer when `None`.
pub async fn email(
    state: &AppState,
    principal: Principal,
    quotation_id: i64,
    recipient: Option<&str>,
) -> ApiResponse {
    let result = async {
        state.require(principal, AREA, Action::View).await?;
        let summary = report::summarize_quotation(&state.database, quotation_id).await?;
        let sent = notify::send_document(state.mailer.as_ref(), state.renderer.as_ref(), &summary, recipient).await?;
        Ok::<_, Error>(serde_json::json!({ "recipient": sent.recipient, "subject": sent.subject }))
    };
    respond(StatusCode::OK, result.await)
}
