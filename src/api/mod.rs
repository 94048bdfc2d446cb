//! Request handlers - Framework-agnostic mapping of operations onto the core.
//!
//! Every handler takes the shared [`AppState`], the calling [`Principal`] and the
//! request input, checks the access gate first, calls into [`crate::core`] and
//! returns an [`ApiResponse`]. Handlers never fail: every core error is converted
//! into a status code and a JSON error body. Routing and authentication belong to
//! whatever server mounts these handlers.

/// Customer handlers, including bulk import
pub mod customers;
/// Department administration handlers
pub mod departments;
/// Enquiry handlers
pub mod enquiries;
/// Product catalog handlers
pub mod products;
/// Quotation handlers, including revisions, rendering and email
pub mod quotations;
/// Sales order handlers, including rendering and email
pub mod sales_orders;
/// User and role administration handlers
pub mod users;

use crate::{
    core::{
        access::{self, Action, FeatureArea, Principal},
        report::DocumentRenderer,
    },
    errors::{Error, Result},
    notify::Mailer,
};
use http::StatusCode;
use sea_orm::DatabaseConnection;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

/// Shared state available to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection for all operations
    pub database: DatabaseConnection,
    /// Outgoing mail transport
    pub mailer: Arc<dyn Mailer>,
    /// Document renderer used for downloads and email attachments
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl AppState {
    /// Creates the handler state.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            database,
            mailer,
            renderer,
        }
    }

    async fn require(&self, principal: Principal, area: FeatureArea, action: Action) -> Result<()> {
        access::require(&self.database, principal, area, action).await
    }
}

/// Structured handler response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status
    pub status: StatusCode,
    /// JSON body, `null` for 204
    pub body: Value,
}

impl ApiResponse {
    /// Serializes `value` with the given status.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::from_error(&Error::from(e)),
        }
    }

    /// An empty 204 response.
    #[must_use]
    pub const fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: Value::Null,
        }
    }

    /// Converts an error into its response.
    ///
    /// Validation 400, permission 403, missing record 404, duplicate key 409,
    /// disallowed transition 422, everything else 500.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        let (status, body) = match err {
            Error::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation", "field": field, "message": message }),
            ),
            Error::PermissionDenied { area, action } => (
                StatusCode::FORBIDDEN,
                json!({ "error": "permission_denied", "area": area, "action": action }),
            ),
            Error::NotFound { entity, key } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "entity": entity, "key": key }),
            ),
            Error::DuplicateKey { field, value } => (
                StatusCode::CONFLICT,
                json!({ "error": "duplicate", "field": field, "value": value }),
            ),
            Error::InvalidTransition { from, action } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "invalid_transition", "from": from, "action": action }),
            ),
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "message": other.to_string() }),
                )
            }
        };
        if status.is_client_error() {
            warn!(status = status.as_u16(), error = %err, "Request rejected");
        }
        Self { status, body }
    }
}

/// Maps a core result onto a response with `status` on success.
pub(crate) fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> ApiResponse {
    match result {
        Ok(value) => ApiResponse::json(status, &value),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Maps a result without a body onto 204.
pub(crate) fn respond_empty(result: Result<()>) -> ApiResponse {
    match result {
        Ok(()) => ApiResponse::no_content(),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Deserializes a JSON request body. Malformed input is a validation error on `body`.
pub(crate) fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| Error::validation("body", e.to_string()))
}

/// Admin-only gate for user, role and department administration.
pub(crate) async fn require_admin(state: &AppState, principal: Principal) -> Result<()> {
    access::require_admin(&state.database, principal).await.map(|_| ())
}

/// Turns a lookup miss into [`Error::NotFound`].
pub(crate) fn found<T>(value: Option<T>, entity: &'static str, key: impl std::fmt::Display) -> Result<T> {
    value.ok_or_else(|| Error::NotFound {
        entity,
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::TabularTextRenderer;
    use crate::notify::RecordingMailer;
    use crate::test_utils::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::validation("email", "bad"), StatusCode::BAD_REQUEST),
            (
                Error::PermissionDenied {
                    area: "customer".to_string(),
                    action: "view".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                Error::NotFound {
                    entity: "quotation",
                    key: "7".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                Error::DuplicateKey {
                    field: "email".to_string(),
                    value: "a@b.c".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::InvalidTransition {
                    from: "Cancelled".to_string(),
                    action: "submit".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::SeriesExhausted {
                    series: "QUO",
                    width: 3,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Notification {
                    message: "relay down".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiResponse::from_error(&err).status, expected, "{err}");
        }
    }

    #[test]
    fn test_validation_body_names_field() {
        let response = ApiResponse::from_error(&Error::validation("credit_limit", "must not be negative"));
        assert_eq!(response.body["error"], "validation");
        assert_eq!(response.body["field"], "credit_limit");
    }

    #[test]
    fn test_parse_body_rejects_malformed_input() {
        let result: Result<crate::core::customer::NewCustomer> = parse_body(json!({ "first_name": 5 }));
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "body"));
    }

    #[tokio::test]
    async fn test_state_gate() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db).await?;
        let loner = create_test_user(&db, "loner", None).await?;
        let state = AppState::new(db, Arc::new(RecordingMailer::default()), Arc::new(TabularTextRenderer));

        state
            .require(Principal { user_id: admin.id }, FeatureArea::Quotation, Action::Delete)
            .await?;
        let denied = state
            .require(Principal { user_id: loner.id }, FeatureArea::Quotation, Action::View)
            .await;
        assert!(matches!(denied, Err(Error::PermissionDenied { .. })));

        Ok(())
    }
}
