//! Status history and document comments.
//!
//! Both tables are keyed by `(document_kind, document_id)` so quotations and sales
//! orders share one log. History rows are append-only; the record modules write
//! them inside the same transaction as the status change.

use crate::{
    core::{access::Principal, status::DocumentKind, validate},
    entities::{DocumentComment, StatusHistory, document_comment, status_history},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// A status change about to be recorded.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    /// Document the change belongs to
    pub kind: DocumentKind,
    /// Row id of the document
    pub document_id: i64,
    /// Status before
    pub from: &'a str,
    /// Status after
    pub to: &'a str,
    /// Requested action
    pub action: &'a str,
}

/// Appends one history entry.
pub async fn record<C>(
    db: &C,
    transition: Transition<'_>,
    actor: Principal,
) -> Result<status_history::Model>
where
    C: ConnectionTrait,
{
    let entry = status_history::ActiveModel {
        document_kind: Set(transition.kind.as_str().to_string()),
        document_id: Set(transition.document_id),
        from_status: Set(transition.from.to_string()),
        to_status: Set(transition.to.to_string()),
        action: Set(transition.action.to_string()),
        actor_id: Set(actor.user_id),
        recorded_at: Set(Utc::now()),
        ..Default::default()
    };
    let entry = entry.insert(db).await?;

    debug!(
        kind = transition.kind.as_str(),
        document_id = transition.document_id,
        from = transition.from,
        to = transition.to,
        "Recorded status change"
    );
    Ok(entry)
}

/// History of one document, oldest first.
pub async fn list<C>(
    db: &C,
    kind: DocumentKind,
    document_id: i64,
) -> Result<Vec<status_history::Model>>
where
    C: ConnectionTrait,
{
    StatusHistory::find()
        .filter(status_history::Column::DocumentKind.eq(kind.as_str()))
        .filter(status_history::Column::DocumentId.eq(document_id))
        .order_by_asc(status_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a comment to a document. The caller checks that the document exists.
pub async fn add_comment<C>(
    db: &C,
    kind: DocumentKind,
    document_id: i64,
    author: Principal,
    body: &str,
) -> Result<document_comment::Model>
where
    C: ConnectionTrait,
{
    let body = validate::required_text("comment", body)?;
    let comment = document_comment::ActiveModel {
        document_kind: Set(kind.as_str().to_string()),
        document_id: Set(document_id),
        author_id: Set(author.user_id),
        body: Set(body),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    comment.insert(db).await.map_err(Into::into)
}

/// Comments on one document, oldest first.
pub async fn list_comments<C>(
    db: &C,
    kind: DocumentKind,
    document_id: i64,
) -> Result<Vec<document_comment::Model>>
where
    C: ConnectionTrait,
{
    DocumentComment::find()
        .filter(document_comment::Column::DocumentKind.eq(kind.as_str()))
        .filter(document_comment::Column::DocumentId.eq(document_id))
        .order_by_asc(document_comment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Removes history and comments of a deleted document.
pub(crate) async fn purge<C>(db: &C, kind: DocumentKind, document_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    StatusHistory::delete_many()
        .filter(status_history::Column::DocumentKind.eq(kind.as_str()))
        .filter(status_history::Column::DocumentId.eq(document_id))
        .exec(db)
        .await?;
    DocumentComment::delete_many()
        .filter(document_comment::Column::DocumentKind.eq(kind.as_str()))
        .filter(document_comment::Column::DocumentId.eq(document_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, test_utils::*};

    #[tokio::test]
    async fn test_record_and_list_in_order() -> Result<()> {
        let db = setup_test_db().await?;
        let actor = Principal { user_id: 7 };

        for (from, to, action) in [("Draft", "Draft", "save_draft"), ("Draft", "Send", "submit")] {
            let transition = Transition {
                kind: DocumentKind::Quotation,
                document_id: 1,
                from,
                to,
                action,
            };
            record(&db, transition, actor).await?;
        }

        let entries = list(&db, DocumentKind::Quotation, 1).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].from_status, "Draft");
        assert_eq!(entries[1].to_status, "Send");
        assert_eq!(entries[1].action, "submit");
        assert_eq!(entries[1].actor_id, 7);

        // Same id, other kind
        assert!(list(&db, DocumentKind::SalesOrder, 1).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_comments_and_purge() -> Result<()> {
        let db = setup_test_db().await?;
        let author = Principal { user_id: 3 };

        add_comment(&db, DocumentKind::SalesOrder, 5, author, "  Call before delivery ").await?;
        let comments = list_comments(&db, DocumentKind::SalesOrder, 5).await?;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "Call before delivery");

        let blank = add_comment(&db, DocumentKind::SalesOrder, 5, author, "   ").await;
        assert!(matches!(blank, Err(Error::Validation { .. })));

        purge(&db, DocumentKind::SalesOrder, 5).await?;
        assert!(list_comments(&db, DocumentKind::SalesOrder, 5).await?.is_empty());

        Ok(())
    }
}
