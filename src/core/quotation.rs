//! Quotations - Creation, editing, revisions, status transitions and conversion.
//!
//! Quotations start in `Draft` with the next `QUO` number and move through
//! [`QuotationStatus`]. Approving and then converting a quotation creates a `Draft`
//! sales order in the same transaction as the status change.
//!
//! Revisions are separate from status changes: [`create_revision`] snapshots the
//! current lines and bumps `revision_count`, while transitions never touch it.

use crate::{
    core::{
        access::Principal,
        customer,
        document::{self, LineRequest, PricedLine},
        history::{self, Transition},
        sales_order::{self, SalesOrderDetail},
        sequence::{self, Series},
        status::{self, DocumentKind, QuotationAction, QuotationStatus, StatusMachine},
        totals::{self, DocumentTotals},
        validate,
    },
    entities::{
        Quotation, QuotationItem, QuotationRevision, document_comment, quotation, quotation_item,
        quotation_revision, sales_order as sales_order_entity, status_history,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Accepted quotation types.
pub const QUOTATION_TYPES: [&str; 3] = ["Standard", "Blanket", "Service"];

/// Fields for a new quotation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuotation {
    /// Quoted customer (row id)
    pub customer_id: i64,
    /// Customer's purchase order reference
    #[serde(default)]
    pub customer_po_reference: Option<String>,
    /// One of [`QUOTATION_TYPES`]
    pub quotation_type: String,
    /// Defaults to today
    #[serde(default)]
    pub quotation_date: Option<NaiveDate>,
    /// Last day the offer is valid, not before the quotation date
    pub expiry_date: NaiveDate,
    /// Three-letter currency code
    pub currency: String,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub expected_delivery: Option<NaiveDate>,
    /// Header discount percentage
    #[serde(default)]
    pub global_discount: Decimal,
    /// Shipping charge added to the grand total
    #[serde(default)]
    pub shipping_charges: Decimal,
    /// Requested lines
    #[serde(default)]
    pub items: Vec<LineRequest>,
}

/// Partial update of a quotation. `items`, when present, replaces every line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuotationUpdate {
    pub customer_po_reference: Option<String>,
    pub quotation_type: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub payment_terms: Option<String>,
    pub expected_delivery: Option<NaiveDate>,
    pub global_discount: Option<Decimal>,
    pub shipping_charges: Option<Decimal>,
    pub items: Option<Vec<LineRequest>>,
}

/// Input of [`create_revision`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRevision {
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// What changed
    pub comment: String,
}

/// A quotation with its lines and recomputed totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationDetail {
    /// Header row
    pub quotation: quotation::Model,
    /// Lines in position order
    pub items: Vec<quotation_item::Model>,
    /// Totals recomputed from the lines and header
    pub totals: DocumentTotals,
}

impl QuotationDetail {
    /// Parsed status of the quotation.
    pub fn status(&self) -> Result<QuotationStatus> {
        self.quotation.status.parse()
    }

    /// Lines in the shape the calculators and renderers use.
    pub fn lines(&self) -> Result<Vec<PricedLine>> {
        self.items.iter().map(PricedLine::try_from).collect()
    }
}

/// Result of a quotation transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationTransition {
    /// The quotation after the change
    pub quotation: QuotationDetail,
    /// Sales order created by `convert_to_so`
    pub sales_order: Option<SalesOrderDetail>,
}

fn not_found(quotation_id: i64) -> Error {
    Error::NotFound {
        entity: "quotation",
        key: quotation_id.to_string(),
    }
}

fn check_expiry(quotation_date: NaiveDate, expiry_date: NaiveDate) -> Result<()> {
    if expiry_date < quotation_date {
        return Err(Error::validation(
            "expiry_date",
            "expiry date cannot be before the quotation date",
        ));
    }
    Ok(())
}

/// Creates a `Draft` quotation with the next `QUO` number.
///
/// # Errors
/// Returns an error if:
/// - A header field is invalid or a line is out of range
/// - The customer or a product does not exist
/// - The `QUO` series is exhausted
#[instrument(skip(db, input), fields(customer_id = input.customer_id))]
pub async fn create_quotation(
    db: &DatabaseConnection,
    author: Principal,
    input: NewQuotation,
) -> Result<QuotationDetail> {
    let quotation_type = validate::one_of("quotation_type", &input.quotation_type, &QUOTATION_TYPES)?;
    let currency = validate::currency("currency", &input.currency)?;
    document::check_header(input.global_discount, input.shipping_charges)?;
    let quotation_date = input.quotation_date.unwrap_or_else(|| Utc::now().date_naive());
    check_expiry(quotation_date, input.expiry_date)?;

    let txn = db.begin().await?;
    customer::get_customer_by_id(&txn, input.customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "customer",
            key: input.customer_id.to_string(),
        })?;
    let lines = document::price_lines(&txn, &input.items).await?;

    let quotation_number = sequence::next(&txn, Series::Quotation).await?;
    let now = Utc::now();
    let quotation = quotation::ActiveModel {
        quotation_number: Set(quotation_number.clone()),
        customer_id: Set(input.customer_id),
        customer_po_reference: Set(validate::optional_text(input.customer_po_reference)),
        quotation_type: Set(quotation_type),
        quotation_date: Set(quotation_date),
        expiry_date: Set(input.expiry_date),
        currency: Set(currency),
        payment_terms: Set(validate::optional_text(input.payment_terms)),
        expected_delivery: Set(input.expected_delivery),
        status: Set(QuotationStatus::INITIAL.as_str().to_string()),
        revision_count: Set(0),
        global_discount: Set(input.global_discount),
        shipping_charges: Set(input.shipping_charges),
        created_by: Set(author.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::from_insert(e, "quotation_number", &quotation_number))?;
    insert_items(&txn, quotation.id, &lines).await?;

    let detail = load_detail(&txn, quotation).await?;
    txn.commit().await?;

    info!(
        quotation_number = %detail.quotation.quotation_number,
        grand_total = %detail.totals.grand_total,
        "Created quotation"
    );
    Ok(detail)
}

async fn insert_items<C>(db: &C, quotation_id: i64, lines: &[PricedLine]) -> Result<()>
where
    C: ConnectionTrait,
{
    for line in lines {
        quotation_item::ActiveModel {
            quotation_id: Set(quotation_id),
            position: Set(line.position),
            product_id: Set(line.product_id),
            product_name: Set(line.product_name.clone()),
            uom: Set(line.uom.clone()),
            unit_price: Set(line.unit_price),
            quantity: Set(validate::stored_quantity("quantity", line.quantity)?),
            discount_pct: Set(line.discount_pct),
            tax_pct: Set(line.tax_pct),
            total: Set(line.total),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn load_detail<C>(db: &C, quotation: quotation::Model) -> Result<QuotationDetail>
where
    C: ConnectionTrait,
{
    let items = QuotationItem::find()
        .filter(quotation_item::Column::QuotationId.eq(quotation.id))
        .order_by_asc(quotation_item::Column::Position)
        .all(db)
        .await?;
    let lines = items
        .iter()
        .map(PricedLine::try_from)
        .collect::<Result<Vec<_>>>()?;
    let totals = document::totals_of(
        &lines,
        totals::round_money(quotation.global_discount),
        totals::round_money(quotation.shipping_charges),
    )?;
    Ok(QuotationDetail {
        quotation,
        items,
        totals,
    })
}

async fn find_quotation<C>(db: &C, quotation_id: i64) -> Result<quotation::Model>
where
    C: ConnectionTrait,
{
    Quotation::find_by_id(quotation_id)
        .one(db)
        .await?
        .ok_or_else(|| not_found(quotation_id))
}

/// Loads a quotation with its lines.
pub async fn get_quotation(
    db: &DatabaseConnection,
    quotation_id: i64,
) -> Result<Option<QuotationDetail>> {
    match Quotation::find_by_id(quotation_id).one(db).await? {
        Some(quotation) => load_detail(db, quotation).await.map(Some),
        None => Ok(None),
    }
}

/// All quotations, newest first.
pub async fn list_quotations(db: &DatabaseConnection) -> Result<Vec<quotation::Model>> {
    Quotation::find()
        .order_by_desc(quotation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Edits a non-terminal quotation. Line totals are recomputed from the new lines.
///
/// # Errors
/// Returns [`Error::InvalidTransition`] when the quotation is converted or
/// expired, plus the validation and lookup errors of [`create_quotation`].
#[instrument(skip(db, update))]
pub async fn update_quotation(
    db: &DatabaseConnection,
    quotation_id: i64,
    update: QuotationUpdate,
) -> Result<QuotationDetail> {
    let quotation_type = update
        .quotation_type
        .map(|t| validate::one_of("quotation_type", &t, &QUOTATION_TYPES))
        .transpose()?;
    let currency = update
        .currency
        .map(|c| validate::currency("currency", &c))
        .transpose()?;

    let txn = db.begin().await?;
    let existing = find_quotation(&txn, quotation_id).await?;
    status::ensure_editable(existing.status.parse::<QuotationStatus>()?, "edit")?;

    let global_discount = update.global_discount.unwrap_or(existing.global_discount);
    let shipping_charges = update.shipping_charges.unwrap_or(existing.shipping_charges);
    document::check_header(global_discount, shipping_charges)?;
    let expiry_date = update.expiry_date.unwrap_or(existing.expiry_date);
    check_expiry(existing.quotation_date, expiry_date)?;
    let lines = match &update.items {
        Some(items) => Some(document::price_lines(&txn, items).await?),
        None => None,
    };

    let mut quotation: quotation::ActiveModel = existing.into();
    if let Some(reference) = update.customer_po_reference {
        quotation.customer_po_reference = Set(validate::optional_text(Some(reference)));
    }
    if let Some(quotation_type) = quotation_type {
        quotation.quotation_type = Set(quotation_type);
    }
    if let Some(currency) = currency {
        quotation.currency = Set(currency);
    }
    if let Some(payment_terms) = update.payment_terms {
        quotation.payment_terms = Set(validate::optional_text(Some(payment_terms)));
    }
    if let Some(expected_delivery) = update.expected_delivery {
        quotation.expected_delivery = Set(Some(expected_delivery));
    }
    quotation.expiry_date = Set(expiry_date);
    quotation.global_discount = Set(global_discount);
    quotation.shipping_charges = Set(shipping_charges);
    quotation.updated_at = Set(Utc::now());
    let quotation = quotation.update(&txn).await?;

    if let Some(lines) = lines {
        QuotationItem::delete_many()
            .filter(quotation_item::Column::QuotationId.eq(quotation.id))
            .exec(&txn)
            .await?;
        insert_items(&txn, quotation.id, &lines).await?;
    }

    let detail = load_detail(&txn, quotation).await?;
    txn.commit().await?;
    Ok(detail)
}

/// Applies a status action (`save_draft`, `submit`, `approve`, `reject`,
/// `convert_to_so`, `cancel`).
///
/// `convert_to_so` also creates a `Draft` sales order copying the customer,
/// currency, header discount, shipping and lines.
///
/// # Errors
/// Returns [`Error::InvalidTransition`] for unknown actions and actions not allowed
/// from the current status; nothing is written in that case.
#[instrument(skip(db))]
pub async fn transition_quotation(
    db: &DatabaseConnection,
    quotation_id: i64,
    action: &str,
    actor: Principal,
) -> Result<QuotationTransition> {
    let txn = db.begin().await?;
    let existing = find_quotation(&txn, quotation_id).await?;
    let from: QuotationStatus = existing.status.parse()?;
    let (requested, to) = status::resolve(from, action)?;

    let mut quotation: quotation::ActiveModel = existing.into();
    quotation.status = Set(to.as_str().to_string());
    quotation.updated_at = Set(Utc::now());
    let quotation = quotation.update(&txn).await?;

    history::record(
        &txn,
        Transition {
            kind: DocumentKind::Quotation,
            document_id: quotation.id,
            from: from.as_str(),
            to: to.as_str(),
            action,
        },
        actor,
    )
    .await?;

    let detail = load_detail(&txn, quotation).await?;
    let sales_order = if requested == QuotationAction::ConvertToSo {
        Some(convert(&txn, &detail, actor).await?)
    } else {
        None
    };
    txn.commit().await?;

    info!(
        quotation_number = %detail.quotation.quotation_number,
        from = from.as_str(),
        to = to.as_str(),
        sales_order = sales_order.as_ref().map(|so| so.order.order_number.as_str()),
        "Quotation status changed"
    );
    Ok(QuotationTransition {
        quotation: detail,
        sales_order,
    })
}

async fn convert<C>(db: &C, detail: &QuotationDetail, actor: Principal) -> Result<SalesOrderDetail>
where
    C: ConnectionTrait + TransactionTrait,
{
    let quotation = &detail.quotation;
    let header = sales_order_entity::ActiveModel {
        customer_id: Set(quotation.customer_id),
        quotation_id: Set(Some(quotation.id)),
        order_date: Set(Utc::now().date_naive()),
        order_type: Set(sales_order::ORDER_TYPES[0].to_string()),
        currency: Set(quotation.currency.clone()),
        payment_method: Set(None),
        due_date: Set(None),
        expected_delivery: Set(quotation.expected_delivery),
        shipping_method: Set(None),
        tracking_number: Set(None),
        internal_notes: Set(Some(format!("Converted from {}", quotation.quotation_number))),
        customer_notes: Set(None),
        global_discount: Set(quotation.global_discount),
        shipping_charges: Set(quotation.shipping_charges),
        ..Default::default()
    };
    let lines = detail.lines()?;
    let order = sales_order::insert_order(db, header, &lines, actor).await?;
    sales_order::load_detail(db, order).await
}

/// Records a revision: snapshots the current lines and bumps `revision_count`.
///
/// # Errors
/// Returns [`Error::InvalidTransition`] on converted or expired quotations and
/// [`Error::Validation`] for a blank comment.
#[instrument(skip(db, input))]
pub async fn create_revision(
    db: &DatabaseConnection,
    quotation_id: i64,
    author: Principal,
    input: NewRevision,
) -> Result<quotation_revision::Model> {
    let comment = validate::required_text("comment", &input.comment)?;

    let txn = db.begin().await?;
    let existing = find_quotation(&txn, quotation_id).await?;
    let current: QuotationStatus = existing.status.parse()?;
    status::ensure_editable(current, "create_revision")?;

    let detail = load_detail(&txn, existing).await?;
    let snapshot = document::snapshot(&detail.lines()?)?;
    let revision_number = detail.quotation.revision_count + 1;

    let revision = quotation_revision::ActiveModel {
        quotation_id: Set(detail.quotation.id),
        revision_number: Set(revision_number),
        date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
        created_by: Set(author.user_id),
        status: Set(current.as_str().to_string()),
        comment: Set(comment),
        snapshot: Set(snapshot),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut quotation: quotation::ActiveModel = detail.quotation.into();
    quotation.revision_count = Set(revision_number);
    quotation.updated_at = Set(Utc::now());
    quotation.update(&txn).await?;
    txn.commit().await?;

    info!(quotation_id, revision_number, "Recorded quotation revision");
    Ok(revision)
}

/// Revisions of a quotation, oldest first.
pub async fn list_revisions(
    db: &DatabaseConnection,
    quotation_id: i64,
) -> Result<Vec<quotation_revision::Model>> {
    find_quotation(db, quotation_id).await?;
    QuotationRevision::find()
        .filter(quotation_revision::Column::QuotationId.eq(quotation_id))
        .order_by_asc(quotation_revision::Column::RevisionNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a quotation with its lines, revisions, history and comments.
///
/// Sales orders converted from it keep their lines and lose the back-reference.
pub async fn delete_quotation(db: &DatabaseConnection, quotation_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let quotation = find_quotation(&txn, quotation_id).await?;

    QuotationItem::delete_many()
        .filter(quotation_item::Column::QuotationId.eq(quotation.id))
        .exec(&txn)
        .await?;
    QuotationRevision::delete_many()
        .filter(quotation_revision::Column::QuotationId.eq(quotation.id))
        .exec(&txn)
        .await?;
    history::purge(&txn, DocumentKind::Quotation, quotation.id).await?;
    sales_order_entity::Entity::update_many()
        .col_expr(
            sales_order_entity::Column::QuotationId,
            Expr::value(Option::<i64>::None),
        )
        .filter(sales_order_entity::Column::QuotationId.eq(quotation.id))
        .exec(&txn)
        .await?;
    Quotation::delete_by_id(quotation.id).exec(&txn).await?;
    txn.commit().await?;

    info!(quotation_number = %quotation.quotation_number, "Deleted quotation");
    Ok(())
}

/// Status history of a quotation, oldest first.
pub async fn quotation_history(
    db: &DatabaseConnection,
    quotation_id: i64,
) -> Result<Vec<status_history::Model>> {
    find_quotation(db, quotation_id).await?;
    history::list(db, DocumentKind::Quotation, quotation_id).await
}

/// Adds a comment to a quotation.
pub async fn comment_on_quotation(
    db: &DatabaseConnection,
    quotation_id: i64,
    author: Principal,
    body: &str,
) -> Result<document_comment::Model> {
    find_quotation(db, quotation_id).await?;
    history::add_comment(db, DocumentKind::Quotation, quotation_id, author, body).await
}

/// Comments on a quotation, oldest first.
pub async fn quotation_comments(
    db: &DatabaseConnection,
    quotation_id: i64,
) -> Result<Vec<document_comment::Model>> {
    find_quotation(db, quotation_id).await?;
    history::list_comments(db, DocumentKind::Quotation, quotation_id).await
}
