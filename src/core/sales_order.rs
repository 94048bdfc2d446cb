//! Sales orders - Creation, editing, status transitions and history.
//!
//! Orders start in `Draft` with the next `SO` number. Every status change goes
//! through [`transition_sales_order`], which validates the action against
//! [`SalesOrderStatus`] and appends the history entry in the same transaction.

use crate::{
    core::{
        access::Principal,
        customer,
        document::{self, LineRequest, PricedLine},
        history::{self, Transition},
        sequence::{self, Series},
        status::{self, DocumentKind, SalesOrderStatus, StatusMachine},
        totals::{self, DocumentTotals},
        validate,
    },
    entities::{SalesOrder, SalesOrderItem, document_comment, sales_order, sales_order_item, status_history},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Accepted order types.
pub const ORDER_TYPES: [&str; 3] = ["Standard", "Rush", "Backorder"];

/// Fields for a new sales order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSalesOrder {
    /// Ordering customer (row id)
    pub customer_id: i64,
    /// Defaults to today
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    /// One of [`ORDER_TYPES`]
    pub order_type: String,
    /// Three-letter currency code
    pub currency: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_delivery: Option<NaiveDate>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default)]
    pub customer_notes: Option<String>,
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

/// Partial update of an order. `items`, when present, replaces every line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SalesOrderUpdate {
    pub order_type: Option<String>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub shipping_method: Option<String>,
    pub tracking_number: Option<String>,
    pub internal_notes: Option<String>,
    pub customer_notes: Option<String>,
    pub global_discount: Option<Decimal>,
    pub shipping_charges: Option<Decimal>,
    pub items: Option<Vec<LineRequest>>,
}

/// An order with its lines and recomputed totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesOrderDetail {
    /// Header row
    pub order: sales_order::Model,
    /// Lines in position order
    pub items: Vec<sales_order_item::Model>,
    /// Totals recomputed from the lines and header
    pub totals: DocumentTotals,
}

impl SalesOrderDetail {
    /// Parsed status of the order.
    pub fn status(&self) -> Result<SalesOrderStatus> {
        self.order.status.parse()
    }

    /// Lines in the shape the calculators and renderers use.
    pub fn lines(&self) -> Result<Vec<PricedLine>> {
        self.items.iter().map(PricedLine::try_from).collect()
    }
}

fn not_found(order_id: i64) -> Error {
    Error::NotFound {
        entity: "sales order",
        key: order_id.to_string(),
    }
}

/// Creates a `Draft` order with the next `SO` number.
///
/// # Errors
/// Returns an error if:
/// - A header field is invalid or a line is out of range
/// - The customer or a product does not exist
/// - The `SO` series is exhausted
#[instrument(skip(db, input), fields(customer_id = input.customer_id))]
pub async fn create_sales_order(
    db: &DatabaseConnection,
    author: Principal,
    input: NewSalesOrder,
) -> Result<SalesOrderDetail> {
    let order_type = validate::one_of("order_type", &input.order_type, &ORDER_TYPES)?;
    let currency = validate::currency("currency", &input.currency)?;
    document::check_header(input.global_discount, input.shipping_charges)?;
    let order_date = input.order_date.unwrap_or_else(|| Utc::now().date_naive());
    check_due_date(order_date, input.due_date)?;

    let txn = db.begin().await?;
    customer::get_customer_by_id(&txn, input.customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "customer",
            key: input.customer_id.to_string(),
        })?;
    let lines = document::price_lines(&txn, &input.items).await?;

    let header = sales_order::ActiveModel {
        customer_id: Set(input.customer_id),
        quotation_id: Set(None),
        order_date: Set(order_date),
        order_type: Set(order_type),
        currency: Set(currency),
        payment_method: Set(validate::optional_text(input.payment_method)),
        due_date: Set(input.due_date),
        expected_delivery: Set(input.expected_delivery),
        shipping_method: Set(validate::optional_text(input.shipping_method)),
        tracking_number: Set(validate::optional_text(input.tracking_number)),
        internal_notes: Set(validate::optional_text(input.internal_notes)),
        customer_notes: Set(validate::optional_text(input.customer_notes)),
        global_discount: Set(input.global_discount),
        shipping_charges: Set(input.shipping_charges),
        ..Default::default()
    };
    let order = insert_order(&txn, header, &lines, author).await?;
    let detail = load_detail(&txn, order).await?;
    txn.commit().await?;

    info!(
        order_number = %detail.order.order_number,
        grand_total = %detail.totals.grand_total,
        "Created sales order"
    );
    Ok(detail)
}

fn check_due_date(order_date: NaiveDate, due_date: Option<NaiveDate>) -> Result<()> {
    match due_date {
        Some(due) if due < order_date => Err(Error::validation(
            "due_date",
            "due date cannot be before the order date",
        )),
        _ => Ok(()),
    }
}

/// Inserts a `Draft` order header and its lines, allocating the `SO` number on `db`.
pub(crate) async fn insert_order<C>(
    db: &C,
    mut header: sales_order::ActiveModel,
    lines: &[PricedLine],
    author: Principal,
) -> Result<sales_order::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let order_number = sequence::next(db, Series::SalesOrder).await?;
    let now = Utc::now();
    header.order_number = Set(order_number.clone());
    header.status = Set(SalesOrderStatus::INITIAL.as_str().to_string());
    header.created_by = Set(author.user_id);
    header.created_at = Set(now);
    header.updated_at = Set(now);

    let order = header
        .insert(db)
        .await
        .map_err(|e| Error::from_insert(e, "order_number", &order_number))?;
    insert_items(db, order.id, lines).await?;
    Ok(order)
}

async fn insert_items<C>(db: &C, order_id: i64, lines: &[PricedLine]) -> Result<()>
where
    C: ConnectionTrait,
{
    for line in lines {
        sales_order_item::ActiveModel {
            sales_order_id: Set(order_id),
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

pub(crate) async fn load_detail<C>(db: &C, order: sales_order::Model) -> Result<SalesOrderDetail>
where
    C: ConnectionTrait,
{
    let items = SalesOrderItem::find()
        .filter(sales_order_item::Column::SalesOrderId.eq(order.id))
        .order_by_asc(sales_order_item::Column::Position)
        .all(db)
        .await?;
    let lines = items
        .iter()
        .map(PricedLine::try_from)
        .collect::<Result<Vec<_>>>()?;
    let totals = document::totals_of(
        &lines,
        totals::round_money(order.global_discount),
        totals::round_money(order.shipping_charges),
    )?;
    Ok(SalesOrderDetail {
        order,
        items,
        totals,
    })
}

async fn find_order<C>(db: &C, order_id: i64) -> Result<sales_order::Model>
where
    C: ConnectionTrait,
{
    SalesOrder::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| not_found(order_id))
}

/// Loads an order with its lines.
pub async fn get_sales_order(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Option<SalesOrderDetail>> {
    match SalesOrder::find_by_id(order_id).one(db).await? {
        Some(order) => load_detail(db, order).await.map(Some),
        None => Ok(None),
    }
}

/// Loads an order by its `SO` number.
pub async fn get_sales_order_by_number(
    db: &DatabaseConnection,
    order_number: &str,
) -> Result<Option<SalesOrderDetail>> {
    let order = SalesOrder::find()
        .filter(sales_order::Column::OrderNumber.eq(order_number))
        .one(db)
        .await?;
    match order {
        Some(order) => load_detail(db, order).await.map(Some),
        None => Ok(None),
    }
}

/// All orders, newest first.
pub async fn list_sales_orders(db: &DatabaseConnection) -> Result<Vec<sales_order::Model>> {
    SalesOrder::find()
        .order_by_desc(sales_order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Edits a non-terminal order. Line totals are recomputed from the new lines.
///
/// # Errors
/// Returns [`Error::InvalidTransition`] when the order is cancelled, plus the
/// validation and lookup errors of [`create_sales_order`].
#[instrument(skip(db, update))]
pub async fn update_sales_order(
    db: &DatabaseConnection,
    order_id: i64,
    update: SalesOrderUpdate,
) -> Result<SalesOrderDetail> {
    let order_type = update
        .order_type
        .map(|t| validate::one_of("order_type", &t, &ORDER_TYPES))
        .transpose()?;
    let currency = update
        .currency
        .map(|c| validate::currency("currency", &c))
        .transpose()?;

    let txn = db.begin().await?;
    let existing = find_order(&txn, order_id).await?;
    status::ensure_editable(existing.status.parse::<SalesOrderStatus>()?, "edit")?;

    let global_discount = update.global_discount.unwrap_or(existing.global_discount);
    let shipping_charges = update.shipping_charges.unwrap_or(existing.shipping_charges);
    document::check_header(global_discount, shipping_charges)?;
    check_due_date(existing.order_date, update.due_date.or(existing.due_date))?;
    let lines = match &update.items {
        Some(items) => Some(document::price_lines(&txn, items).await?),
        None => None,
    };

    let mut order: sales_order::ActiveModel = existing.into();
    if let Some(order_type) = order_type {
        order.order_type = Set(order_type);
    }
    if let Some(currency) = currency {
        order.currency = Set(currency);
    }
    if let Some(payment_method) = update.payment_method {
        order.payment_method = Set(validate::optional_text(Some(payment_method)));
    }
    if let Some(due_date) = update.due_date {
        order.due_date = Set(Some(due_date));
    }
    if let Some(expected_delivery) = update.expected_delivery {
        order.expected_delivery = Set(Some(expected_delivery));
    }
    if let Some(shipping_method) = update.shipping_method {
        order.shipping_method = Set(validate::optional_text(Some(shipping_method)));
    }
    if let Some(tracking_number) = update.tracking_number {
        order.tracking_number = Set(validate::optional_text(Some(tracking_number)));
    }
    if let Some(internal_notes) = update.internal_notes {
        order.internal_notes = Set(validate::optional_text(Some(internal_notes)));
    }
    if let Some(customer_notes) = update.customer_notes {
        order.customer_notes = Set(validate::optional_text(Some(customer_notes)));
    }
    order.global_discount = Set(global_discount);
    order.shipping_charges = Set(shipping_charges);
    order.updated_at = Set(Utc::now());
    let order = order.update(&txn).await?;

    if let Some(lines) = lines {
        SalesOrderItem::delete_many()
            .filter(sales_order_item::Column::SalesOrderId.eq(order.id))
            .exec(&txn)
            .await?;
        insert_items(&txn, order.id, &lines).await?;
    }

    let detail = load_detail(&txn, order).await?;
    txn.commit().await?;
    Ok(detail)
}

/// Applies a status action (`save_draft`, `submit`, `submit_pd`, `cancel`).
///
/// # Errors
/// Returns [`Error::InvalidTransition`] for unknown actions and actions not allowed
/// from the current status; nothing is written in that case.
#[instrument(skip(db))]
pub async fn transition_sales_order(
    db: &DatabaseConnection,
    order_id: i64,
    action: &str,
    actor: Principal,
) -> Result<SalesOrderDetail> {
    let txn = db.begin().await?;
    let existing = find_order(&txn, order_id).await?;
    let from: SalesOrderStatus = existing.status.parse()?;
    let (_, to) = status::resolve(from, action)?;

    let mut order: sales_order::ActiveModel = existing.into();
    order.status = Set(to.as_str().to_string());
    order.updated_at = Set(Utc::now());
    let order = order.update(&txn).await?;

    history::record(
        &txn,
        Transition {
            kind: DocumentKind::SalesOrder,
            document_id: order.id,
            from: from.as_str(),
            to: to.as_str(),
            action,
        },
        actor,
    )
    .await?;

    let detail = load_detail(&txn, order).await?;
    txn.commit().await?;

    info!(
        order_number = %detail.order.order_number,
        from = from.as_str(),
        to = to.as_str(),
        "Sales order status changed"
    );
    Ok(detail)
}

/// Deletes an order with its lines, history and comments.
pub async fn delete_sales_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let order = find_order(&txn, order_id).await?;
    SalesOrderItem::delete_many()
        .filter(sales_order_item::Column::SalesOrderId.eq(order.id))
        .exec(&txn)
        .await?;
    history::purge(&txn, DocumentKind::SalesOrder, order.id).await?;
    SalesOrder::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    info!(order_number = %order.order_number, "Deleted sales order");
    Ok(())
}

/// Status history of an order, oldest first.
pub async fn sales_order_history(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Vec<status_history::Model>> {
    find_order(db, order_id).await?;
    history::list(db, DocumentKind::SalesOrder, order_id).await
}

/// Adds a comment to an order.
pub async fn comment_on_sales_order(
    db: &DatabaseConnection,
    order_id: i64,
    author: Principal,
    body: &str,
) -> Result<document_comment::Model> {
    find_order(db, order_id).await?;
    history::add_comment(db, DocumentKind::SalesOrder, order_id, author, body).await
}

/// Comments on an order, oldest first.
pub async fn sales_order_comments(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Vec<document_comment::Model>> {
    find_order(db, order_id).await?;
    history::list_comments(db, DocumentKind::SalesOrder, order_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn order_for(customer_id: i64, items: Vec<LineRequest>) -> NewSalesOrder {
        NewSalesOrder {
            customer_id,
            order_date: None,
            order_type: "Standard".to_string(),
            currency: "USD".to_string(),
            payment_method: None,
            due_date: None,
            expected_delivery: None,
            shipping_method: None,
            tracking_number: None,
            internal_notes: None,
            customer_notes: None,
            global_discount: Decimal::ZERO,
            shipping_charges: Decimal::ZERO,
            items,
        }
    }

    #[tokio::test]
    async fn test_create_sales_order_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let author = Principal { user_id: 1 };

        let mut input = order_for(1, vec![]);
        input.order_type = "Express".to_string();
        let result = create_sales_order(&db, author, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "order_type"));

        let mut input = order_for(1, vec![]);
        input.global_discount = Decimal::from(120);
        let result = create_sales_order(&db, author, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "global_discount"));

        let mut input = order_for(1, vec![]);
        input.order_date = NaiveDate::from_ymd_opt(2025, 3, 10);
        input.due_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        let result = create_sales_order(&db, author, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "due_date"));

        Ok(())
    }

    #[tokio::test]
    async fn test_grand_total_example() -> Result<()> {
        let (db, admin, customer, _) = setup_with_catalog().await?;
        let bolt = create_custom_product(&db, "Bolt", Decimal::from(100), Decimal::from(5)).await?;
        let nut = create_custom_product(&db, "Nut", Decimal::from(50), Decimal::from(10)).await?;

        let mut first = LineRequest::new(bolt.id, 2);
        first.discount_pct = Decimal::from(10);
        let second = LineRequest::new(nut.id, 1);
        let mut input = order_for(customer.id, vec![first, second]);
        input.shipping_charges = Decimal::from(20);

        let detail = create_sales_order(&db, admin, input).await?;

        assert_eq!(detail.order.order_number, "SO0001");
        assert_eq!(detail.order.status, "Draft");
        assert_eq!(detail.items[0].total, Decimal::new(18900, 2));
        assert_eq!(detail.items[1].total, Decimal::new(5500, 2));
        assert_eq!(detail.totals.grand_total, Decimal::new(26400, 2));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_customer_rolls_back_number() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;

        let result = create_sales_order(&db, admin, order_for(999, vec![LineRequest::new(product.id, 1)])).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { entity: "customer", .. }));

        let result = create_sales_order(&db, admin, order_for(customer.id, vec![LineRequest::new(404, 1)])).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { entity: "product", .. }));

        let detail = create_sales_order(&db, admin, order_for(customer.id, vec![LineRequest::new(product.id, 1)])).await?;
        assert_eq!(detail.order.order_number, "SO0001");

        Ok(())
    }

    #[tokio::test]
    async fn test_noop_save_keeps_grand_total() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let mut input = order_for(customer.id, vec![LineRequest::new(product.id, 3)]);
        input.global_discount = Decimal::new(75, 1);
        input.shipping_charges = Decimal::new(1299, 2);
        let created = create_sales_order(&db, admin, input).await?;

        let saved = update_sales_order(&db, created.order.id, SalesOrderUpdate::default()).await?;
        assert_eq!(saved.totals, created.totals);
        assert_eq!(saved.items, created.items);

        let reloaded = get_sales_order(&db, created.order.id).await?.unwrap();
        assert_eq!(reloaded.totals.grand_total, created.totals.grand_total);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_lines() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let created = create_sales_order(&db, admin, order_for(customer.id, vec![LineRequest::new(product.id, 1)])).await?;

        let updated = update_sales_order(
            &db,
            created.order.id,
            SalesOrderUpdate {
                items: Some(vec![LineRequest::new(product.id, 2), LineRequest::new(product.id, 5)]),
                tracking_number: Some("TRK-1".to_string()),
                ..SalesOrderUpdate::default()
            },
        )
        .await?;

        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.items[1].quantity, 5);
        assert_eq!(updated.order.tracking_number.as_deref(), Some("TRK-1"));
        assert_eq!(SalesOrderItem::find().all(&db).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_transitions_record_history() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;

        let saved = transition_sales_order(&db, order.order.id, "save_draft", admin).await?;
        assert_eq!(saved.order.status, "Draft");
        let submitted = transition_sales_order(&db, order.order.id, "submit_pd", admin).await?;
        assert_eq!(submitted.status()?, SalesOrderStatus::SubmittedPd);

        // Rejected actions leave no trace
        let result = transition_sales_order(&db, order.order.id, "submit", admin).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));
        let result = transition_sales_order(&db, order.order.id, "ship", admin).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));

        let entries = sales_order_history(&db, order.order.id).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].from_status, "Draft");
        assert_eq!(entries[1].to_status, "Submitted(PD)");
        assert_eq!(entries[1].action, "submit_pd");
        assert_eq!(entries[1].actor_id, admin.user_id);

        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_order_is_frozen() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;

        // Drafts cannot be cancelled
        let result = transition_sales_order(&db, order.order.id, "cancel", admin).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));

        transition_sales_order(&db, order.order.id, "submit", admin).await?;
        transition_sales_order(&db, order.order.id, "cancel", admin).await?;

        for action in ["save_draft", "submit", "submit_pd", "cancel"] {
            let result = transition_sales_order(&db, order.order.id, action, admin).await;
            assert!(matches!(
                result.unwrap_err(),
                Error::InvalidTransition { from, .. } if from == "Cancelled"
            ));
        }
        let result = update_sales_order(&db, order.order.id, SalesOrderUpdate::default()).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTransition { .. }));
        assert_eq!(sales_order_history(&db, order.order.id).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_comments_and_delete() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;
        transition_sales_order(&db, order.order.id, "submit", admin).await?;
        comment_on_sales_order(&db, order.order.id, admin, "Customer asked for split delivery").await?;
        assert_eq!(sales_order_comments(&db, order.order.id).await?.len(), 1);

        let missing = comment_on_sales_order(&db, 999, admin, "hello").await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        delete_sales_order(&db, order.order.id).await?;
        assert!(get_sales_order(&db, order.order.id).await?.is_none());
        assert!(SalesOrderItem::find().all(&db).await?.is_empty());
        assert!(history::list(&db, DocumentKind::SalesOrder, order.order.id).await?.is_empty());

        Ok(())
    }
}
