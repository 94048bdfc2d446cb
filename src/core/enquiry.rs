//! Enquiries - Inbound sales leads with their requested items.

use crate::{
    core::{
        access::Principal,
        sequence::{self, Series},
        totals, validate,
    },
    entities::{Enquiry, EnquiryItem, enquiry, enquiry_item},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Accepted enquiry types.
pub const ENQUIRY_TYPES: [&str; 2] = ["Product", "Service"];
/// Accepted enquiry statuses.
pub const ENQUIRY_STATUSES: [&str; 3] = ["New", "In Process", "Closed"];
/// Accepted priorities.
pub const PRIORITIES: [&str; 3] = ["High", "Medium", "Low"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnquiryItemRequest {
    pub item_code: String,
    pub product_description: String,
    #[serde(default)]
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub quantity: u32,
}

/// Fields for a new enquiry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEnquiry {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub city: String,
    /// One of [`ENQUIRY_TYPES`]
    pub enquiry_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// One of [`PRIORITIES`]
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub items: Vec<EnquiryItemRequest>,
}

/// Partial update. `items`, when present, replaces every item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnquiryUpdate {
    pub description: Option<String>,
    pub source: Option<String>,
    /// One of [`ENQUIRY_STATUSES`]
    pub status: Option<String>,
    pub priority: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub items: Option<Vec<EnquiryItemRequest>>,
}

/// An enquiry with its items and grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnquiryDetail {
    pub enquiry: enquiry::Model,
    pub items: Vec<enquiry_item::Model>,
    /// Sum of the item totals
    pub grand_total: Decimal,
}

struct PricedItem {
    request: EnquiryItemRequest,
    quantity: i32,
    total: Decimal,
}

fn price_items(items: Vec<EnquiryItemRequest>) -> Result<Vec<PricedItem>> {
    items
        .into_iter()
        .map(|item| {
            validate::required_text("item_code", &item.item_code)?;
            validate::non_negative("cost_price", item.cost_price)?;
            let total = totals::enquiry_item_total(item.selling_price, item.quantity)?;
            let quantity = validate::stored_quantity("quantity", item.quantity)?;
            Ok(PricedItem {
                request: item,
                quantity,
                total,
            })
        })
        .collect()
}

async fn insert_items<C>(db: &C, enquiry_id: i64, items: Vec<PricedItem>) -> Result<()>
where
    C: ConnectionTrait,
{
    for (position, item) in (1..).zip(items) {
        enquiry_item::ActiveModel {
            enquiry_id: Set(enquiry_id),
            position: Set(position),
            item_code: Set(item.request.item_code.trim().to_string()),
            product_description: Set(item.request.product_description.trim().to_string()),
            cost_price: Set(item.request.cost_price),
            selling_price: Set(item.request.selling_price),
            quantity: Set(item.quantity),
            total_amount: Set(item.total),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Creates an enquiry in status `New` with the next `ENQ` number.
#[instrument(skip(db, input), fields(email = %input.email))]
pub async fn create_enquiry(
    db: &DatabaseConnection,
    author: Principal,
    input: NewEnquiry,
) -> Result<EnquiryDetail> {
    let first_name = validate::required_text("first_name", &input.first_name)?;
    let last_name = validate::required_text("last_name", &input.last_name)?;
    let email = validate::email("email", &input.email)?;
    let phone_number = validate::required_text("phone_number", &input.phone_number)?;
    let city = validate::required_text("city", &input.city)?;
    let enquiry_type = validate::one_of("enquiry_type", &input.enquiry_type, &ENQUIRY_TYPES)?;
    let priority = validate::optional_text(input.priority)
        .map(|p| validate::one_of("priority", &p, &PRIORITIES))
        .transpose()?;
    let items = price_items(input.items)?;

    let txn = db.begin().await?;
    let enquiry_number = sequence::next(&txn, Series::Enquiry).await?;
    let enquiry = enquiry::ActiveModel {
        enquiry_number: Set(enquiry_number.clone()),
        first_name: Set(first_name),
        last_name: Set(last_name),
        email: Set(email),
        phone_number: Set(phone_number),
        city: Set(city),
        enquiry_type: Set(enquiry_type),
        description: Set(validate::optional_text(input.description)),
        source: Set(validate::optional_text(input.source)),
        status: Set(ENQUIRY_STATUSES[0].to_string()),
        priority: Set(priority),
        created_by: Set(author.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::from_insert(e, "enquiry_number", &enquiry_number))?;
    insert_items(&txn, enquiry.id, items).await?;
    let detail = load_detail(&txn, enquiry).await?;
    txn.commit().await?;

    info!(enquiry_number = %detail.enquiry.enquiry_number, "Created enquiry");
    Ok(detail)
}

async fn load_detail<C>(db: &C, enquiry: enquiry::Model) -> Result<EnquiryDetail>
where
    C: ConnectionTrait,
{
    let items = EnquiryItem::find()
        .filter(enquiry_item::Column::EnquiryId.eq(enquiry.id))
        .order_by_asc(enquiry_item::Column::Position)
        .all(db)
        .await?;
    let grand_total = items.iter().map(|i| totals::round_money(i.total_amount)).sum();
    Ok(EnquiryDetail {
        enquiry,
        items,
        grand_total,
    })
}

/// Loads an enquiry with its items.
pub async fn get_enquiry(db: &DatabaseConnection, enquiry_id: i64) -> Result<Option<EnquiryDetail>> {
    match Enquiry::find_by_id(enquiry_id).one(db).await? {
        Some(enquiry) => load_detail(db, enquiry).await.map(Some),
        None => Ok(None),
    }
}

/// All enquiries, newest first.
pub async fn list_enquiries(db: &DatabaseConnection) -> Result<Vec<enquiry::Model>> {
    Enquiry::find()
        .order_by_desc(enquiry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update, replacing the items when given.
pub async fn update_enquiry(
    db: &DatabaseConnection,
    enquiry_id: i64,
    update: EnquiryUpdate,
) -> Result<EnquiryDetail> {
    let status = update
        .status
        .map(|s| validate::one_of("status", &s, &ENQUIRY_STATUSES))
        .transpose()?;
    let priority = update
        .priority
        .map(|p| validate::one_of("priority", &p, &PRIORITIES))
        .transpose()?;
    let phone_number = update
        .phone_number
        .map(|p| validate::required_text("phone_number", &p))
        .transpose()?;
    let city = update
        .city
        .map(|c| validate::required_text("city", &c))
        .transpose()?;
    let items = update.items.map(price_items).transpose()?;

    let txn = db.begin().await?;
    let existing = Enquiry::find_by_id(enquiry_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "enquiry",
            key: enquiry_id.to_string(),
        })?;

    let mut enquiry: enquiry::ActiveModel = existing.into();
    if let Some(description) = update.description {
        enquiry.description = Set(validate::optional_text(Some(description)));
    }
    if let Some(source) = update.source {
        enquiry.source = Set(validate::optional_text(Some(source)));
    }
    if let Some(status) = status {
        enquiry.status = Set(status);
    }
    if let Some(priority) = priority {
        enquiry.priority = Set(Some(priority));
    }
    if let Some(phone_number) = phone_number {
        enquiry.phone_number = Set(phone_number);
    }
    if let Some(city) = city {
        enquiry.city = Set(city);
    }
    let enquiry = enquiry.update(&txn).await?;

    if let Some(items) = items {
        EnquiryItem::delete_many()
            .filter(enquiry_item::Column::EnquiryId.eq(enquiry.id))
            .exec(&txn)
            .await?;
        insert_items(&txn, enquiry.id, items).await?;
    }

    let detail = load_detail(&txn, enquiry).await?;
    txn.commit().await?;
    Ok(detail)
}

/// Deletes an enquiry and its items.
pub async fn delete_enquiry(db: &DatabaseConnection, enquiry_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    EnquiryItem::delete_many()
        .filter(enquiry_item::Column::EnquiryId.eq(enquiry_id))
        .exec(&txn)
        .await?;
    let result = Enquiry::delete_by_id(enquiry_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "enquiry",
            key: enquiry_id.to_string(),
        });
    }
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    const AUTHOR: Principal = Principal { user_id: 1 };

    fn lead() -> NewEnquiry {
        NewEnquiry {
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            phone_number: "+91 98450 00000".to_string(),
            city: "Chennai".to_string(),
            enquiry_type: "Product".to_string(),
            items: vec![
                EnquiryItemRequest {
                    item_code: "CVB0001".to_string(),
                    product_description: "Steel bolt".to_string(),
                    cost_price: Decimal::from(8),
                    selling_price: Decimal::new(1250, 2),
                    quantity: 4,
                },
                EnquiryItemRequest {
                    item_code: "CVB0002".to_string(),
                    product_description: "Washer".to_string(),
                    cost_price: Decimal::ONE,
                    selling_price: Decimal::new(150, 2),
                    quantity: 10,
                },
            ],
            ..NewEnquiry::default()
        }
    }

    #[tokio::test]
    async fn test_create_enquiry_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_enquiry(&db, AUTHOR, NewEnquiry { enquiry_type: "Rental".to_string(), ..lead() }).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "enquiry_type"));

        let result = create_enquiry(&db, AUTHOR, NewEnquiry { city: String::new(), ..lead() }).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "city"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_enquiry_with_items() -> Result<()> {
        let db = setup_test_db().await?;

        let detail = create_enquiry(&db, AUTHOR, lead()).await?;
        assert_eq!(detail.enquiry.enquiry_number, "ENQ001");
        assert_eq!(detail.enquiry.status, "New");
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].total_amount, Decimal::from(50));
        assert_eq!(detail.items[1].total_amount, Decimal::from(15));
        assert_eq!(detail.grand_total, Decimal::from(65));

        let second = create_enquiry(&db, AUTHOR, lead()).await?;
        assert_eq!(second.enquiry.enquiry_number, "ENQ002");

        Ok(())
    }

    #[tokio::test]
    async fn test_update_enquiry_replaces_items() -> Result<()> {
        let db = setup_test_db().await?;
        let detail = create_enquiry(&db, AUTHOR, lead()).await?;

        let updated = update_enquiry(
            &db,
            detail.enquiry.id,
            EnquiryUpdate {
                status: Some("In Process".to_string()),
                items: Some(vec![EnquiryItemRequest {
                    item_code: "SVC-1".to_string(),
                    product_description: "Installation".to_string(),
                    cost_price: Decimal::ZERO,
                    selling_price: Decimal::from(200),
                    quantity: 1,
                }]),
                ..EnquiryUpdate::default()
            },
        )
        .await?;

        assert_eq!(updated.enquiry.status, "In Process");
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.grand_total, Decimal::from(200));

        let result = update_enquiry(
            &db,
            detail.enquiry.id,
            EnquiryUpdate {
                status: Some("Won".to_string()),
                ..EnquiryUpdate::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_enquiry() -> Result<()> {
        let db = setup_test_db().await?;
        let detail = create_enquiry(&db, AUTHOR, lead()).await?;

        delete_enquiry(&db, detail.enquiry.id).await?;
        assert!(get_enquiry(&db, detail.enquiry.id).await?.is_none());
        assert!(EnquiryItem::find().all(&db).await?.is_empty());
        assert!(list_enquiries(&db).await?.is_empty());

        let result = delete_enquiry(&db, detail.enquiry.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }
}
