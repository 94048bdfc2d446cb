//! Customer records.
//!
//! Customers get a `CUS` code unless the caller supplies one. Supplied codes in
//! exact series format advance the counter so later allocations skip them.

use crate::{
    core::{
        sequence::{self, Series},
        validate,
    },
    entities::{Customer, Quotation, SalesOrder, customer, quotation, sales_order},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Fields for a new customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    /// Caller-supplied code; allocated from the `CUS` series when absent
    #[serde(default)]
    pub customer_code: Option<String>,
    /// Given name
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Customer type (e.g. `"Business"`)
    pub customer_type: String,
    /// Company name for business customers
    #[serde(default)]
    pub company_name: Option<String>,
    /// Account status, `"Active"` when blank
    #[serde(default)]
    pub status: String,
    /// Unique email
    pub email: String,
    /// Phone number
    #[serde(default)]
    pub phone_number: Option<String>,
    /// City
    #[serde(default)]
    pub city: Option<String>,
    /// Credit limit
    #[serde(default)]
    pub credit_limit: Decimal,
    /// Credit still available, 0 when absent
    #[serde(default)]
    pub available_limit: Option<Decimal>,
}

/// Partial update of a customer. The code never changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub customer_type: Option<String>,
    pub company_name: Option<String>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub credit_limit: Option<Decimal>,
    pub available_limit: Option<Decimal>,
}

/// Name shown on documents: the company when set, otherwise the person.
#[must_use]
pub fn display_name(customer: &customer::Model) -> String {
    match &customer.company_name {
        Some(company) => company.clone(),
        None => format!("{} {}", customer.first_name, customer.last_name)
            .trim()
            .to_string(),
    }
}

/// All customers ordered by code.
pub async fn list_customers(db: &DatabaseConnection) -> Result<Vec<customer::Model>> {
    Customer::find()
        .order_by_asc(customer::Column::CustomerCode)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks a customer up by row id.
pub async fn get_customer_by_id<C>(db: &C, customer_id: i64) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find_by_id(customer_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks a customer up by code.
pub async fn get_customer_by_code<C>(db: &C, code: &str) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find()
        .filter(customer::Column::CustomerCode.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks a customer up by (normalized) email.
pub async fn get_customer_by_email<C>(db: &C, email: &str) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find()
        .filter(customer::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a customer.
///
/// # Errors
/// Returns an error if:
/// - A required field is blank, the email is malformed or a limit is negative
/// - A supplied code uses the `CUS` prefix but is not in `CUS####` form
/// - The code or email is already taken ([`Error::DuplicateKey`])
/// - The `CUS` series is exhausted
#[instrument(skip(db, input), fields(email = %input.email))]
pub async fn create_customer(
    db: &DatabaseConnection,
    input: NewCustomer,
) -> Result<customer::Model> {
    let customer = validated(input)?;
    let txn = db.begin().await?;
    let customer = insert_customer(&txn, customer).await?;
    txn.commit().await?;

    info!(customer_code = %customer.customer_code, "Created customer");
    Ok(customer)
}

/// Normalizes and checks a new customer without touching storage.
pub fn validated(input: NewCustomer) -> Result<NewCustomer> {
    let customer_code = validate::optional_text(input.customer_code);
    if let Some(code) = &customer_code {
        Series::Customer.check_supplied("customer_code", code)?;
    }
    let status = validate::optional_text(Some(input.status)).unwrap_or_else(|| "Active".to_string());

    Ok(NewCustomer {
        customer_code,
        first_name: validate::required_text("first_name", &input.first_name)?,
        last_name: input.last_name.trim().to_string(),
        customer_type: validate::required_text("customer_type", &input.customer_type)?,
        company_name: validate::optional_text(input.company_name),
        status,
        email: validate::email("email", &input.email)?,
        phone_number: validate::optional_text(input.phone_number),
        city: validate::optional_text(input.city),
        credit_limit: validate::non_negative("credit_limit", input.credit_limit)?,
        available_limit: Some(validate::non_negative(
            "available_limit",
            input.available_limit.unwrap_or_default(),
        )?),
    })
}

/// Inserts an already validated customer on `db`, allocating or observing the code.
pub(crate) async fn insert_customer<C>(db: &C, input: NewCustomer) -> Result<customer::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    if get_customer_by_email(db, &input.email).await?.is_some() {
        return Err(Error::DuplicateKey {
            field: "email".to_string(),
            value: input.email,
        });
    }

    let customer_code = match input.customer_code {
        Some(code) => {
            if get_customer_by_code(db, &code).await?.is_some() {
                return Err(Error::DuplicateKey {
                    field: "customer_code".to_string(),
                    value: code,
                });
            }
            sequence::observe(db, Series::Customer, &code).await?;
            code
        }
        None => sequence::next(db, Series::Customer).await?,
    };

    let now = Utc::now();
    let email = input.email;
    let customer = customer::ActiveModel {
        customer_code: Set(customer_code.clone()),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        customer_type: Set(input.customer_type),
        company_name: Set(input.company_name),
        status: Set(input.status),
        email: Set(email.clone()),
        phone_number: Set(input.phone_number),
        city: Set(input.city),
        credit_limit: Set(input.credit_limit),
        available_limit: Set(input.available_limit.unwrap_or_default()),
        created_at: Set(now),
        last_edit_date: Set(now),
        ..Default::default()
    };
    customer
        .insert(db)
        .await
        .map_err(|e| {
            Error::from_unique_insert(e, &[("customer_code", customer_code.as_str()), ("email", email.as_str())])
        })
}

/// Applies a partial update.
///
/// # Errors
/// Returns an error if a provided field is invalid, the customer does not exist,
/// or the new email belongs to another customer.
pub async fn update_customer(
    db: &DatabaseConnection,
    customer_id: i64,
    update: CustomerUpdate,
) -> Result<customer::Model> {
    let first_name = update
        .first_name
        .map(|v| validate::required_text("first_name", &v))
        .transpose()?;
    let customer_type = update
        .customer_type
        .map(|v| validate::required_text("customer_type", &v))
        .transpose()?;
    let status = update
        .status
        .map(|v| validate::required_text("status", &v))
        .transpose()?;
    let email = update
        .email
        .map(|v| validate::email("email", &v))
        .transpose()?;
    let credit_limit = update
        .credit_limit
        .map(|v| validate::non_negative("credit_limit", v))
        .transpose()?;
    let available_limit = update
        .available_limit
        .map(|v| validate::non_negative("available_limit", v))
        .transpose()?;

    let existing = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "customer",
            key: customer_id.to_string(),
        })?;

    if let Some(email) = &email {
        if let Some(other) = get_customer_by_email(db, email).await? {
            if other.id != existing.id {
                return Err(Error::DuplicateKey {
                    field: "email".to_string(),
                    value: email.clone(),
                });
            }
        }
    }

    let mut customer: customer::ActiveModel = existing.into();
    if let Some(first_name) = first_name {
        customer.first_name = Set(first_name);
    }
    if let Some(last_name) = update.last_name {
        customer.last_name = Set(last_name.trim().to_string());
    }
    if let Some(customer_type) = customer_type {
        customer.customer_type = Set(customer_type);
    }
    if let Some(company_name) = update.company_name {
        customer.company_name = Set(validate::optional_text(Some(company_name)));
    }
    if let Some(status) = status {
        customer.status = Set(status);
    }
    if let Some(email) = email.clone() {
        customer.email = Set(email);
    }
    if let Some(phone_number) = update.phone_number {
        customer.phone_number = Set(validate::optional_text(Some(phone_number)));
    }
    if let Some(city) = update.city {
        customer.city = Set(validate::optional_text(Some(city)));
    }
    if let Some(credit_limit) = credit_limit {
        customer.credit_limit = Set(credit_limit);
    }
    if let Some(available_limit) = available_limit {
        customer.available_limit = Set(available_limit);
    }
    customer.last_edit_date = Set(Utc::now());

    customer
        .update(db)
        .await
        .map_err(|e| Error::from_insert(e, "email", email.as_deref().unwrap_or_default()))
}

/// Deletes a customer that no quotation or sales order refers to.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown id and [`Error::Validation`] while
/// documents still reference the customer.
pub async fn delete_customer(db: &DatabaseConnection, customer_id: i64) -> Result<()> {
    let customer = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "customer",
            key: customer_id.to_string(),
        })?;

    let quotations = Quotation::find()
        .filter(quotation::Column::CustomerId.eq(customer.id))
        .count(db)
        .await?;
    let orders = SalesOrder::find()
        .filter(sales_order::Column::CustomerId.eq(customer.id))
        .count(db)
        .await?;
    if quotations + orders > 0 {
        return Err(Error::validation(
            "customer",
            format!(
                "{} is referenced by {quotations} quotation(s) and {orders} sales order(s)",
                customer.customer_code
            ),
        ));
    }

    Customer::delete_by_id(customer.id).exec(db).await?;
    info!(customer_code = %customer.customer_code, "Deleted customer");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn jane() -> NewCustomer {
        NewCustomer {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            customer_type: "Individual".to_string(),
            email: "jane@example.com".to_string(),
            credit_limit: Decimal::from(5000),
            ..NewCustomer::default()
        }
    }

    #[tokio::test]
    async fn test_create_customer_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_customer(&db, NewCustomer { email: "nope".to_string(), ..jane() }).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "email"));

        let result = create_customer(&db, NewCustomer { first_name: " ".to_string(), ..jane() }).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "first_name"));

        let result = create_customer(
            &db,
            NewCustomer {
                credit_limit: Decimal::NEGATIVE_ONE,
                ..jane()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "credit_limit"));

        let result = create_customer(
            &db,
            NewCustomer {
                customer_code: Some("CUS12".to_string()),
                ..jane()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "customer_code"));

        Ok(())
    }

    #[tokio::test]
    async fn test_customers_get_sequential_codes() -> Result<()> {
        let db = setup_test_db().await?;

        let first = create_customer(&db, jane()).await?;
        let second = create_customer(&db, NewCustomer { email: "john@example.com".to_string(), ..jane() }).await?;

        assert_eq!(first.customer_code, "CUS0001");
        assert_eq!(second.customer_code, "CUS0002");
        assert_eq!(first.status, "Active");
        assert_eq!(first.available_limit, Decimal::ZERO);

        Ok(())
    }

    #[tokio::test]
    async fn test_supplied_code_advances_series() -> Result<()> {
        let db = setup_test_db().await?;

        let imported = create_customer(
            &db,
            NewCustomer {
                customer_code: Some("CUS0040".to_string()),
                ..jane()
            },
        )
        .await?;
        let external = create_customer(
            &db,
            NewCustomer {
                customer_code: Some("ACME-1".to_string()),
                email: "acme@example.com".to_string(),
                ..jane()
            },
        )
        .await?;
        let next = create_customer(&db, NewCustomer { email: "next@example.com".to_string(), ..jane() }).await?;

        assert_eq!(imported.customer_code, "CUS0040");
        assert_eq!(external.customer_code, "ACME-1");
        assert_eq!(next.customer_code, "CUS0041");

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected_without_burning_codes() -> Result<()> {
        let db = setup_test_db().await?;
        create_customer(&db, jane()).await?;

        let result = create_customer(&db, NewCustomer { email: "JANE@example.com".to_string(), ..jane() }).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicateKey { field, .. } if field == "email"
        ));

        let result = create_customer(
            &db,
            NewCustomer {
                customer_code: Some("CUS0001".to_string()),
                email: "other@example.com".to_string(),
                ..jane()
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicateKey { field, .. } if field == "customer_code"
        ));

        let next = create_customer(&db, NewCustomer { email: "other@example.com".to_string(), ..jane() }).await?;
        assert_eq!(next.customer_code, "CUS0002");

        Ok(())
    }

    fn raw_row(code: &str, email: &str) -> customer::ActiveModel {
        let now = Utc::now();
        customer::ActiveModel {
            customer_code: Set(code.to_string()),
            first_name: Set("Raw".to_string()),
            last_name: Set("Row".to_string()),
            customer_type: Set("Individual".to_string()),
            company_name: Set(None),
            status: Set("Active".to_string()),
            email: Set(email.to_string()),
            phone_number: Set(None),
            city: Set(None),
            credit_limit: Set(Decimal::ZERO),
            available_limit: Set(Decimal::ZERO),
            created_at: Set(now),
            last_edit_date: Set(now),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unique_violation_names_the_clashing_column() -> Result<()> {
        let db = setup_test_db().await?;
        let existing = create_customer(&db, jane()).await?;

        let err = raw_row("CUS0100", &existing.email).insert(&db).await.unwrap_err();
        let mapped =
            Error::from_unique_insert(err, &[("customer_code", "CUS0100"), ("email", existing.email.as_str())]);
        assert!(matches!(
            mapped,
            Error::DuplicateKey { field, value } if field == "email" && value == existing.email
        ));

        let err = raw_row(&existing.customer_code, "fresh@example.com").insert(&db).await.unwrap_err();
        let mapped = Error::from_unique_insert(
            err,
            &[("customer_code", existing.customer_code.as_str()), ("email", "fresh@example.com")],
        );
        assert!(matches!(
            mapped,
            Error::DuplicateKey { field, .. } if field == "customer_code"
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let jane_row = create_customer(&db, jane()).await?;
        let john = create_customer(&db, NewCustomer { email: "john@example.com".to_string(), ..jane() }).await?;

        let updated = update_customer(
            &db,
            jane_row.id,
            CustomerUpdate {
                company_name: Some("Doe Ltd".to_string()),
                credit_limit: Some(Decimal::from(7500)),
                ..CustomerUpdate::default()
            },
        )
        .await?;
        assert_eq!(updated.company_name.as_deref(), Some("Doe Ltd"));
        assert_eq!(updated.credit_limit, Decimal::from(7500));
        assert_eq!(updated.customer_code, "CUS0001");
        assert_eq!(display_name(&updated), "Doe Ltd");
        assert_eq!(display_name(&john), "Jane Doe");

        let clash = update_customer(
            &db,
            john.id,
            CustomerUpdate {
                email: Some("jane@example.com".to_string()),
                ..CustomerUpdate::default()
            },
        )
        .await;
        assert!(matches!(clash.unwrap_err(), Error::DuplicateKey { .. }));

        let missing = update_customer(&db, 999, CustomerUpdate::default()).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { entity: "customer", .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_customer(&db, jane()).await?;

        delete_customer(&db, customer.id).await?;
        assert!(get_customer_by_id(&db, customer.id).await?.is_none());
        assert!(list_customers(&db).await?.is_empty());

        let result = delete_customer(&db, customer.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_customer_with_documents_is_kept() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        create_test_sales_order(&db, admin, customer.id, product.id).await?;

        let result = delete_customer(&db, customer.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { field, .. } if field == "customer"));

        Ok(())
    }
}
