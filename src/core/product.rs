//! Product catalog - Handles product creation, lookup, updates and retirement.
//!
//! Products carry a `CVB` series code, a unit price and a default tax rate that
//! quotation and sales order lines start from. Retired products stay in the table
//! so that existing document lines keep resolving.

use crate::{
    core::{
        sequence::{self, Series},
        validate,
    },
    entities::{Product, product},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Fields for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Display name
    pub name: String,
    /// Free-form product type (e.g. `"Goods"`)
    pub product_type: String,
    /// Longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Catalog category
    #[serde(default)]
    pub category: Option<String>,
    /// Unit of measure
    pub uom: String,
    /// Price of one unit
    pub unit_price: Decimal,
    /// Default tax percentage
    #[serde(default)]
    pub tax_pct: Decimal,
}

/// Partial update of a product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductUpdate {
    /// New display name
    pub name: Option<String>,
    /// New product type
    pub product_type: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New unit of measure
    pub uom: Option<String>,
    /// New unit price
    pub unit_price: Option<Decimal>,
    /// New default tax percentage
    pub tax_pct: Option<Decimal>,
}

/// All active products, ordered by code.
pub async fn get_all_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::ProductCode)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks a product up by row id, active or not.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks a product up by its `CVB` code.
pub async fn get_product_by_code(
    db: &DatabaseConnection,
    product_code: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::ProductCode.eq(product_code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a product with the next `CVB` code.
///
/// # Errors
/// Returns an error if:
/// - The name, type or unit of measure is blank
/// - The unit price or tax rate is out of range
/// - The `CVB` series is exhausted
/// - The database insert fails
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_product(db: &DatabaseConnection, input: NewProduct) -> Result<product::Model> {
    let name = validate::required_text("name", &input.name)?;
    let product_type = validate::required_text("product_type", &input.product_type)?;
    let uom = validate::required_text("uom", &input.uom)?;
    let unit_price = validate::unit_price("unit_price", input.unit_price)?;
    let tax_pct = validate::rate("tax_pct", input.tax_pct)?;

    let txn = db.begin().await?;
    let product_code = sequence::next(&txn, Series::Product).await?;
    let now = Utc::now();

    let product = product::ActiveModel {
        product_code: Set(product_code.clone()),
        name: Set(name),
        product_type: Set(product_type),
        description: Set(validate::optional_text(input.description)),
        category: Set(validate::optional_text(input.category)),
        uom: Set(uom),
        unit_price: Set(unit_price),
        tax_pct: Set(tax_pct),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let product = product
        .insert(&txn)
        .await
        .map_err(|e| Error::from_insert(e, "product_code", &product_code))?;
    txn.commit().await?;

    info!(product_code = %product.product_code, "Created product");
    Ok(product)
}

/// Applies a partial update to an active product.
///
/// # Errors
/// Returns an error if a provided field is invalid, the product does not exist or is
/// retired, or the database update fails.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    update: ProductUpdate,
) -> Result<product::Model> {
    // Validate before touching storage
    let name = update
        .name
        .map(|v| validate::required_text("name", &v))
        .transpose()?;
    let product_type = update
        .product_type
        .map(|v| validate::required_text("product_type", &v))
        .transpose()?;
    let uom = update
        .uom
        .map(|v| validate::required_text("uom", &v))
        .transpose()?;
    let unit_price = update
        .unit_price
        .map(|v| validate::unit_price("unit_price", v))
        .transpose()?;
    let tax_pct = update
        .tax_pct
        .map(|v| validate::rate("tax_pct", v))
        .transpose()?;

    let mut product: product::ActiveModel = active_product(db, product_id).await?.into();

    if let Some(name) = name {
        product.name = Set(name);
    }
    if let Some(product_type) = product_type {
        product.product_type = Set(product_type);
    }
    if let Some(description) = update.description {
        product.description = Set(validate::optional_text(Some(description)));
    }
    if let Some(category) = update.category {
        product.category = Set(validate::optional_text(Some(category)));
    }
    if let Some(uom) = uom {
        product.uom = Set(uom);
    }
    if let Some(unit_price) = unit_price {
        product.unit_price = Set(unit_price);
    }
    if let Some(tax_pct) = tax_pct {
        product.tax_pct = Set(tax_pct);
    }
    product.updated_at = Set(Utc::now());

    product.update(db).await.map_err(Into::into)
}

/// Retires a product. It disappears from the catalog but existing lines keep it.
///
/// # Errors
/// Returns an error if the product does not exist or is already retired.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let mut product: product::ActiveModel = active_product(db, product_id).await?.into();
    product.is_active = Set(false);
    product.updated_at = Set(Utc::now());
    product.update(db).await.map_err(Into::into)
}

async fn active_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| Error::NotFound {
            entity: "product",
            key: product_id.to_string(),
        })
}
