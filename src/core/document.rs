//! Line items shared by quotations and sales orders.
//!
//! Callers send [`LineRequest`]s naming a product and a quantity; prices and tax
//! default to the product's catalog values. [`price_lines`] resolves the products
//! and computes each line total, so stored totals are never taken from the caller.

use crate::{
    core::{product, totals, validate},
    entities::{quotation_item, sales_order_item},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};

/// One requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// Catalog product
    pub product_id: i64,
    /// Number of units
    pub quantity: u32,
    /// Overrides the catalog price
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    /// Line discount percentage
    #[serde(default)]
    pub discount_pct: Decimal,
    /// Overrides the catalog tax rate
    #[serde(default)]
    pub tax_pct: Option<Decimal>,
}

impl LineRequest {
    /// A line at catalog price and tax, without discount.
    #[must_use]
    pub const fn new(product_id: i64, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
            discount_pct: Decimal::ZERO,
            tax_pct: None,
        }
    }
}

/// A line with its product resolved and its total computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// 1-based position within the document
    pub position: i32,
    /// Catalog product
    pub product_id: i64,
    /// Product name at pricing time
    pub product_name: String,
    /// Unit of measure at pricing time
    pub uom: String,
    /// Price of one unit
    pub unit_price: Decimal,
    /// Number of units
    pub quantity: u32,
    /// Line discount percentage
    pub discount_pct: Decimal,
    /// Line tax percentage
    pub tax_pct: Decimal,
    /// Derived line total
    pub total: Decimal,
}

/// Resolves products and prices every requested line.
///
/// # Errors
/// Returns [`Error::NotFound`] for unknown or retired products and
/// [`Error::Validation`] for out-of-range amounts.
pub async fn price_lines<C>(db: &C, requests: &[LineRequest]) -> Result<Vec<PricedLine>>
where
    C: ConnectionTrait,
{
    let mut lines = Vec::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let product = product::get_product_by_id(db, request.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| Error::NotFound {
                entity: "product",
                key: request.product_id.to_string(),
            })?;

        let unit_price = request.unit_price.unwrap_or(product.unit_price);
        let tax_pct = request.tax_pct.unwrap_or(product.tax_pct);
        let total = totals::line_total(unit_price, request.quantity, request.discount_pct, tax_pct)?;
        validate::stored_quantity("quantity", request.quantity)?;

        lines.push(PricedLine {
            position: i32::try_from(index + 1)
                .map_err(|_| Error::validation("items", "too many line items"))?,
            product_id: product.id,
            product_name: product.name,
            uom: product.uom,
            unit_price,
            quantity: request.quantity,
            discount_pct: request.discount_pct,
            tax_pct,
            total,
        });
    }
    Ok(lines)
}

/// Validates the header discount and shipping charge of a document.
pub fn check_header(global_discount: Decimal, shipping_charges: Decimal) -> Result<()> {
    validate::percentage("global_discount", global_discount)?;
    validate::non_negative("shipping_charges", shipping_charges)?;
    Ok(())
}

/// Totals of a document from its lines and header fields.
pub fn totals_of(
    lines: &[PricedLine],
    global_discount: Decimal,
    shipping_charges: Decimal,
) -> Result<totals::DocumentTotals> {
    totals::document_totals(lines.iter().map(|l| l.total), global_discount, shipping_charges)
}

/// JSON snapshot of the lines, as stored with quotation revisions.
pub fn snapshot(lines: &[PricedLine]) -> Result<serde_json::Value> {
    serde_json::to_value(lines).map_err(Into::into)
}

// SQLite hands `Decimal` columns back through `f64`; amounts are re-rounded to
// cents on the way out.
impl TryFrom<&quotation_item::Model> for PricedLine {
    type Error = Error;

    fn try_from(item: &quotation_item::Model) -> Result<Self> {
        Ok(Self {
            position: item.position,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            uom: item.uom.clone(),
            unit_price: totals::round_money(item.unit_price),
            quantity: validate::quantity("quantity", item.quantity)?,
            discount_pct: totals::round_money(item.discount_pct),
            tax_pct: totals::round_money(item.tax_pct),
            total: totals::round_money(item.total),
        })
    }
}

impl TryFrom<&sales_order_item::Model> for PricedLine {
    type Error = Error;

    fn try_from(item: &sales_order_item::Model) -> Result<Self> {
        Ok(Self {
            position: item.position,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            uom: item.uom.clone(),
            unit_price: totals::round_money(item.unit_price),
            quantity: validate::quantity("quantity", item.quantity)?,
            discount_pct: totals::round_money(item.discount_pct),
            tax_pct: totals::round_money(item.tax_pct),
            total: totals::round_money(item.total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_price_lines_uses_catalog_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_custom_product(&db, "Bolt", Decimal::from(100), Decimal::from(5)).await?;

        let mut discounted = LineRequest::new(product.id, 2);
        discounted.discount_pct = Decimal::from(10);
        let mut overridden = LineRequest::new(product.id, 1);
        overridden.unit_price = Some(Decimal::from(50));
        overridden.tax_pct = Some(Decimal::from(10));

        let lines = price_lines(&db, &[discounted, overridden]).await?;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].position, 1);
        assert_eq!(lines[0].product_name, "Bolt");
        assert_eq!(lines[0].total, Decimal::new(18900, 2));
        assert_eq!(lines[1].position, 2);
        assert_eq!(lines[1].total, Decimal::new(5500, 2));

        let totals = totals_of(&lines, Decimal::ZERO, Decimal::from(20))?;
        assert_eq!(totals.grand_total, Decimal::new(26400, 2));

        Ok(())
    }

    #[tokio::test]
    async fn test_price_lines_rejects_unknown_product() -> Result<()> {
        let db = setup_test_db().await?;

        let result = price_lines(&db, &[LineRequest::new(404, 1)]).await;
        assert!(matches!(
            result,
            Err(Error::NotFound { entity: "product", key }) if key == "404"
        ));

        Ok(())
    }

    #[test]
    fn test_check_header() {
        assert!(check_header(Decimal::from(15), Decimal::from(10)).is_ok());
        assert!(check_header(Decimal::from(150), Decimal::ZERO).is_err());
        assert!(check_header(Decimal::ZERO, Decimal::NEGATIVE_ONE).is_err());
    }
}
