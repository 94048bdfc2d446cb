//! Line-item and document totals.
//!
//! All amounts are `rust_decimal::Decimal`. Line totals are computed in one order
//! for every document type:
//!
//! ```text
//! gross = unit_price × quantity
//! taxed = gross + gross × tax / 100
//! total = taxed − taxed × discount / 100
//! ```
//!
//! and rounded to two decimal places, midpoint away from zero. Document totals sum
//! the (already rounded) line totals, apply the header discount, add shipping and
//! round once more. Every computed amount is capped at [`validate::MAX_AMOUNT`].

use crate::{core::validate, errors::Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for every monetary amount.
pub const MONEY_DP: u32 = 2;

/// Rounds to [`MONEY_DP`] places, half away from zero.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Inputs of one priced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Price of one unit, ≥ 0
    pub unit_price: Decimal,
    /// Number of units
    pub quantity: u32,
    /// Discount percentage, 0 to 100
    pub discount_pct: Decimal,
    /// Tax percentage, ≥ 0
    pub tax_pct: Decimal,
}

impl LineInput {
    /// Validates the inputs and computes the line total.
    pub fn total(&self) -> Result<Decimal> {
        line_total(self.unit_price, self.quantity, self.discount_pct, self.tax_pct)
    }
}

/// Computes the total of one line.
pub fn line_total(
    unit_price: Decimal,
    quantity: u32,
    discount_pct: Decimal,
    tax_pct: Decimal,
) -> Result<Decimal> {
    validate::unit_price("unit_price", unit_price)?;
    validate::percentage("discount_pct", discount_pct)?;
    validate::rate("tax_pct", tax_pct)?;

    let gross = unit_price * Decimal::from(quantity);
    let taxed = gross + gross * tax_pct / Decimal::ONE_HUNDRED;
    let total = taxed - taxed * discount_pct / Decimal::ONE_HUNDRED;
    validate::amount("total", round_money(total))
}

/// Breakdown of a document's grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// Sum of the line totals
    pub subtotal: Decimal,
    /// Amount removed by the header discount
    pub discount_amount: Decimal,
    /// Shipping charge added after the discount
    pub shipping: Decimal,
    /// Final payable amount
    pub grand_total: Decimal,
}

/// Computes the totals of a document from its line totals and header fields.
pub fn document_totals<I>(
    line_totals: I,
    header_discount_pct: Decimal,
    shipping: Decimal,
) -> Result<DocumentTotals>
where
    I: IntoIterator<Item = Decimal>,
{
    validate::percentage("global_discount", header_discount_pct)?;
    validate::non_negative("shipping_charges", shipping)?;

    let subtotal = validate::amount("subtotal", line_totals.into_iter().sum())?;
    let discount_amount = round_money(subtotal * header_discount_pct / Decimal::ONE_HUNDRED);
    let discounted = subtotal * (Decimal::ONE - header_discount_pct / Decimal::ONE_HUNDRED);

    let grand_total = validate::amount("grand_total", round_money(discounted + shipping))?;

    Ok(DocumentTotals {
        subtotal,
        discount_amount,
        shipping,
        grand_total,
    })
}

/// Grand total only. See [`document_totals`].
pub fn document_total<I>(line_totals: I, header_discount_pct: Decimal, shipping: Decimal) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    document_totals(line_totals, header_discount_pct, shipping).map(|t| t.grand_total)
}

/// Total of one enquiry item: `selling_price × quantity`.
pub fn enquiry_item_total(selling_price: Decimal, quantity: u32) -> Result<Decimal> {
    validate::unit_price("selling_price", selling_price)?;
    validate::amount("total_amount", round_money(selling_price * Decimal::from(quantity)))
}
