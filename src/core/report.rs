//! Document summaries and rendering.
//!
//! A [`DocumentSummary`] is the fully computed view of a quotation or sales order:
//! identifier, date, counterparty, currency, lines and totals. Renderers only ever
//! see summaries, so they never recompute money. PDF typesetting lives outside this
//! crate behind [`DocumentRenderer`]; the built-in [`TabularTextRenderer`] writes a
//! plain-text table.

use crate::{
    core::{customer, document::PricedLine, quotation, sales_order, status::DocumentKind, totals::DocumentTotals},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::fmt::Write as _;

/// Everything needed to present a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    /// Quotation or sales order
    pub kind: DocumentKind,
    /// Business identifier, e.g. `QUO001`
    pub identifier: String,
    /// Document date
    pub date: NaiveDate,
    /// Customer display name
    pub counterparty: String,
    /// Customer email, the default recipient
    pub recipient: String,
    /// Currency code
    pub currency: String,
    /// Current status
    pub status: String,
    /// Lines in position order
    pub lines: Vec<PricedLine>,
    /// Computed totals
    pub totals: DocumentTotals,
}

impl DocumentSummary {
    /// Grand total of the document.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.totals.grand_total
    }

    /// Human-readable document title, e.g. `Quotation QUO001`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} {}", kind_label(self.kind), self.identifier)
    }
}

const fn kind_label(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Quotation => "Quotation",
        DocumentKind::SalesOrder => "Sales Order",
    }
}

async fn counterparty(db: &DatabaseConnection, customer_id: i64) -> Result<(String, String)> {
    let customer = customer::get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "customer",
            key: customer_id.to_string(),
        })?;
    Ok((customer::display_name(&customer), customer.email))
}

/// Builds the summary of a quotation.
pub async fn summarize_quotation(db: &DatabaseConnection, quotation_id: i64) -> Result<DocumentSummary> {
    let detail = quotation::get_quotation(db, quotation_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "quotation",
            key: quotation_id.to_string(),
        })?;
    let (counterparty, recipient) = counterparty(db, detail.quotation.customer_id).await?;
    let lines = detail.lines()?;

    Ok(DocumentSummary {
        kind: DocumentKind::Quotation,
        identifier: detail.quotation.quotation_number,
        date: detail.quotation.quotation_date,
        counterparty,
        recipient,
        currency: detail.quotation.currency,
        status: detail.quotation.status,
        lines,
        totals: detail.totals,
    })
}

/// Builds the summary of a sales order.
pub async fn summarize_sales_order(db: &DatabaseConnection, order_id: i64) -> Result<DocumentSummary> {
    let detail = sales_order::get_sales_order(db, order_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "sales order",
            key: order_id.to_string(),
        })?;
    let (counterparty, recipient) = counterparty(db, detail.order.customer_id).await?;
    let lines = detail.lines()?;

    Ok(DocumentSummary {
        kind: DocumentKind::SalesOrder,
        identifier: detail.order.order_number,
        date: detail.order.order_date,
        counterparty,
        recipient,
        currency: detail.order.currency,
        status: detail.order.status,
        lines,
        totals: detail.totals,
    })
}

/// Rendered output of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// MIME type of `bytes`
    pub content_type: String,
    /// Suggested attachment name
    pub file_name: String,
    /// Rendered content
    pub bytes: Vec<u8>,
}

/// Turns a summary into a printable document.
pub trait DocumentRenderer: Send + Sync {
    /// Renders `summary`.
    ///
    /// # Errors
    /// Returns [`Error::Render`] when the document cannot be produced.
    fn render(&self, summary: &DocumentSummary) -> Result<RenderedDocument>;
}

/// Plain-text table renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularTextRenderer;

impl DocumentRenderer for TabularTextRenderer {
    fn render(&self, summary: &DocumentSummary) -> Result<RenderedDocument> {
        let text = render_text(summary).map_err(|e| Error::Render {
            message: e.to_string(),
        })?;
        Ok(RenderedDocument {
            content_type: "text/plain; charset=utf-8".to_string(),
            file_name: format!("{}.txt", summary.identifier),
            bytes: text.into_bytes(),
        })
    }
}

fn render_text(summary: &DocumentSummary) -> std::result::Result<String, std::fmt::Error> {
    let name_width = summary
        .lines
        .iter()
        .map(|line| line.product_name.chars().count())
        .chain(std::iter::once("Product".len()))
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    writeln!(out, "{}", summary.title())?;
    writeln!(out, "Date: {}", summary.date.format("%Y-%m-%d"))?;
    writeln!(out, "Customer: {}", summary.counterparty)?;
    writeln!(out, "Status: {}", summary.status)?;
    writeln!(out)?;
    writeln!(
        out,
        "{:>3}  {:<name_width$}  {:>8}  {:>12}  {:>7}  {:>7}  {:>12}",
        "#", "Product", "Qty", "Unit price", "Disc %", "Tax %", "Total"
    )?;
    for line in &summary.lines {
        writeln!(
            out,
            "{:>3}  {:<name_width$}  {:>8}  {:>12.2}  {:>7.2}  {:>7.2}  {:>12.2}",
            line.position,
            line.product_name,
            line.quantity,
            line.unit_price,
            line.discount_pct,
            line.tax_pct,
            line.total
        )?;
    }
    writeln!(out)?;

    let currency = &summary.currency;
    let totals = &summary.totals;
    writeln!(out, "Subtotal: {:.2} {currency}", totals.subtotal)?;
    if !totals.discount_amount.is_zero() {
        writeln!(out, "Discount: -{:.2} {currency}", totals.discount_amount)?;
    }
    if !totals.shipping.is_zero() {
        writeln!(out, "Shipping: {:.2} {currency}", totals.shipping)?;
    }
    writeln!(out, "Grand total: {:.2} {currency}", totals.grand_total)?;
    Ok(out)
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Default HTML body of a document email.
#[must_use]
pub fn default_email_html(summary: &DocumentSummary) -> String {
    format!(
        "<p>Dear {name},</p>\
         <p>Please find attached {title} dated {date}.</p>\
         <p>Total: <strong>{total:.2} {currency}</strong></p>\
         <p>Kind regards</p>",
        name = escape_html(&summary.counterparty),
        title = escape_html(&summary.title()),
        date = summary.date.format("%Y-%m-%d"),
        total = summary.total(),
        currency = escape_html(&summary.currency),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::document::LineRequest;
    use crate::test_utils::*;

    fn sample_summary() -> DocumentSummary {
        let line = |position: i32, name: &str, price: i64, quantity: u32, discount: i64, tax: i64, total: i64| PricedLine {
            position,
            product_id: i64::from(position),
            product_name: name.to_string(),
            uom: "Nos".to_string(),
            unit_price: Decimal::from(price),
            quantity,
            discount_pct: Decimal::from(discount),
            tax_pct: Decimal::from(tax),
            total: Decimal::new(total, 2),
        };
        DocumentSummary {
            kind: DocumentKind::SalesOrder,
            identifier: "SO0007".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            counterparty: "Smith & Sons".to_string(),
            recipient: "orders@smith.example".to_string(),
            currency: "USD".to_string(),
            status: "Draft".to_string(),
            lines: vec![
                line(1, "Widget", 100, 2, 10, 5, 18900),
                line(2, "Gear", 50, 1, 0, 10, 5500),
            ],
            totals: DocumentTotals {
                subtotal: Decimal::new(24400, 2),
                discount_amount: Decimal::ZERO,
                shipping: Decimal::from(20),
                grand_total: Decimal::new(26400, 2),
            },
        }
    }

    #[test]
    fn test_tabular_text_renderer() {
        let rendered = TabularTextRenderer.render(&sample_summary()).unwrap();
        let text = String::from_utf8(rendered.bytes).unwrap();

        assert_eq!(rendered.content_type, "text/plain; charset=utf-8");
        assert_eq!(rendered.file_name, "SO0007.txt");
        assert!(text.starts_with("Sales Order SO0007\n"));
        assert!(text.contains("Customer: Smith & Sons"));
        assert!(text.contains("189.00"));
        assert!(text.contains("55.00"));
        assert!(text.contains("Shipping: 20.00 USD"));
        assert!(text.contains("Grand total: 264.00 USD"));
        assert!(!text.contains("Discount:"));
    }

    #[test]
    fn test_default_email_html_escapes() {
        let html = default_email_html(&sample_summary());
        assert!(html.contains("Smith &amp; Sons"));
        assert!(html.contains("Sales Order SO0007"));
        assert!(html.contains("2025-03-10"));
        assert!(html.contains("264.00 USD"));
    }

    #[tokio::test]
    async fn test_summaries_match_stored_documents() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;

        let summary = summarize_sales_order(&db, order.order.id).await?;
        assert_eq!(summary.identifier, order.order.order_number);
        assert_eq!(summary.counterparty, customer::display_name(&customer));
        assert_eq!(summary.recipient, customer.email);
        assert_eq!(summary.total(), order.totals.grand_total);
        assert_eq!(summary.lines, order.lines()?);

        let quote = quotation::create_quotation(
            &db,
            admin,
            quotation::NewQuotation {
                customer_id: customer.id,
                customer_po_reference: None,
                quotation_type: "Standard".to_string(),
                quotation_date: None,
                expiry_date: NaiveDate::from_ymd_opt(2999, 1, 1).unwrap(),
                currency: "USD".to_string(),
                payment_terms: None,
                expected_delivery: None,
                global_discount: Decimal::from(10),
                shipping_charges: Decimal::ZERO,
                items: vec![LineRequest::new(product.id, 3)],
            },
        )
        .await?;
        let summary = summarize_quotation(&db, quote.quotation.id).await?;
        assert_eq!(summary.title(), format!("Quotation {}", quote.quotation.quotation_number));
        assert_eq!(summary.totals, quote.totals);

        let missing = summarize_quotation(&db, 999).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { entity: "quotation", .. }));

        Ok(())
    }
}
