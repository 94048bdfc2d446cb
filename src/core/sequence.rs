//! Sequence allocation - Human-readable business identifiers per series.
//!
//! Every series keeps one row in `sequence_counters`. Allocation never reads the
//! maximum identifier of the owning table; it increments the counter with a single
//! `UPDATE sequence_counters SET last_value = last_value + 1` and reads the new value
//! back inside a transaction (a savepoint when the caller already holds one), so the
//! increment commits or rolls back together with the record that uses it.

use crate::{
    entities::{Customer, Enquiry, Product, Quotation, SalesOrder, SequenceCounter, sequence_counter},
    entities::{customer, enquiry, product, quotation, sales_order},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    QuerySelect, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info, instrument};

/// A named identifier series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    /// `CUS0001`
    Customer,
    /// `CVB0001`
    Product,
    /// `QUO001`
    Quotation,
    /// `SO0001`
    SalesOrder,
    /// `ENQ001`
    Enquiry,
}

impl Series {
    /// Every series, in bootstrap order.
    pub const ALL: [Self; 5] = [
        Self::Customer,
        Self::Product,
        Self::Quotation,
        Self::SalesOrder,
        Self::Enquiry,
    ];

    /// Prefix placed in front of the padded number. Also the counter row key.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Customer => "CUS",
            Self::Product => "CVB",
            Self::Quotation => "QUO",
            Self::SalesOrder => "SO",
            Self::Enquiry => "ENQ",
        }
    }

    /// Number of digits the numeric part is padded to.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Quotation | Self::Enquiry => 3,
            Self::Customer | Self::Product | Self::SalesOrder => 4,
        }
    }

    /// Largest value that still fits the padded width.
    #[must_use]
    pub const fn max_value(self) -> u64 {
        match self.width() {
            3 => 999,
            _ => 9_999,
        }
    }

    /// Formats `value` as `<prefix><zero-padded value>`.
    pub fn format(self, value: u64) -> Result<String> {
        if value > self.max_value() {
            return Err(Error::SeriesExhausted {
                series: self.prefix(),
                width: self.width(),
            });
        }
        Ok(format!(
            "{}{:0width$}",
            self.prefix(),
            value,
            width = self.width()
        ))
    }

    /// Returns `true` when `identifier` carries this series' prefix.
    #[must_use]
    pub fn claims(self, identifier: &str) -> bool {
        identifier.starts_with(self.prefix())
    }

    /// Parses the numeric suffix of a stored identifier of this series.
    ///
    /// Any run of digits is accepted so that legacy rows wider than the current
    /// padding still reconcile.
    pub fn parse(self, identifier: &str) -> Result<u64> {
        let corrupt = || Error::CorruptSeriesState {
            series: self.prefix(),
            detail: format!("'{identifier}' does not end in an integer"),
        };
        let suffix = identifier.strip_prefix(self.prefix()).ok_or_else(corrupt)?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(corrupt());
        }
        suffix.parse().map_err(|_| corrupt())
    }

    /// Numeric value of `identifier` when it is in exact series format
    /// (prefix followed by exactly `width` digits).
    #[must_use]
    pub fn exact_value(self, identifier: &str) -> Option<u64> {
        let suffix = identifier.strip_prefix(self.prefix())?;
        if suffix.len() != self.width() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Checks a caller-supplied identifier before it is stored.
    ///
    /// Identifiers outside the series are accepted as-is. Identifiers carrying the
    /// prefix must be in exact series format; anything else would later read as
    /// corrupt series state.
    pub fn check_supplied(self, field: &str, identifier: &str) -> Result<()> {
        if self.claims(identifier) && self.exact_value(identifier).is_none() {
            return Err(Error::validation(
                field,
                format!(
                    "'{identifier}' uses the {} prefix but is not in the form {}",
                    self.prefix(),
                    self.format(1).unwrap_or_default()
                ),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Allocates the next identifier of `series`.
///
/// Pass the transaction that inserts the record so that a rollback also returns
/// the value; called on a plain connection the allocation commits by itself.
#[instrument(skip(db))]
pub async fn next<C>(db: &C, series: Series) -> Result<String>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    ensure_counter(&txn, series).await?;

    SequenceCounter::update_many()
        .col_expr(
            sequence_counter::Column::LastValue,
            Expr::col(sequence_counter::Column::LastValue).add(1),
        )
        .col_expr(sequence_counter::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sequence_counter::Column::Series.eq(series.prefix()))
        .exec(&txn)
        .await?;

    let value = stored_value(&txn, series).await?;
    let identifier = series.format(value)?;
    txn.commit().await?;

    debug!(series = series.prefix(), identifier = %identifier, "Allocated identifier");
    Ok(identifier)
}

/// Raises the counter of `series` to the value of a caller-supplied identifier.
///
/// Identifiers that are not in exact series format are ignored. The counter never
/// moves backwards.
#[instrument(skip(db))]
pub async fn observe<C>(db: &C, series: Series, identifier: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(value) = series.exact_value(identifier) {
        raise_to(db, series, value).await?;
    }
    Ok(())
}

/// Rebuilds the counter of `series` from identifiers already stored.
///
/// Identifiers without the series prefix are skipped. Returns the counter value
/// afterwards.
pub async fn reconcile<C, I, S>(db: &C, series: Series, identifiers: I) -> Result<u64>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut highest = 0;
    for identifier in identifiers {
        let identifier = identifier.as_ref();
        if series.claims(identifier) {
            highest = highest.max(series.parse(identifier)?);
        }
    }
    raise_to(db, series, highest).await?;
    stored_value(db, series).await
}

/// Reconciles every series against its owning table. Run once at startup.
#[instrument(skip(db))]
pub async fn reconcile_all(db: &DatabaseConnection) -> Result<()> {
    for series in Series::ALL {
        let identifiers = stored_identifiers(db, series).await?;
        let value = reconcile(db, series, &identifiers).await?;
        info!(series = series.prefix(), last_value = value, "Sequence counter ready");
    }
    Ok(())
}

/// Last value issued for `series`, or 0 when nothing was issued yet.
pub async fn peek<C>(db: &C, series: Series) -> Result<u64>
where
    C: ConnectionTrait,
{
    match SequenceCounter::find_by_id(series.prefix().to_string())
        .one(db)
        .await?
    {
        Some(row) => to_value(series, row.last_value),
        None => Ok(0),
    }
}

async fn ensure_counter<C>(db: &C, series: Series) -> Result<()>
where
    C: ConnectionTrait,
{
    let row = sequence_counter::ActiveModel {
        series: Set(series.prefix().to_string()),
        last_value: Set(0),
        updated_at: Set(Utc::now()),
    };
    SequenceCounter::insert(row)
        .on_conflict(
            OnConflict::column(sequence_counter::Column::Series)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn raise_to<C>(db: &C, series: Series, value: u64) -> Result<()>
where
    C: ConnectionTrait,
{
    let value = i64::try_from(value).map_err(|_| Error::SeriesExhausted {
        series: series.prefix(),
        width: series.width(),
    })?;
    ensure_counter(db, series).await?;

    // Conditional, so a concurrent allocation that already went further wins.
    SequenceCounter::update_many()
        .col_expr(sequence_counter::Column::LastValue, Expr::value(value))
        .col_expr(sequence_counter::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sequence_counter::Column::Series.eq(series.prefix()))
        .filter(sequence_counter::Column::LastValue.lt(value))
        .exec(db)
        .await?;
    Ok(())
}

async fn stored_value<C>(db: &C, series: Series) -> Result<u64>
where
    C: ConnectionTrait,
{
    let row = SequenceCounter::find_by_id(series.prefix().to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::CorruptSeriesState {
            series: series.prefix(),
            detail: "counter row missing".to_string(),
        })?;
    to_value(series, row.last_value)
}

fn to_value(series: Series, stored: i64) -> Result<u64> {
    u64::try_from(stored).map_err(|_| Error::CorruptSeriesState {
        series: series.prefix(),
        detail: format!("negative counter value {stored}"),
    })
}

async fn stored_identifiers(db: &DatabaseConnection, series: Series) -> Result<Vec<String>> {
    let identifiers = match series {
        Series::Customer => {
            Customer::find()
                .select_only()
                .column(customer::Column::CustomerCode)
                .into_tuple::<String>()
                .all(db)
                .await?
        }
        Series::Product => {
            Product::find()
                .select_only()
                .column(product::Column::ProductCode)
                .into_tuple::<String>()
                .all(db)
                .await?
        }
        Series::Quotation => {
            Quotation::find()
                .select_only()
                .column(quotation::Column::QuotationNumber)
                .into_tuple::<String>()
                .all(db)
                .await?
        }
        Series::SalesOrder => {
            SalesOrder::find()
                .select_only()
                .column(sales_order::Column::OrderNumber)
                .into_tuple::<String>()
                .all(db)
                .await?
        }
        Series::Enquiry => {
            Enquiry::find()
                .select_only()
                .column(enquiry::Column::EnquiryNumber)
                .into_tuple::<String>()
                .all(db)
                .await?
        }
    };
    Ok(identifiers)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use std::collections::HashSet;

    #[test]
    fn test_format_pads_to_width() -> Result<()> {
        assert_eq!(Series::Customer.format(1)?, "CUS0001");
        assert_eq!(Series::Product.format(42)?, "CVB0042");
        assert_eq!(Series::Quotation.format(7)?, "QUO007");
        assert_eq!(Series::SalesOrder.format(12)?, "SO0012");
        assert_eq!(Series::Enquiry.format(999)?, "ENQ999");
        Ok(())
    }

    #[test]
    fn test_format_rejects_overflow() {
        let result = Series::Quotation.format(1000);
        assert!(matches!(
            result,
            Err(Error::SeriesExhausted { series: "QUO", width: 3 })
        ));
    }

    #[test]
    fn test_parse_suffix() -> Result<()> {
        assert_eq!(Series::Customer.parse("CUS0042")?, 42);
        assert_eq!(Series::Quotation.parse("QUO1200")?, 1200);
        assert!(matches!(
            Series::Customer.parse("CUSX01"),
            Err(Error::CorruptSeriesState { series: "CUS", .. })
        ));
        assert!(Series::Customer.parse("CUS").is_err());
        Ok(())
    }

    #[test]
    fn test_check_supplied() {
        assert!(Series::Customer.check_supplied("customer_id", "ACME-7").is_ok());
        assert!(Series::Customer.check_supplied("customer_id", "CUS0007").is_ok());
        assert!(matches!(
            Series::Customer.check_supplied("customer_id", "CUS7"),
            Err(Error::Validation { field, .. }) if field == "customer_id"
        ));
        assert!(Series::Customer.check_supplied("customer_id", "CUSTOM").is_err());
    }

    #[tokio::test]
    async fn test_next_starts_at_one_and_increments() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(next(&db, Series::Customer).await?, "CUS0001");
        assert_eq!(next(&db, Series::Customer).await?, "CUS0002");
        assert_eq!(peek(&db, Series::Customer).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_series_are_independent() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(next(&db, Series::Customer).await?, "CUS0001");
        assert_eq!(next(&db, Series::SalesOrder).await?, "SO0001");
        assert_eq!(next(&db, Series::Quotation).await?, "QUO001");
        assert_eq!(next(&db, Series::Customer).await?, "CUS0002");
        assert_eq!(peek(&db, Series::Enquiry).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct() -> Result<()> {
        let db = setup_test_db().await?;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { next(&db, Series::SalesOrder).await })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let identifier = handle.await.unwrap()?;
            assert!(seen.insert(identifier), "duplicate identifier allocated");
        }
        assert_eq!(seen.len(), 25);
        assert_eq!(peek(&db, Series::SalesOrder).await?, 25);

        Ok(())
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_is_returned() -> Result<()> {
        let db = setup_test_db().await?;

        let txn = db.begin().await?;
        assert_eq!(next(&txn, Series::Enquiry).await?, "ENQ001");
        txn.rollback().await?;

        assert_eq!(peek(&db, Series::Enquiry).await?, 0);
        assert_eq!(next(&db, Series::Enquiry).await?, "ENQ001");

        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_series_keeps_counter() -> Result<()> {
        let db = setup_test_db().await?;
        observe(&db, Series::Quotation, "QUO999").await?;

        let result = next(&db, Series::Quotation).await;
        assert!(matches!(result, Err(Error::SeriesExhausted { .. })));
        assert_eq!(peek(&db, Series::Quotation).await?, 999);

        Ok(())
    }

    #[tokio::test]
    async fn test_observe_only_moves_forward() -> Result<()> {
        let db = setup_test_db().await?;

        observe(&db, Series::Customer, "CUS0042").await?;
        observe(&db, Series::Customer, "CUS0010").await?;
        observe(&db, Series::Customer, "ACME-99").await?;

        assert_eq!(next(&db, Series::Customer).await?, "CUS0043");

        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_from_legacy_identifiers() -> Result<()> {
        let db = setup_test_db().await?;

        let value = reconcile(&db, Series::SalesOrder, ["SO0003", "SO0017", "LEGACY-1"]).await?;
        assert_eq!(value, 17);
        assert_eq!(next(&db, Series::SalesOrder).await?, "SO0018");

        let result = reconcile(&db, Series::SalesOrder, ["SO0020", "SOX"]).await;
        assert!(matches!(result, Err(Error::CorruptSeriesState { .. })));
        assert_eq!(peek(&db, Series::SalesOrder).await?, 18);

        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_all_reads_owning_tables() -> Result<()> {
        let db = setup_test_db().await?;
        create_custom_customer(&db, Some("CUS0031"), "legacy@example.com").await?;

        // Simulate a fresh counter table on an existing database
        SequenceCounter::delete_many().exec(&db).await?;
        reconcile_all(&db).await?;

        assert_eq!(peek(&db, Series::Customer).await?, 31);
        assert_eq!(next(&db, Series::Customer).await?, "CUS0032");
        assert_eq!(peek(&db, Series::Product).await?, 0);

        Ok(())
    }
}
