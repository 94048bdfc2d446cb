//! Bulk customer import from delimited text.
//!
//! The file must carry a header row with at least the columns in
//! [`REQUIRED_COLUMNS`]; column order and letter case do not matter. Spreadsheets
//! are exported to comma or tab separated text by the caller.
//!
//! Rows are imported one by one, each in its own transaction. A bad row never
//! aborts the import: it lands in [`ImportReport::invalid`], and rows whose code or
//! email already exists (in storage or earlier in the file) land in
//! [`ImportReport::skipped`].

use crate::{
    core::customer::{self, NewCustomer},
    errors::{Error, Result},
};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::{collections::HashSet, io::Read, str::FromStr};
use tracing::{debug, info, instrument, warn};

/// Columns every import file must have.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "customer_id",
    "customer_name",
    "customer_type",
    "company_name",
    "status",
    "email",
    "credit_limit",
    "city",
];

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// Line number in the file, header is line 1
    pub row: u64,
    /// Why the row was not imported
    pub reason: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Codes of the customers created, in file order
    pub imported: Vec<String>,
    /// Rows that failed parsing or validation
    pub invalid: Vec<RejectedRow>,
    /// Rows whose code or email already exists
    pub skipped: Vec<RejectedRow>,
}

struct Columns {
    code: usize,
    name: usize,
    customer_type: usize,
    company_name: usize,
    status: usize,
    email: usize,
    credit_limit: usize,
    city: usize,
    phone_number: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |column: &str| names.iter().position(|name| name == column);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| find(column).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::validation(
                "columns",
                format!("missing required columns: {}", missing.join(", ")),
            ));
        }

        let required = |column: &str| find(column).unwrap_or_default();
        Ok(Self {
            code: required("customer_id"),
            name: required("customer_name"),
            customer_type: required("customer_type"),
            company_name: required("company_name"),
            status: required("status"),
            email: required("email"),
            credit_limit: required("credit_limit"),
            city: required("city"),
            phone_number: find("phone_number"),
        })
    }

    fn customer(&self, record: &StringRecord) -> Result<NewCustomer> {
        let field = |index: usize| record.get(index).unwrap_or_default().to_string();
        let optional = |index: usize| Some(field(index)).filter(|value| !value.is_empty());

        let name = field(self.name);
        let (first_name, last_name) = name.split_once(' ').unwrap_or((name.as_str(), ""));
        let credit_limit = match field(self.credit_limit).as_str() {
            "" => Decimal::ZERO,
            raw => Decimal::from_str(raw)
                .map_err(|_| Error::validation("credit_limit", format!("'{raw}' is not a number")))?,
        };

        customer::validated(NewCustomer {
            customer_code: optional(self.code),
            first_name: first_name.to_string(),
            last_name: last_name.trim().to_string(),
            customer_type: field(self.customer_type),
            company_name: optional(self.company_name),
            status: field(self.status),
            email: field(self.email),
            phone_number: self.phone_number.and_then(optional),
            city: optional(self.city),
            credit_limit,
            available_limit: None,
        })
    }
}

/// Imports customers from delimited text with the given field delimiter
/// (`b','` or `b'\t'`).
///
/// # Errors
/// Fails as a whole only when the header lacks a required column, the input cannot
/// be read, or storage fails. Row-level problems are reported in the
/// [`ImportReport`].
#[instrument(skip(db, reader))]
pub async fn import_customers<R: Read>(
    db: &DatabaseConnection,
    reader: R,
    delimiter: u8,
) -> Result<ImportReport> {
    let mut rows = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(reader);
    let columns = Columns::locate(rows.headers()?)?;

    let mut report = ImportReport::default();
    let mut parsed = Vec::new();
    for (record, fallback_row) in rows.records().zip(2_u64..) {
        match record {
            Ok(record) => {
                let row = record.position().map_or(fallback_row, csv::Position::line);
                parsed.push((row, columns.customer(&record)));
            }
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err.into()),
            Err(err) => {
                let row = err.position().map_or(fallback_row, csv::Position::line);
                report.invalid.push(RejectedRow {
                    row,
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut seen_codes = HashSet::new();
    let mut seen_emails = HashSet::new();
    for (row, customer) in parsed {
        let customer = match customer {
            Ok(customer) => customer,
            Err(err) => {
                debug!(row, %err, "Invalid import row");
                report.invalid.push(RejectedRow {
                    row,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let repeated_code = customer.customer_code.as_ref().is_some_and(|code| seen_codes.contains(code));
        if repeated_code || seen_emails.contains(&customer.email) {
            report.skipped.push(RejectedRow {
                row,
                reason: "duplicate of an earlier row".to_string(),
            });
            continue;
        }

        // Only imported rows claim their code and email.
        let txn = db.begin().await?;
        match customer::insert_customer(&txn, customer).await {
            Ok(created) => {
                txn.commit().await?;
                seen_codes.insert(created.customer_code.clone());
                seen_emails.insert(created.email);
                report.imported.push(created.customer_code);
            }
            Err(Error::DuplicateKey { field, value }) => {
                txn.rollback().await?;
                report.skipped.push(RejectedRow {
                    row,
                    reason: format!("{field} {value} already exists"),
                });
            }
            Err(err @ Error::Validation { .. }) => {
                txn.rollback().await?;
                report.invalid.push(RejectedRow {
                    row,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    if !report.invalid.is_empty() {
        warn!(invalid = report.invalid.len(), "Import finished with invalid rows");
    }
    info!(
        imported = report.imported.len(),
        invalid = report.invalid.len(),
        skipped = report.skipped.len(),
        "Imported customers"
    );
    Ok(report)
}
