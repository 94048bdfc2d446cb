//! Input validation helpers shared by the record modules.
//!
//! Every helper returns [`Error::Validation`] naming the offending field, which the
//! request-handler layer surfaces to the caller unchanged.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;

/// Largest unit price a `Decimal(10, 2)` column can hold.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

/// Largest amount a `Decimal(12, 2)` total column can hold. Amounts within this
/// bound survive the round trip through SQLite's `REAL` storage unchanged.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest percentage a `Decimal(5, 2)` column can hold.
pub const MAX_PERCENTAGE: Decimal = Decimal::from_parts(99_999, 0, 0, false, 2);

/// Trims `value` and rejects it when nothing is left.
pub fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// [`required_text`] limited to `max_chars` characters.
pub fn bounded_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = required_text(field, value)?;
    if trimmed.chars().count() > max_chars {
        return Err(Error::validation(field, format!("{field} exceeds {max_chars} characters")));
    }
    Ok(trimmed)
}

/// Trims an optional value, mapping blank strings to `None`.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalizes an email address (trimmed, lowercase) and checks its basic shape.
pub fn email(field: &str, value: &str) -> Result<String> {
    let normalized = required_text(field, value)?.to_lowercase();
    let valid = normalized
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !normalized.contains(char::is_whitespace)
        });
    if !valid {
        return Err(Error::validation(field, format!("'{value}' is not a valid email")));
    }
    Ok(normalized)
}

/// Rejects negative amounts.
pub fn non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::validation(field, format!("{field} cannot be negative")));
    }
    Ok(value)
}

/// Accepts unit prices between zero and [`MAX_UNIT_PRICE`].
pub fn unit_price(field: &str, value: Decimal) -> Result<Decimal> {
    non_negative(field, value)?;
    if value > MAX_UNIT_PRICE {
        return Err(Error::validation(field, format!("{field} exceeds {MAX_UNIT_PRICE}")));
    }
    Ok(value)
}

/// Accepts computed amounts between zero and [`MAX_AMOUNT`].
pub fn amount(field: &str, value: Decimal) -> Result<Decimal> {
    non_negative(field, value)?;
    if value > MAX_AMOUNT {
        return Err(Error::validation(field, format!("{field} exceeds {MAX_AMOUNT}")));
    }
    Ok(value)
}

/// Accepts percentages between 0 and 100 inclusive.
pub fn percentage(field: &str, value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(Error::validation(field, format!("{field} must be between 0 and 100")));
    }
    Ok(value)
}

/// Accepts rates between zero and [`MAX_PERCENTAGE`] (tax may exceed 100%).
pub fn rate(field: &str, value: Decimal) -> Result<Decimal> {
    non_negative(field, value)?;
    if value > MAX_PERCENTAGE {
        return Err(Error::validation(field, format!("{field} exceeds {MAX_PERCENTAGE}")));
    }
    Ok(value)
}

/// Requires `value` to be one of `allowed` (exact match).
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if allowed.contains(&trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(Error::validation(
            field,
            format!("'{value}' is not one of {}", allowed.join(", ")),
        ))
    }
}

/// Checks an ISO 4217-shaped currency code (three ASCII uppercase letters).
pub fn currency(field: &str, value: &str) -> Result<String> {
    let code = value.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(Error::validation(field, format!("'{value}' is not a currency code")))
    }
}

/// Converts a stored quantity column into the `u32` the calculators take.
pub fn quantity(field: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::validation(field, "quantity cannot be negative"))
}

/// Converts a requested quantity into the `i32` column type.
pub fn stored_quantity(field: &str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::validation(field, "quantity is too large"))
}
