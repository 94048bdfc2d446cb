//! Outbound mail settings loaded from environment variables.
//!
//! Mail is optional: without `SMTP_HOST` no transport is configured and document
//! emails are refused with a notification error.

use crate::errors::{Error, Result};

const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP relay settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// Relay host name
    pub host: String,
    /// Relay port (STARTTLS)
    pub port: u16,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// Sender mailbox, e.g. `"ERP <erp@example.com>"`
    pub from: String,
}

/// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASSWORD` and `SMTP_FROM`.
///
/// # Returns
///
/// `Ok(None)` when `SMTP_HOST` is not set.
///
/// # Errors
/// Returns [`Error::Config`] when `SMTP_PORT` is not a valid port number.
pub fn load_mail_config() -> Result<Option<MailConfig>> {
    let Ok(host) = std::env::var("SMTP_HOST") else {
        return Ok(None);
    };

    let port = match std::env::var("SMTP_PORT") {
        Ok(raw) => raw.parse::<u16>().map_err(|e| Error::Config {
            message: format!("Invalid SMTP_PORT '{raw}': {e}"),
        })?,
        Err(_) => DEFAULT_SMTP_PORT,
    };

    let user = std::env::var("SMTP_USER").unwrap_or_default();
    let password = std::env::var("SMTP_PASSWORD").unwrap_or_default();
    let from = std::env::var("SMTP_FROM").unwrap_or_else(|_| format!("ERP <{user}>"));

    Ok(Some(MailConfig {
        host,
        port,
        user,
        password,
        from,
    }))
}
