//! Document email notification.
//!
//! [`Mailer`] is the seam to the delivery transport. Production uses
//! [`SmtpMailer`] over lettre; tests use [`RecordingMailer`], which keeps every
//! message in memory.

use crate::{
    config::mail::MailConfig,
    core::{
        report::{self, DocumentRenderer, DocumentSummary, RenderedDocument},
        validate,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Mutex;
use tracing::{info, instrument};

/// One outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
    /// Rendered document sent along
    pub attachment: Option<RenderedDocument>,
}

/// Delivers emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends `message`.
    ///
    /// # Errors
    /// Returns [`Error::Notification`] when the message cannot be built or delivered.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

fn notification_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Notification {
        message: format!("{context}: {err}"),
    }
}

/// SMTP delivery with STARTTLS.
pub struct SmtpMailer {
    from: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Builds the transport from mail settings. No connection is opened yet.
    ///
    /// # Errors
    /// Returns [`Error::Notification`] when the relay host is unusable.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.user.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| notification_error("Failed to create SMTP relay", e))?
            .port(config.port)
            .credentials(credentials)
            .build();

        info!(host = %config.host, port = config.port, "SMTP mailer configured");
        Ok(Self {
            from: config.from.clone(),
            transport,
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message> {
        let builder = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| notification_error("Invalid sender address", e))?,
            )
            .to(message
                .recipient
                .parse()
                .map_err(|e| notification_error("Invalid recipient", e))?)
            .subject(message.subject.clone());

        let html = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone());
        let built = match &message.attachment {
            Some(document) => {
                let content_type = ContentType::parse(&document.content_type)
                    .map_err(|e| notification_error("Invalid attachment type", e))?;
                let attachment = Attachment::new(document.file_name.clone())
                    .body(document.bytes.clone(), content_type);
                builder.multipart(MultiPart::mixed().singlepart(html).singlepart(attachment))
            }
            None => builder.singlepart(html),
        };
        built.map_err(|e| notification_error("Failed to build message", e))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = self.build(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| notification_error("Failed to send email", e))?;
        info!(to = %message.recipient, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Stand-in used when no relay is configured. Every send fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        Err(notification_error("Mail is not configured", &message.recipient))
    }
}

/// Keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Result<Vec<EmailMessage>> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .map_err(|e| notification_error("Mailbox lock poisoned", e))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent
            .lock()
            .map_err(|e| notification_error("Mailbox lock poisoned", e))?
            .push(message.clone());
        Ok(())
    }
}

/// Renders a document and emails it.
///
/// The recipient defaults to the customer's email on the summary.
///
/// # Errors
/// Returns [`Error::Validation`] with "Email is required" when no recipient is
/// known or when the recipient is not an email address, plus any rendering or
/// delivery error.
#[instrument(skip_all, fields(document = %summary.identifier))]
pub async fn send_document(
    mailer: &dyn Mailer,
    renderer: &dyn DocumentRenderer,
    summary: &DocumentSummary,
    recipient: Option<&str>,
) -> Result<EmailMessage> {
    let recipient = recipient
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .or_else(|| Some(summary.recipient.trim()).filter(|r| !r.is_empty()))
        .ok_or_else(|| Error::validation("email", "Email is required"))?;
    let recipient = validate::email("email", recipient)?;

    let message = EmailMessage {
        recipient,
        subject: summary.title(),
        html_body: report::default_email_html(summary),
        attachment: Some(renderer.render(summary)?),
    };
    mailer.send(&message).await?;

    info!(to = %message.recipient, "Sent document email");
    Ok(message)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::report::TabularTextRenderer;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_send_document_records_message() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;
        let summary = report::summarize_sales_order(&db, order.order.id).await?;
        let mailer = RecordingMailer::default();

        let message = send_document(&mailer, &TabularTextRenderer, &summary, None).await?;

        assert_eq!(message.recipient, customer.email);
        assert_eq!(message.subject, format!("Sales Order {}", order.order.order_number));
        let attachment = message.attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, format!("{}.txt", order.order.order_number));
        assert_eq!(mailer.sent()?, vec![message]);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_recipient_is_rejected() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;
        let mut summary = report::summarize_sales_order(&db, order.order.id).await?;
        summary.recipient = String::new();
        let mailer = RecordingMailer::default();

        let result = send_document(&mailer, &TabularTextRenderer, &summary, Some("  ")).await;

        assert!(matches!(
            result,
            Err(Error::Validation { field, message }) if field == "email" && message == "Email is required"
        ));
        assert!(mailer.sent()?.is_empty());

        let overridden = send_document(&mailer, &TabularTextRenderer, &summary, Some("buyer@example.com")).await?;
        assert_eq!(overridden.recipient, "buyer@example.com");

        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_recipient_is_rejected() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;
        let mut summary = report::summarize_sales_order(&db, order.order.id).await?;
        let mailer = RecordingMailer::default();

        for bad in ["not an address", "buyer@", "a@b.c\r\nBcc: x@y.z"] {
            let result = send_document(&mailer, &TabularTextRenderer, &summary, Some(bad)).await;
            assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "email"), "{bad}");
        }

        summary.recipient = "no-at-sign".to_string();
        let result = send_document(&mailer, &TabularTextRenderer, &summary, None).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "email"));
        assert!(mailer.sent()?.is_empty());

        let normalized = send_document(&mailer, &TabularTextRenderer, &summary, Some(" Buyer@Example.com ")).await?;
        assert_eq!(normalized.recipient, "buyer@example.com");

        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_mailer_refuses() -> Result<()> {
        let (db, admin, customer, product) = setup_with_catalog().await?;
        let order = create_test_sales_order(&db, admin, customer.id, product.id).await?;
        let summary = report::summarize_sales_order(&db, order.order.id).await?;

        let result = send_document(&DisabledMailer, &TabularTextRenderer, &summary, None).await;
        assert!(matches!(result, Err(Error::Notification { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_smtp_message_building() {
        let mailer = SmtpMailer::new(&MailConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "erp".to_string(),
            password: "secret".to_string(),
            from: "ERP <erp@example.com>".to_string(),
        })
        .unwrap();
        let mut message = EmailMessage {
            recipient: "buyer@example.com".to_string(),
            subject: "Quotation QUO001".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            attachment: None,
        };
        assert!(mailer.build(&message).is_ok());

        message.recipient = "not an address".to_string();
        assert!(matches!(mailer.build(&message), Err(Error::Notification { .. })));
    }
}
