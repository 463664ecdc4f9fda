use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{info, warn};

use crate::configuration::types::SmtpConfig;
use crate::error_handling::types::NotifyError;

/// Sends a finished scan report to a recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_report(&self, to: &str, url: &str, pdf: &[u8]) -> Result<(), NotifyError>;
}

/// Sends via SMTP using lettre's async transport, with the PDF attached.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| NotifyError::BadAddress(format!("from address: {}", e)))?;
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::SendFailed(format!("SMTP relay error: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_report(&self, to: &str, url: &str, pdf: &[u8]) -> Result<(), NotifyError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotifyError::BadAddress(format!("to address: {}", e)))?;
        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| NotifyError::BuildFailed(e.to_string()))?;
        let body = format!(
            "The security scan of {} has finished.\n\
             The full report is attached as a PDF.\n",
            url
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Scan report for {}", url))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(
                        Attachment::new("scan-report.pdf".to_string()).body(pdf.to_vec(), pdf_type),
                    ),
            )
            .map_err(|e| NotifyError::BuildFailed(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        info!("Report for {} emailed", url);
        Ok(())
    }
}

/// Used when no SMTP relay is configured. Accepts every request so the
/// email sub-flow still completes; the skipped delivery is logged.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_report(&self, to: &str, url: &str, _pdf: &[u8]) -> Result<(), NotifyError> {
        warn!(
            "Email delivery disabled, dropping report for {} addressed to {}",
            url, to
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier_always_succeeds() {
        let notifier = NoopNotifier;
        assert!(notifier
            .send_report("user@example.com", "https://example.com", b"%PDF-")
            .await
            .is_ok());
    }

    #[test]
    fn test_smtp_notifier_rejects_bad_from_address() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from: "not an address".to_string(),
        };
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(NotifyError::BadAddress(_))
        ));
    }
}
