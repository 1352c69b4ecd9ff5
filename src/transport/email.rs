use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailSettings;
use crate::transport::{DeliveryError, EmailTransport};

/// SMTP mailer. Without an SMTP host it only logs what it would send.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &EmailSettings) -> Result<Self, DeliveryError> {
        let from: Mailbox = settings
            .from_address
            .parse()
            .map_err(|e| DeliveryError::Email(format!("invalid sender address: {e}")))?;

        let transport = match &settings.smtp_host {
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| DeliveryError::Email(e.to_string()))?
                    .port(settings.smtp_port);

                if let (Some(user), Some(pass)) = (&settings.smtp_user, &settings.smtp_password) {
                    builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
                }

                tracing::info!(smtp_host = %host, smtp_port = settings.smtp_port, "smtp mailer configured");
                Some(builder.build())
            }
            None => {
                tracing::warn!("SMTP_HOST not set, emails will be logged and skipped");
                None
            }
        };

        Ok(Self { transport, from })
    }
}

impl EmailTransport for SmtpMailer {
    #[tracing::instrument(skip(self, html), fields(%to, %subject))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        let Some(transport) = &self.transport else {
            tracing::info!("smtp not configured, skipping email");
            return Ok(());
        };

        let recipient: Mailbox = to
            .parse()
            .map_err(|e| DeliveryError::Email(format!("invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| DeliveryError::Email(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Email(e.to_string()))?;

        tracing::debug!("email sent");
        Ok(())
    }
}

/// Wraps a notification title and body into a minimal HTML document.
pub fn render_html(title: &str, body: &str) -> String {
    format!(
        "<html><body><h2>{}</h2><p>{}</p></body></html>",
        escape_html(title),
        escape_html(body).replace('\n', "<br>")
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
