use anyhow::anyhow;
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, instrument};

use campus_config::EmailConfig;
use campus_core::AppError;

/// SMTP delivery for notifications sent on the EMAIL channel.
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Mails a notification. Does nothing when SMTP is disabled.
    #[instrument(skip(self, body))]
    pub async fn send_notification(
        &self,
        to_email: &str,
        to_name: &str,
        title: &str,
        body: &str,
        link: Option<&str>,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            debug!("SMTP disabled, skipping e-mail delivery");
            return Ok(());
        }

        let link = link.map(|l| format!("{}{}", self.config.frontend_url, l));
        let text_body = notification_text(to_name, body, link.as_deref(), &self.config.from_name);
        let html_body = notification_html(to_name, title, body, link.as_deref(), &self.config.from_name);

        self.send_email(to_email, title, &text_body, &html_body).await
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal(anyhow!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal(anyhow!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal(anyhow!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| AppError::internal(anyhow!("Failed to create SMTP relay: {}", e)))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal(anyhow!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal(anyhow!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn notification_text(name: &str, body: &str, link: Option<&str>, signature: &str) -> String {
    let mut text = format!("Hello {},\n\n{}\n", name, body);
    if let Some(link) = link {
        text.push_str(&format!("\nOpen: {}\n", link));
    }
    text.push_str(&format!("\n{}", signature));
    text
}

fn notification_html(
    name: &str,
    title: &str,
    body: &str,
    link: Option<&str>,
    signature: &str,
) -> String {
    let button = link
        .map(|l| {
            format!(
                r#"<p style="margin: 30px 0; text-align: center;"><a href="{}" style="display: inline-block; padding: 12px 32px; background-color: #1F4E79; color: #ffffff; text-decoration: none; border-radius: 6px;">Open</a></p>"#,
                l
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="margin: 0; padding: 20px; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="600" align="center" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px;">
        <tr>
            <td style="background-color: #1F4E79; padding: 24px; text-align: center;">
                <h1 style="margin: 0; color: #ffffff; font-size: 22px;">{title}</h1>
            </td>
        </tr>
        <tr>
            <td style="padding: 32px 30px; color: #444444; font-size: 15px; line-height: 1.5;">
                <p>Hello <strong>{name}</strong>,</p>
                <p>{body}</p>
                {button}
            </td>
        </tr>
        <tr>
            <td style="background-color: #f8f9fa; padding: 16px 30px; text-align: center; color: #999999; font-size: 12px;">
                {signature}
            </td>
        </tr>
    </table>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_body_includes_link_when_present() {
        let text = notification_text("Awa", "Your grades are out.", Some("https://u.test/r"), "Campus");
        assert!(text.starts_with("Hello Awa,"));
        assert!(text.contains("Open: https://u.test/r"));
        assert!(text.ends_with("Campus"));
    }

    #[test]
    fn html_body_omits_button_without_link() {
        let html = notification_html("Awa", "Results", "Published", None, "Campus");
        assert!(html.contains("<strong>Awa</strong>"));
        assert!(!html.contains("href="));
    }

    #[tokio::test]
    async fn disabled_smtp_is_a_no_op() {
        let service = EmailService::new(EmailConfig::disabled());
        assert!(!service.is_enabled());
        service
            .send_notification("someone@u.test", "Someone", "Hi", "Body", None)
            .await
            .unwrap();
    }
}
