//! Reset-token delivery over SMTP.
//!
//! Only used when `SMTP_ENABLED` is set; otherwise the reset flow logs the
//! token instead (see `AuthService::request_reset`), which is the retrieval
//! path in development and the test harness.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::instrument;

use crate::config::email::EmailConfig;
use crate::utils::errors::AppError;

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, reset_token))]
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: &str,
        reset_token: &str,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        let body = format!(
            "Hi {},\n\n\
             A password reset was requested for your account.\n\n\
             Reset token: {}\n\n\
             If you didn't request this, ignore this message.\n",
            to_name, reset_token
        );

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal(anyhow::anyhow!("invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal(anyhow::anyhow!("invalid to email: {}", e)))?)
            .subject("Password reset request")
            .body(body)
            .map_err(|e| AppError::internal(anyhow::anyhow!("failed to build email: {}", e)))?;

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
                .map_err(|e| {
                    AppError::internal(anyhow::anyhow!("failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal(anyhow::anyhow!("task join error: {}", e)))?
            .map_err(|e| AppError::internal(anyhow::anyhow!("failed to send email: {}", e)))?;

        Ok(())
    }
}
