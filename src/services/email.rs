use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),
    #[error("invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
}

/// SMTP transport for the password-reset mail.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    pub async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject("Reset your password")
            .header(ContentType::TEXT_PLAIN)
            .body(password_reset_body(reset_link))?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

fn password_reset_body(reset_link: &str) -> String {
    format!(
        "We received a request to reset your password.\n\n\
         Open the link below within the next hour to choose a new one:\n\n\
         {reset_link}\n\n\
         If you didn't ask for this, you can ignore this email.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_body_carries_the_link() {
        let link = "https://pets.example/reset-password?token=abc123";
        let body = password_reset_body(link);
        assert!(body.contains(link));
        assert!(body.contains("within the next hour"));
    }
}
