/// Mail relay client
///
/// Out-of-band delivery for password-reset tokens. Posts JSON to the relay
/// configured in `EmailSettings`; nothing here inspects or stores tokens.

use serde::Serialize;

use crate::error::{AppError, EmailError};
use crate::validators::is_valid_email;

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
}

/// Sender address validated at construction time
#[derive(Clone)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, AppError> {
        let email = is_valid_email(&s)?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
pub struct SendEmailRequest {
    to: String,
    from: String,
    #[serde(rename = "Html")]
    html: String,
    #[serde(rename = "Subject")]
    subject: String,
}

impl EmailClient {
    pub fn new(base_url: String, sender: SenderEmail, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url,
            sender,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), AppError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            to: recipient.to_string(),
            from: self.sender.inner().to_string(),
            subject: subject.to_string(),
            html: html_content.to_string(),
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                AppError::Email(EmailError::SendFailed(e.to_string()))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email relay returned error: {}", e);
                AppError::Email(EmailError::ServiceUnavailable(e.to_string()))
            })?;

        Ok(())
    }
}
