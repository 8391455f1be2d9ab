use crate::core::{CredentialProvider, Mailer};
use crate::utils::error::{Result, WatchError};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Sends plain-text mail through the Gmail `users.messages.send` endpoint.
pub struct GmailMailer<P: CredentialProvider> {
    client: Client,
    api_base: String,
    credentials: P,
}

impl<P: CredentialProvider> GmailMailer<P> {
    pub fn new(client: Client, credentials: P) -> Self {
        Self::with_api_base(client, credentials, GMAIL_API_BASE.to_string())
    }

    pub fn with_api_base(client: Client, credentials: P, api_base: String) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

/// RFC 822 message with a base64 body, so non-ASCII dish names survive.
pub fn build_mime(to: &str, subject: &str, body: &str) -> String {
    format!(
        "To: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\nContent-Transfer-Encoding: base64\r\n\r\n{}\r\n",
        to,
        subject,
        STANDARD.encode(body.as_bytes())
    )
}

#[async_trait]
impl<P: CredentialProvider> Mailer for GmailMailer<P> {
    #[instrument(name = "gmail_send", skip(self, body))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let access_token = self.credentials.access_token().await?;
        let raw = URL_SAFE.encode(build_mime(to, subject, body).as_bytes());

        let url = format!("{}/gmail/v1/users/me/messages/send", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WatchError::MailError {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SentMessage = response.json().await?;
        Ok(sent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mime_headers_and_body() {
        let mime = build_mime("jan@example.com", "Pierogarnia 1588", "Pierogi z mięsem: Available\n");

        assert!(mime.starts_with("To: jan@example.com\r\nSubject: Pierogarnia 1588\r\n"));
        assert!(mime.contains("charset=\"utf-8\""));

        let encoded_body = mime.split("\r\n\r\n").nth(1).unwrap().trim_end();
        let decoded = STANDARD.decode(encoded_body).unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "Pierogi z mięsem: Available\n"
        );
    }
}
