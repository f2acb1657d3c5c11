//! Transactional mail client.
//!
//! Talks to an HTTP mail API (verification links, password-reset codes).
//! Auth flows that promise "check your email" surface delivery failures;
//! everything else treats mail as best-effort.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

/// Errors that can occur when sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be constructed from the configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from_email: &'a str,
    from_name: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Transactional mail API client.
#[derive(Clone)]
pub struct MailClient {
    client: reqwest::Client,
    api_url: String,
    from_email: String,
    from_name: String,
}

impl MailClient {
    /// Create a new mail client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| MailError::Config(format!("invalid API key format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }

    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), MailError> {
        let message = OutboundMessage {
            from_email: &self.from_email,
            from_name: &self.from_name,
            to,
            subject,
            text,
            html,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.api_url))
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Send the account verification link.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails; signup surfaces this to the
    /// caller because its contract is "check your email".
    pub async fn send_verification(&self, to: &str, link: &str) -> Result<(), MailError> {
        let text = format!(
            "Hello,\n\nThank you for signing up with Mercata. To complete your \
             registration, please verify your email address by visiting:\n\n{link}\n\n\
             If you didn't request this, you can safely ignore this email.\n"
        );
        let html = format!(
            "<p>Hello,</p>\
             <p>Thank you for signing up with Mercata. To complete your registration, \
             please verify your email address:</p>\
             <p><a href=\"{link}\">Verify Email</a></p>\
             <p>If you didn't request this, you can safely ignore this email.</p>"
        );

        self.send(to, "Welcome to Mercata - Verify Your Email", &text, &html)
            .await
    }

    /// Send a password-reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    pub async fn send_reset_code(&self, to: &str, code: &str) -> Result<(), MailError> {
        let text = format!(
            "Hello,\n\nYour Mercata password reset code is: {code}\n\n\
             It expires shortly. If you didn't request this, you can ignore this email.\n"
        );
        let html = format!(
            "<p>Hello,</p>\
             <p>Your Mercata password reset code is: <strong>{code}</strong></p>\
             <p>It expires shortly. If you didn't request this, you can ignore this email.</p>"
        );

        self.send(to, "Mercata - Password Reset Code", &text, &html)
            .await
    }
}
