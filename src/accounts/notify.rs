//! Outbound notifications (activation mail).
//!
//! The account service only sees `NotificationSender`. `LogEmailSender` is the
//! local default; `HttpEmailSender` posts to a JSON mail API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::APP_USER_AGENT;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery abstraction. An `Err` means the message was not delivered.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Logs the message instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl NotificationSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Posts `{from, to, subject, text}` to a mail API with an optional bearer key.
#[derive(Clone, Debug)]
pub struct HttpEmailSender {
    client: Client,
    endpoint: Url,
    api_key: Option<SecretString>,
    from: String,
}

impl HttpEmailSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: Url,
        api_key: Option<SecretString>,
        from: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build mail client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl NotificationSender for HttpEmailSender {
    #[instrument(skip(self, message), fields(to_email = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let payload = SendEmail {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.context("mail API request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("mail API error: HTTP {status}: {body}"));
        }

        debug!("mail API accepted message: {status}");
        Ok(())
    }
}

/// Build the activation mail for `to` with a link carrying `token`.
///
/// # Errors
/// Returns an error if `base_url` cannot be joined with the activation path.
pub fn activation_message(base_url: &Url, to: &str, token: &str) -> Result<EmailMessage> {
    let mut link = base_url
        .join("/api/users/activate")
        .context("invalid activation base URL")?;
    link.query_pairs_mut().append_pair("token", token);

    Ok(EmailMessage {
        to: to.to_string(),
        subject: "Activation Code".to_string(),
        body: format!("Please follow this link to activate your account: {link}"),
    })
}
