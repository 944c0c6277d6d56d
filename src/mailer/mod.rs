//! Messaging transport.
//!
//! The dispatcher depends only on the `MailTransport`/`MailSession` pair:
//! open a session, send per recipient, close. `MailerClient` is the
//! concrete transport, speaking a bearer-token HTTP mail API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Opens one messaging session per dispatch call. Sessions are never
/// shared or pooled across calls.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn MailSession>, TransportError>;
}

/// An open messaging session. `close` consumes the session so it can only
/// be released once.
#[async_trait]
pub trait MailSession: Send {
    async fn send(
        &mut self,
        address: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;

    async fn close(self: Box<Self>) -> Result<(), TransportError>;
}

#[derive(Clone)]
pub struct MailerClient {
    http: Client,
    base_url: Url,
    token: String,
    from_address: String,
}

impl fmt::Debug for MailerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerClient")
            .field("base_url", &self.base_url)
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl MailerClient {
    pub fn new(base_url: Url, token: String, from_address: String) -> Self {
        let http = Client::builder()
            .user_agent("certmailer/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
            from_address,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.mailer.api_base)?;
        Ok(Self::new(
            base_url,
            cfg.mailer.api_token.clone(),
            cfg.mailer.from_address.clone(),
        ))
    }

    /// Credential probe used to establish a session.
    pub fn build_auth_request(&self) -> Result<reqwest::Request, TransportError> {
        let endpoint = self
            .base_url
            .join("v1/account")
            .map_err(|e| TransportError::Auth(format!("invalid mail API base URL: {e}")))?;
        self.http
            .get(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .build()
            .map_err(|e| TransportError::Auth(format!("failed to build auth request: {e}")))
    }

    pub fn build_send_request(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<reqwest::Request, TransportError> {
        let endpoint = self
            .base_url
            .join("v1/messages")
            .map_err(|e| TransportError::Delivery(format!("invalid mail API base URL: {e}")))?;
        self.http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&json!({
                "from": self.from_address,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .build()
            .map_err(|e| TransportError::Delivery(format!("failed to build send request: {e}")))
    }
}

#[async_trait]
impl MailTransport for MailerClient {
    async fn open_session(&self) -> Result<Box<dyn MailSession>, TransportError> {
        let request = self.build_auth_request()?;
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|e| TransportError::Auth(format!("failed to reach mail API: {e}")))?;

        if res.status() == StatusCode::UNAUTHORIZED || res.status() == StatusCode::FORBIDDEN {
            return Err(TransportError::Auth(format!(
                "mail API rejected credentials: {}",
                res.status()
            )));
        }
        if !res.status().is_success() {
            return Err(TransportError::Auth(format!(
                "mail API session probe failed: {}",
                res.status()
            )));
        }

        debug!("mail API session established");
        Ok(Box::new(HttpMailSession {
            client: self.clone(),
        }))
    }
}

struct HttpMailSession {
    client: MailerClient,
}

#[async_trait]
impl MailSession for HttpMailSession {
    async fn send(
        &mut self,
        address: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let request = self.client.build_send_request(address, subject, body)?;
        let res = self
            .client
            .http
            .execute(request)
            .await
            .map_err(|e| TransportError::Delivery(format!("failed to reach mail API: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(TransportError::Delivery(format!(
                "mail API error {}: {}",
                status, text
            )));
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), TransportError> {
        // Nothing to tear down for the HTTP transport; dropping the session
        // releases its handle on the client.
        debug!("mail API session closed");
        Ok(())
    }
}
