//! Outbound email
//!
//! Two transports:
//! - `LogMailer` writes the message to the log (development default)
//! - `HttpMailer` posts the message as JSON to an HTTP mail API, retrying
//!   transient failures with exponential backoff

use crate::config::{EmailConfig, EmailProvider};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A file attached to an outgoing message
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Trait for email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;

    /// Transport name, for logs
    fn transport(&self) -> &'static str;
}

/// Build the configured transport
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider {
        EmailProvider::Log => Ok(Arc::new(LogMailer::new(config.from_address.clone()))),
        EmailProvider::Http => Ok(Arc::new(HttpMailer::new(config)?)),
    }
}

/// Logs messages instead of delivering them
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let attachments: Vec<String> = email
            .attachments
            .iter()
            .map(|a| format!("{} ({} bytes)", a.filename, a.data.len()))
            .collect();

        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            attachments = ?attachments,
            "Email (log transport)"
        );
        crate::metrics::record_email(self.transport(), true);

        Ok(())
    }

    fn transport(&self) -> &'static str {
        "log"
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    attachments: Vec<SendAttachment<'a>>,
}

#[derive(Serialize)]
struct SendAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    /// Base64 (standard alphabet)
    content: String,
}

/// JSON-over-HTTP mail API client
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
    max_retries: u32,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let base = config.api_base.as_deref().ok_or_else(|| AppError::Configuration {
            message: "email.api_base is required for the http email provider".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/send", base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            from: config.from_address.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn post(&self, payload: &SendRequest<'_>) -> std::result::Result<(), Delivery> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let message = format!("Request failed: {}", e);
            if e.is_timeout() || e.is_connect() {
                Delivery::Transient(message)
            } else {
                Delivery::Permanent(message)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("API error {}: {}", status, body);
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(Delivery::Transient(message))
        } else {
            Err(Delivery::Permanent(message))
        }
    }
}

/// Failure classification for a single delivery attempt
enum Delivery {
    Transient(String),
    Permanent(String),
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let payload = SendRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
            attachments: email
                .attachments
                .iter()
                .map(|a| SendAttachment {
                    filename: &a.filename,
                    content_type: &a.content_type,
                    content: BASE64.encode(&a.data),
                })
                .collect(),
        };

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..ExponentialBackoff::default()
        };

        let mut attempt = 0u32;
        let max_retries = self.max_retries;
        let payload = &payload;

        let result = retry(policy, || {
            attempt += 1;
            let current = attempt;
            async move {
                match self.post(payload).await {
                    Ok(()) => Ok(()),
                    Err(Delivery::Transient(message)) if current <= max_retries => {
                        warn!(
                            attempt = current,
                            max_retries = max_retries,
                            error = %message,
                            "Email delivery failed, retrying"
                        );
                        Err(backoff::Error::transient(message))
                    }
                    Err(Delivery::Transient(message)) | Err(Delivery::Permanent(message)) => {
                        Err(backoff::Error::permanent(message))
                    }
                }
            }
        })
        .await;

        crate::metrics::record_email(self.transport(), result.is_ok());

        match result {
            Ok(()) => {
                info!(to = %email.to, subject = %email.subject, "Email sent");
                Ok(())
            }
            Err(message) => Err(AppError::Email { message }),
        }
    }

    fn transport(&self) -> &'static str {
        "http"
    }
}
