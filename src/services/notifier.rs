//! SMS delivery of one-time codes.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::SmsConfig;
use crate::{EcommerceError, Result};

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpSmsGateway {
    client: Client,
    api_url: String,
    api_key: String,
    sender_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    api_key: &'a str,
    #[serde(rename = "senderid", skip_serializing_if = "Option::is_none")]
    sender_id: Option<&'a str>,
    number: &'a str,
    message: &'a str,
}

impl HttpSmsGateway {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender_id: config.sender_id.clone(),
        }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        let request = SmsRequest { api_key: &self.api_key, sender_id: self.sender_id.as_deref(), number: phone, message };
        let response = self.client.post(&self.api_url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EcommerceError::Gateway(format!("SMS gateway returned {status}: {body}")));
        }
        Ok(())
    }
}

/// Development fallback when no SMS provider is configured.
pub struct LogSmsGateway;

#[async_trait]
impl SmsGateway for LogSmsGateway {
    async fn send(&self, phone: &str, _message: &str) -> Result<()> {
        tracing::info!(phone, "SMS gateway not configured, message not sent");
        Ok(())
    }
}
