//! Payment-intent API client (Stripe-compatible form API).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::PaymentConfig;
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus { Succeeded, Pending, Failed }

/// What the gateway reports about an existing intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentDetails {
    pub status: IntentStatus,
    pub amount_minor: i64,
    /// The `order_id` metadata attached when the intent was created.
    pub order_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount_minor` is in the currency's minor unit (e.g. paisa, cents).
    async fn create_intent(&self, amount_minor: i64, order_id: &str) -> Result<PaymentIntent>;
    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentDetails>;
}

#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    api_url: String,
    secret_key: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
    status: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl IntentResponse {
    fn details(mut self) -> IntentDetails {
        let status = match self.status.as_str() {
            "succeeded" => IntentStatus::Succeeded,
            "canceled" | "requires_payment_method" => IntentStatus::Failed,
            _ => IntentStatus::Pending,
        };
        IntentDetails { status, amount_minor: self.amount, order_id: self.metadata.remove("order_id") }
    }
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            currency: config.currency.clone(),
        }
    }

    async fn read(response: reqwest::Response) -> Result<IntentResponse> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EcommerceError::Gateway(format!("payment API returned {status}: {body}")));
        }
        Ok(response.json::<IntentResponse>().await?)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount_minor: i64, order_id: &str) -> Result<PaymentIntent> {
        let amount = amount_minor.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", self.currency.as_str()),
            ("payment_method_types[]", "card"),
            ("metadata[order_id]", order_id),
        ];
        let response = self.client.post(format!("{}/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key).form(&form).send().await?;
        let intent = Self::read(response).await?;
        let client_secret = intent.client_secret.ok_or_else(|| EcommerceError::Gateway("payment intent has no client secret".into()))?;
        Ok(PaymentIntent { id: intent.id, client_secret })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentDetails> {
        let response = self.client.get(format!("{}/payment_intents/{}", self.api_url, intent_id))
            .bearer_auth(&self.secret_key).send().await?;
        Ok(Self::read(response).await?.details())
    }
}
