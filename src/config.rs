use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub access_token_secret: String,
    pub token_ttl_secs: i64,
    pub cors_origins: Vec<String>,
    pub nats_url: Option<String>,
    pub sms: Option<SmsConfig>,
    pub payment: Option<PaymentConfig>,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: String,
    pub secret_key: String,
    pub currency: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let sms = match (env::var("SMS_API_URL"), env::var("SMS_API_KEY")) {
            (Ok(api_url), Ok(api_key)) => Some(SmsConfig { api_url, api_key, sender_id: env::var("SMS_SENDER_ID").ok() }),
            _ => None,
        };

        let payment = env::var("PAYMENT_SECRET_KEY").ok().map(|secret_key| PaymentConfig {
            api_url: env::var("PAYMENT_API_URL").unwrap_or_else(|_| "https://api.stripe.com/v1".to_string()),
            secret_key,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "bdt".to_string()),
        });

        Ok(Config {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DB_MAX_CONNECTIONS")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Invalid PORT")?,
            access_token_secret: env::var("ACCESS_TOKEN_SECRET").context("ACCESS_TOKEN_SECRET not set")?,
            token_ttl_secs: env::var("TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .context("Invalid TOKEN_TTL_SECS")?,
            cors_origins,
            nats_url: env::var("NATS_URL").ok(),
            sms,
            payment,
        })
    }
}
