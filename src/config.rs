use std::env;

use rust_decimal::Decimal;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub match_queue_size: usize,
    pub event_buffer_size: usize,
    /// Bearer token of the bootstrapped admin account.
    pub admin_token: String,
    pub min_withdrawal: Decimal,
    /// When set, the mock gateway reports intents as succeeded on retrieval,
    /// standing in for client-side payment confirmation.
    pub gateway_auto_confirm: bool,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            match_queue_size: parse_or_default("MATCH_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "admin-dev-token".to_string()),
            min_withdrawal: parse_or_default("MIN_WITHDRAWAL", Decimal::from(10))?,
            gateway_auto_confirm: parse_or_default("GATEWAY_AUTO_CONFIRM", true)?,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "EUR".to_string()),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
