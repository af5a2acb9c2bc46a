//! Configuration loading from environment.

use std::env;

use anyhow::Context;
use booking_types::Currency;
use chrono::FixedOffset;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Payment provider API key; checkout answers 503 without it
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    /// Webhook signing secret; events are accepted unverified without it
    pub stripe_webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
    pub slack_webhook_url: Option<String>,
    pub public_base_url: String,
    pub currency: Currency,
    pub booking_offset: FixedOffset,
    pub seed_services: bool,
    pub rate_limit_per_minute: u32,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "3000").parse().context("PORT must be a port number")?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let webhook_tolerance_secs = or("STRIPE_WEBHOOK_TOLERANCE_SECS", "300")
            .parse()
            .context("STRIPE_WEBHOOK_TOLERANCE_SECS must be an integer")?;

        let currency = or("CHECKOUT_CURRENCY", "jpy")
            .parse()
            .context("CHECKOUT_CURRENCY is not a supported currency")?;

        let booking_offset = or("BOOKING_UTC_OFFSET", "+00:00")
            .parse::<FixedOffset>()
            .map_err(|e| anyhow::anyhow!("BOOKING_UTC_OFFSET must look like +09:00: {}", e))?;

        let seed_services = matches!(
            or("SEED_SERVICES", "false").to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        let rate_limit_per_minute = or("RATE_LIMIT_PER_MINUTE", "100")
            .parse()
            .context("RATE_LIMIT_PER_MINUTE must be a positive integer")?;

        Ok(Self {
            port,
            database_url,
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_api_base: or("STRIPE_API_BASE", "https://api.stripe.com"),
            stripe_webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
            webhook_tolerance_secs,
            slack_webhook_url: var("SLACK_WEBHOOK_URL"),
            public_base_url: or("PUBLIC_BASE_URL", "http://localhost:3000"),
            currency,
            booking_offset,
            seed_services,
            rate_limit_per_minute,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.stripe_api_base, "https://api.stripe.com");
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert_eq!(config.public_base_url, "http://localhost:3000");
        assert_eq!(config.currency, Currency::JPY);
        assert_eq!(config.booking_offset.local_minus_utc(), 0);
        assert_eq!(config.rate_limit_per_minute, 100);
        assert!(!config.seed_services);
        assert!(config.stripe_secret_key.is_none());
        assert!(config.stripe_webhook_secret.is_none());
    }

    #[test]
    fn test_database_url_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/salon"),
            ("PORT", "8080"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_1"),
            ("SLACK_WEBHOOK_URL", ""),
            ("BOOKING_UTC_OFFSET", "+09:00"),
            ("CHECKOUT_CURRENCY", "USD"),
            ("SEED_SERVICES", "true"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.stripe_webhook_secret.as_deref(), Some("whsec_1"));
        assert!(config.slack_webhook_url.is_none());
        assert_eq!(config.booking_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(config.currency, Currency::USD);
        assert!(config.seed_services);
    }

    #[test]
    fn test_bad_offset_is_an_error() {
        assert!(load(&[("DATABASE_URL", "sqlite::memory:"), ("BOOKING_UTC_OFFSET", "JST")]).is_err());
    }
}
