//! Global configuration, captured once at startup into an immutable
//! record. No component reads `std::env` after [`Config::from_env`] runs.

use std::env;
use std::path::PathBuf;

use crate::error::GatewayError;

/// Immutable, process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub exchange_base_url: String,
    pub exchange_access_key_id: String,
    pub exchange_private_key_b64: Option<String>,
    pub exchange_private_key_path: Option<PathBuf>,
    pub llm_api_key: String,
    pub llm_model: String,
    pub external_venue_base_url: String,
    pub paper_trading: bool,
    pub fee_rate: f64,
    pub spread_threshold_cents: i64,
    pub kelly_edge_min: f64,
    pub nlp_prob_shift_min: f64,
    pub max_position_usd: f64,
    pub kelly_fraction: f64,
    pub log_dir: PathBuf,
    pub cycle_interval_secs: u64,
    pub orderbook_scan_limit: usize,
    pub orderbook_concurrency: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl Config {
    /// Builds configuration from the process environment. Does not require
    /// exchange credentials to be present — paper mode only needs them for
    /// the (unauthenticated, public) market-read endpoints, and the
    /// orchestrator decides at startup whether a missing access key is
    /// fatal.
    pub fn from_env() -> Result<Self, GatewayError> {
        let log_dir: PathBuf = env::var("LOG_DIR").unwrap_or_else(|_| "./logs".into()).into();

        Ok(Self {
            exchange_base_url: env::var("EXCHANGE_BASE_URL")
                .unwrap_or_else(|_| "https://api.elections.kalshi.com/trade-api/v2".into()),
            exchange_access_key_id: env::var("EXCHANGE_ACCESS_KEY_ID").unwrap_or_default(),
            exchange_private_key_b64: env::var("EXCHANGE_PRIVATE_KEY_B64").ok(),
            exchange_private_key_path: env::var("EXCHANGE_PRIVATE_KEY_PATH").ok().map(Into::into),
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            external_venue_base_url: env::var("EXTERNAL_VENUE_BASE_URL")
                .unwrap_or_else(|_| "https://clob.polymarket.com".into()),
            paper_trading: env_bool("PAPER_TRADING", true),
            fee_rate: env_or("EXCHANGE_FEE_RATE", 0.07),
            spread_threshold_cents: env_or("SPREAD_THRESHOLD_CENTS", 3),
            kelly_edge_min: env_or("KELLY_EDGE_MIN", 0.05),
            nlp_prob_shift_min: env_or("NLP_PROB_SHIFT_MIN", 0.10),
            max_position_usd: env_or("MAX_POSITION_USD", 500.0),
            kelly_fraction: env_or("KELLY_FRACTION", 0.25),
            log_dir,
            cycle_interval_secs: env_or("CYCLE_INTERVAL_SECS", 60),
            orderbook_scan_limit: env_or("ORDERBOOK_SCAN_LIMIT", 200),
            orderbook_concurrency: env_or("ORDERBOOK_CONCURRENCY", 32),
        })
    }

    /// Simulated bankroll used in paper mode: `max_position_usd * 10`.
    pub fn paper_bankroll_usd(&self) -> f64 {
        self.max_position_usd * 10.0
    }

    pub fn trade_journal_path(&self) -> PathBuf {
        self.log_dir.join("paper_trades.jsonl")
    }

    pub fn suite_log_path(&self) -> PathBuf {
        self.log_dir.join("suite.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_bankroll_is_ten_times_max_position() {
        let cfg = Config {
            exchange_base_url: String::new(),
            exchange_access_key_id: String::new(),
            exchange_private_key_b64: None,
            exchange_private_key_path: None,
            llm_api_key: String::new(),
            llm_model: String::new(),
            external_venue_base_url: String::new(),
            paper_trading: true,
            fee_rate: 0.07,
            spread_threshold_cents: 3,
            kelly_edge_min: 0.05,
            nlp_prob_shift_min: 0.10,
            max_position_usd: 500.0,
            kelly_fraction: 0.25,
            log_dir: "./logs".into(),
            cycle_interval_secs: 60,
            orderbook_scan_limit: 200,
            orderbook_concurrency: 32,
        };
        assert_eq!(cfg.paper_bankroll_usd(), 5000.0);
        assert_eq!(cfg.trade_journal_path(), PathBuf::from("./logs/paper_trades.jsonl"));
    }
}
