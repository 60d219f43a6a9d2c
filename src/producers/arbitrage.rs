//! Arbitrage Scanner (component D): cross-venue probability comparison.
//!
//! The external venue is treated as a fair-price oracle — a modeling
//! choice, not a correctness claim. Title matching via token intersection
//! is a deliberately weak heuristic; production deployments would replace
//! it with curated cross-venue ID mappings.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Side, Signal, SignalSource};
use crate::gateway::ExchangeGateway;
use crate::kelly::kelly_fraction;

const EXTERNAL_TIMEOUT_SECS: u64 = 10;
const MIN_SHARED_TOKENS: usize = 3;
const MIN_TOKEN_LEN: usize = 3;

/// Lowercases, strips trailing punctuation, and drops short words.
fn tokenize(title: &str) -> HashSet<String> {
    title
        .split_whitespace()
        .map(|w| w.trim_end_matches(|c: char| c.is_ascii_punctuation()).to_lowercase())
        .filter(|w| w.len() > MIN_TOKEN_LEN)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
struct ExternalMarket {
    #[serde(default)]
    question: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    #[serde(rename = "outcomePrices")]
    outcome_prices: Option<Vec<String>>,
    #[serde(default)]
    yes_price: Option<f64>,
    #[serde(default)]
    #[serde(rename = "lastTradePrice")]
    last_trade_price: Option<f64>,
}

impl ExternalMarket {
    fn display_title(&self) -> &str {
        if !self.question.is_empty() {
            &self.question
        } else {
            &self.title
        }
    }

    /// Field name varies across external venues; try in order.
    fn probability(&self) -> Option<f64> {
        self.outcome_prices
            .as_ref()
            .and_then(|prices| prices.first())
            .and_then(|s| s.parse::<f64>().ok())
            .or(self.yes_price)
            .or(self.last_trade_price)
    }
}

pub struct ArbitrageScanner {
    http: Client,
    external_base_url: String,
}

impl ArbitrageScanner {
    pub fn new(external_base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(EXTERNAL_TIMEOUT_SECS))
                .build()
                .expect("building external venue http client"),
            external_base_url: external_base_url.into(),
        }
    }

    async fn fetch_external_markets(&self) -> Vec<ExternalMarket> {
        let url = format!("{}/markets", self.external_base_url);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.json::<Vec<ExternalMarket>>().await.unwrap_or_else(|e| {
                warn!(error = %e, "failed to decode external venue markets");
                Vec::new()
            }),
            Err(e) => {
                warn!(error = %e, "failed to fetch external venue markets");
                Vec::new()
            }
        }
    }

    /// Exchange markets paired with their first external-venue title match.
    /// First match wins; no many-to-many pairing.
    fn match_pairs<'a>(
        exchange_markets: &'a [crate::gateway::Market],
        external_markets: &'a [ExternalMarket],
    ) -> Vec<(&'a crate::gateway::Market, &'a ExternalMarket)> {
        let mut pairs = Vec::new();
        for exch in exchange_markets {
            let exch_tokens = tokenize(&exch.title);
            if exch_tokens.is_empty() {
                continue;
            }
            if let Some(ext) = external_markets.iter().find(|ext| {
                let ext_tokens = tokenize(ext.display_title());
                exch_tokens.intersection(&ext_tokens).count() >= MIN_SHARED_TOKENS
            }) {
                pairs.push((exch, ext));
            }
        }
        pairs
    }

    pub async fn run(&self, gateway: &ExchangeGateway, cfg: &Config) -> Vec<Signal> {
        let exchange_markets = match gateway.get_markets(Some("open"), 200, None).await {
            Ok(page) => page.markets,
            Err(e) => {
                warn!(error = %e, "failed to fetch exchange markets for arbitrage scan");
                return Vec::new();
            }
        };
        let external_markets = self.fetch_external_markets().await;
        if external_markets.is_empty() {
            return Vec::new();
        }

        let pairs = Self::match_pairs(&exchange_markets, &external_markets);
        debug!(pairs = pairs.len(), "arbitrage scanner matched pairs");

        let mut signals = Vec::new();
        for (exch, ext) in pairs {
            let exchange_prob = match exch.yes_bid.or(exch.last_price) {
                Some(cents) => cents as f64 / 100.0,
                None => continue,
            };
            let Some(external_prob) = ext.probability() else {
                continue;
            };
            if let Some(signal) = self.signal_for_pair(&exch.ticker, exchange_prob, external_prob, cfg) {
                signals.push(signal);
            }
        }

        info!(signals = signals.len(), "arbitrage scanner produced signals");
        signals
    }

    fn signal_for_pair(&self, ticker: &str, exchange_prob: f64, external_prob: f64, cfg: &Config) -> Option<Signal> {
        let edge = external_prob - exchange_prob;
        let (side, p, market_price) = if edge > 0.0 {
            (Side::Yes, external_prob, exchange_prob)
        } else {
            (Side::No, 1.0 - external_prob, 1.0 - exchange_prob)
        };

        if !(market_price > 0.0 && market_price < 1.0) {
            return None;
        }

        let b = 1.0 / market_price - 1.0;
        let f_star = kelly_fraction(p, b);
        if f_star < cfg.kelly_edge_min {
            return None;
        }

        let rationale = format!(
            "External venue implies {:.3}, exchange implies {:.3} (f*={:.3})",
            external_prob, exchange_prob, f_star
        );

        Some(Signal::new(
            SignalSource::Arbitrage,
            ticker,
            side,
            market_price,
            p,
            f_star.min(1.0),
            rationale,
        ))
    }
}
