//! News Analyzer (component C): feed fetch -> LLM classification -> ticker
//! resolution.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Side, Signal, SignalSource};
use crate::gateway::ExchangeGateway;
use crate::llm::{LlmClient, NEWS_SYSTEM_PROMPT};

const FEED_TIMEOUT_SECS: u64 = 15;
const FEED_TEXT_LIMIT: usize = 6_000;
const HEADLINE_LIMIT: usize = 500;

/// Default primary-source feeds: a weather-alerts feed, an economic-data
/// feed, and a central-bank press feed.
pub fn default_feeds() -> Vec<(&'static str, &'static str)> {
    vec![
        ("NOAA_ALERTS", "https://api.weather.gov/alerts/active?status=actual&limit=5"),
        ("BLS_CPI", "https://api.bls.gov/publicAPI/v2/timeseries/data/CUUR0000SA0?latest=true"),
        ("FED_RSS", "https://www.federalreserve.gov/feeds/press_all.xml"),
    ]
}

#[derive(Debug, Deserialize)]
struct RawNlpItem {
    ticker_keyword: String,
    side: String,
    prob_shift: f64,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

/// A single non-JSON-passthrough LLM output item, already type-checked.
struct NlpSignalRaw {
    ticker_keyword: String,
    prob_shift: f64,
    confidence: f64,
    rationale: String,
}

pub struct NewsAnalyzer {
    http: Client,
    llm: Arc<dyn LlmClient>,
    feeds: Vec<(String, String)>,
}

impl NewsAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_feeds(llm, default_feeds().into_iter().map(|(n, u)| (n.to_string(), u.to_string())).collect())
    }

    pub fn with_feeds(llm: Arc<dyn LlmClient>, feeds: Vec<(String, String)>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
                .build()
                .expect("building feed http client"),
            llm,
            feeds,
        }
    }

    async fn fetch_feed(&self, name: &str, url: &str) -> String {
        match self.http.get(url).send().await {
            Ok(resp) => match resp.text().await {
                Ok(text) => text.chars().take(FEED_TEXT_LIMIT).collect(),
                Err(e) => {
                    warn!(name, error = %e, "failed reading feed body");
                    String::new()
                }
            },
            Err(e) => {
                warn!(name, url, error = %e, "failed fetching feed");
                String::new()
            }
        }
    }

    async fn fetch_all_feeds(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (name, url) in &self.feeds {
            let text = self.fetch_feed(name, url).await;
            if !text.is_empty() {
                out.push((name.clone(), text));
            }
        }
        out
    }

    async fn analyze_headline(&self, headline: &str) -> Vec<NlpSignalRaw> {
        let raw_text = match self.llm.analyze(NEWS_SYSTEM_PROMPT, headline).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "llm call failed");
                return Vec::new();
            }
        };

        let parsed: serde_json::Value = match serde_json::from_str(&raw_text) {
            Ok(v) => v,
            Err(_) => {
                let preview: String = raw_text.chars().take(200).collect();
                warn!(response = %preview, "llm returned non-JSON");
                return Vec::new();
            }
        };

        let items: Vec<serde_json::Value> = match parsed {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawNlpItem>(item.clone()) {
                Ok(raw) => Some(NlpSignalRaw {
                    ticker_keyword: raw.ticker_keyword,
                    prob_shift: raw.prob_shift,
                    confidence: raw.confidence,
                    rationale: raw.rationale,
                }),
                Err(e) => {
                    debug!(item = %item, error = %e, "skipping malformed llm item");
                    None
                }
            })
            .collect()
    }

    async fn resolve_tickers(&self, keyword: &str, gateway: &ExchangeGateway) -> Vec<String> {
        let keyword_lower = keyword.to_lowercase();
        match gateway.get_markets(Some("open"), 50, None).await {
            Ok(page) => page
                .markets
                .into_iter()
                .filter(|m| {
                    m.ticker.to_lowercase().contains(&keyword_lower) || m.title.to_lowercase().contains(&keyword_lower)
                })
                .map(|m| m.ticker)
                .collect(),
            Err(e) => {
                warn!(keyword, error = %e, "ticker resolution failed");
                Vec::new()
            }
        }
    }

    /// Fetch feeds -> LLM classification -> ticker resolution -> emit signals.
    pub async fn run(&self, gateway: &ExchangeGateway, cfg: &Config) -> Vec<Signal> {
        let feeds = self.fetch_all_feeds().await;
        let mut signals = Vec::new();

        for (feed_name, text) in feeds {
            let headline_body: String = text.chars().take(HEADLINE_LIMIT).collect();
            let headline = format!("[{feed_name}] {headline_body}");
            let raw_signals = self.analyze_headline(&headline).await;

            for raw in raw_signals {
                if raw.prob_shift.abs() < cfg.nlp_prob_shift_min {
                    debug!(keyword = raw.ticker_keyword, shift = raw.prob_shift, "sub-threshold nlp signal");
                    continue;
                }

                let tickers = self.resolve_tickers(&raw.ticker_keyword, gateway).await;
                if tickers.is_empty() {
                    info!(keyword = raw.ticker_keyword, "no matching tickers for nlp keyword");
                    continue;
                }

                let side = if raw.prob_shift > 0.0 { Side::Yes } else { Side::No };
                for ticker in tickers {
                    let signal = Signal::new(
                        SignalSource::Nlp,
                        ticker,
                        side,
                        0.5,
                        0.5 + raw.prob_shift,
                        raw.confidence,
                        format!("[{feed_name}] {}", raw.rationale),
                    );
                    signals.push(signal);
                }
            }
        }

        info!(signals = signals.len(), "news analyzer produced signals");
        signals
    }
}
