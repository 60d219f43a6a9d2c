//! Orchestrator (component F): the cycle scheduler. Launches the three
//! producers concurrently, collects their signals, invokes Risk &
//! Execution, sleeps, repeats. No persistence between cycles.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{Signal, TradeOrder};
use crate::gateway::ExchangeGateway;
use crate::kelly::SizingParams;
use crate::llm::LlmClient;
use crate::producers::{arbitrage::ArbitrageScanner, news::NewsAnalyzer, orderbook};
use crate::risk;

/// Everything a cycle needs, built once at startup and shared across
/// cycles. The HTTP client pools inside `gateway` and the producers are
/// each a single reusable pool, not shared across components.
pub struct Orchestrator {
    gateway: Arc<ExchangeGateway>,
    news_analyzer: NewsAnalyzer,
    arbitrage_scanner: ArbitrageScanner,
    cfg: Config,
    bankroll_usd: f64,
}

impl Orchestrator {
    pub async fn new(cfg: Config, gateway: ExchangeGateway, llm: Arc<dyn LlmClient>) -> Self {
        let gateway = Arc::new(gateway);
        let bankroll_usd = if cfg.paper_trading {
            cfg.paper_bankroll_usd()
        } else {
            // Live mode reads balance once at startup and does not refresh —
            // a known limitation; cycle-over-cycle sizing drifts as the real
            // balance moves.
            match gateway.get_balance().await {
                Ok(cents) => cents as f64 / 100.0,
                Err(e) => {
                    warn!(error = %e, "failed to read live balance at startup, falling back to paper bankroll");
                    cfg.paper_bankroll_usd()
                }
            }
        };

        Self {
            news_analyzer: NewsAnalyzer::new(llm),
            arbitrage_scanner: ArbitrageScanner::new(&cfg.external_venue_base_url),
            gateway,
            cfg,
            bankroll_usd,
        }
    }

    fn sizing_params(&self) -> SizingParams {
        SizingParams {
            fee_rate: self.cfg.fee_rate,
            kelly_fraction: self.cfg.kelly_fraction,
            kelly_edge_min: self.cfg.kelly_edge_min,
            max_position_usd: self.cfg.max_position_usd,
        }
    }

    /// Runs B, C, D concurrently, converting any producer failure into an
    /// empty signal list (isolation — a panicking or erroring producer
    /// never aborts the cycle), then concatenates in B, C, D order.
    async fn collect_signals(&self) -> Vec<Signal> {
        let orderbook_fut = orderbook::scan_all_open_markets(&self.gateway, &self.cfg);
        let news_fut = self.news_analyzer.run(&self.gateway, &self.cfg);
        let arbitrage_fut = self.arbitrage_scanner.run(&self.gateway, &self.cfg);

        let (orderbook_signals, news_signals, arbitrage_signals) =
            tokio::join!(orderbook_fut, news_fut, arbitrage_fut);

        let mut signals = orderbook_signals;
        signals.extend(news_signals);
        signals.extend(arbitrage_signals);
        signals
    }

    /// One full cycle: fan out producers, size and commit survivors.
    pub async fn run_cycle(&self) -> Vec<TradeOrder> {
        let signals = self.collect_signals().await;
        info!(signals = signals.len(), "cycle collected signals");

        let gateway_ref = if self.cfg.paper_trading { None } else { Some(self.gateway.as_ref()) };
        risk::process_signals(
            signals,
            self.bankroll_usd,
            self.sizing_params(),
            self.cfg.paper_trading,
            &self.cfg.trade_journal_path(),
            gateway_ref,
        )
        .await
    }

    /// Runs cycles until cancelled (Ctrl-C). Each cycle fully completes,
    /// including order submission, before the next begins.
    pub async fn run(&self) {
        info!(
            mode = if self.cfg.paper_trading { "paper" } else { "live" },
            bankroll_usd = self.bankroll_usd,
            interval_secs = self.cfg.cycle_interval_secs,
            "orchestrator starting"
        );
        loop {
            let cycle = async {
                let orders = self.run_cycle().await;
                info!(orders = orders.len(), "cycle complete");
            };

            tokio::select! {
                _ = cycle => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received mid-cycle, shutting down");
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.cfg.cycle_interval_secs)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received during sleep, shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    struct EmptyLlm;

    #[async_trait]
    impl LlmClient for EmptyLlm {
        async fn analyze(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, LlmError> {
            Ok("[]".to_string())
        }
    }

    fn test_config() -> Config {
        Config {
            exchange_base_url: "https://example.invalid".into(),
            exchange_access_key_id: "KEY".into(),
            exchange_private_key_b64: None,
            exchange_private_key_path: None,
            llm_api_key: String::new(),
            llm_model: String::new(),
            external_venue_base_url: "https://example.invalid".into(),
            paper_trading: true,
            fee_rate: 0.07,
            spread_threshold_cents: 3,
            kelly_edge_min: 0.05,
            nlp_prob_shift_min: 0.10,
            max_position_usd: 500.0,
            kelly_fraction: 0.25,
            log_dir: tempfile::tempdir().unwrap().into_path(),
            cycle_interval_secs: 60,
            orderbook_scan_limit: 200,
            orderbook_concurrency: 32,
        }
    }

    #[tokio::test]
    async fn paper_bankroll_is_used_without_hitting_gateway() {
        let cfg = test_config();
        let auth = crate::gateway::GatewayAuth::from_seed_bytes("KEY", &[3u8; 32]).unwrap();
        let gateway = ExchangeGateway::new(cfg.exchange_base_url.clone(), auth).unwrap();
        let orchestrator = Orchestrator::new(cfg.clone(), gateway, Arc::new(EmptyLlm)).await;
        assert_eq!(orchestrator.bankroll_usd, cfg.paper_bankroll_usd());
    }
}
