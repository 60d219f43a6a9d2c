//! Orderbook Scanner (component B): per-market liquidity-void detection.

use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{OrderbookSnapshot, Side, Signal, SignalSource};
use crate::gateway::ExchangeGateway;

const ORDERBOOK_DEPTH: u32 = 10;
const PAGE_SIZE: usize = 100;

/// Checks a single market's orderbook for a liquidity void and emits a
/// signal when the spread exceeds `threshold_cents`.
pub async fn scan_market(gateway: &ExchangeGateway, ticker: &str, threshold_cents: i64) -> Option<Signal> {
    let raw = match gateway.get_orderbook(ticker, ORDERBOOK_DEPTH).await {
        Ok(ob) => ob,
        Err(e) => {
            warn!(ticker, error = %e, "failed to fetch orderbook");
            return None;
        }
    };

    if raw.yes.is_none() && raw.no.is_none() {
        return None;
    }

    let snap = OrderbookSnapshot::from_best_bids(raw.best_yes_bid(), raw.best_no_bid());
    if !snap.is_well_formed() {
        debug!(ticker, "crossed book, discarding");
        return None;
    }

    debug!(
        ticker,
        yes_bid = snap.best_yes_bid,
        synth_ask = snap.synthetic_yes_ask,
        spread = snap.spread_cents,
        "orderbook snapshot"
    );

    if snap.spread_cents <= threshold_cents {
        return None;
    }

    let implied = if snap.best_yes_bid > 0 {
        snap.best_yes_bid as f64 / 100.0
    } else {
        0.5
    };
    let midpoint = (snap.best_yes_bid + snap.synthetic_yes_ask) as f64 / 200.0;

    let rationale = format!(
        "Liquidity void: spread={}c (YES bid={}c, synth ask={}c). Stink bid opportunity at {}c.",
        snap.spread_cents,
        snap.best_yes_bid,
        snap.synthetic_yes_ask,
        snap.best_yes_bid + 1
    );

    let confidence = (snap.spread_cents as f64 / 10.0).min(1.0);

    Some(Signal::new(
        SignalSource::Orderbook,
        ticker,
        Side::Yes,
        implied,
        midpoint,
        confidence,
        rationale,
    ))
}

/// Paginates through open markets (capped at `cfg.orderbook_scan_limit`)
/// and scans each orderbook with `cfg.orderbook_concurrency`-wide
/// concurrent fan-out per page. Individual failures are logged and
/// omitted; they never abort the batch.
pub async fn scan_all_open_markets(gateway: &ExchangeGateway, cfg: &Config) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut cursor: Option<String> = None;
    let mut fetched = 0usize;
    let mut seen_tickers = std::collections::HashSet::new();

    while fetched < cfg.orderbook_scan_limit {
        let batch_size = PAGE_SIZE.min(cfg.orderbook_scan_limit - fetched);
        let page = match gateway.get_markets(Some("open"), batch_size, cursor.as_deref()).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to fetch markets page");
                break;
            }
        };

        if page.markets.is_empty() {
            break;
        }

        let tickers: Vec<String> = page
            .markets
            .iter()
            .map(|m| m.ticker.clone())
            .filter(|t| seen_tickers.insert(t.clone()))
            .collect();

        let results: Vec<Option<Signal>> = stream::iter(tickers.iter())
            .map(|ticker| scan_market(gateway, ticker, cfg.spread_threshold_cents))
            .buffer_unordered(cfg.orderbook_concurrency)
            .collect()
            .await;

        signals.extend(results.into_iter().flatten());

        fetched += page.markets.len();
        cursor = page.cursor;
        if cursor.is_none() {
            break;
        }
    }

    tracing::info!(signals = signals.len(), markets_scanned = fetched, "orderbook scan complete");
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_liquidity_void_detected() {
        let snap = OrderbookSnapshot::from_best_bids(40, 55);
        assert_eq!(snap.synthetic_yes_ask, 45);
        assert_eq!(snap.spread_cents, 5);
        let implied = snap.best_yes_bid as f64 / 100.0;
        let fair = (snap.best_yes_bid + snap.synthetic_yes_ask) as f64 / 200.0;
        assert!((implied - 0.40).abs() < 1e-9);
        assert!((fair - 0.425).abs() < 1e-9);
        let confidence = (snap.spread_cents as f64 / 10.0).min(1.0);
        assert!((confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn scenario_5_no_liquidity_void_below_threshold() {
        let snap = OrderbookSnapshot::from_best_bids(45, 55);
        assert_eq!(snap.spread_cents, 0);
        assert!(snap.spread_cents <= 3);
    }
}
