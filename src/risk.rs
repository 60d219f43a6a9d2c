//! Risk & Execution (component E): Kelly sizing, order construction, and
//! commit — append to the paper journal, or submit a live order.
//!
//! The trade journal is append-only and owned exclusively by this
//! component; no in-place edits, single writer.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::domain::{KellyResult, Side, Signal, TradeOrder};
use crate::gateway::{ExchangeGateway, PlaceOrderRequest};
use crate::kelly::{size_position, SizingParams};

/// One append-only record in `paper_trades.jsonl`.
#[derive(Debug, Serialize, Deserialize)]
struct PaperTradeRecord {
    timestamp: chrono::DateTime<Utc>,
    ticker: String,
    side: Side,
    contracts: u64,
    limit_price_cents: u8,
    fill_price_cents: u8,
    optimal_fraction: f64,
    position_size_usd: f64,
    net_ev: f64,
    source: &'static str,
    rationale: String,
    paper: bool,
}

/// `price_cents = round(implied_prob * 100)`, inverted for NO, clamped to
/// `[1, 99]`.
fn limit_price_cents(signal: &Signal) -> u8 {
    let yes_price = (signal.implied_prob * 100.0).round();
    let price = match signal.side {
        Side::Yes => yes_price,
        Side::No => 100.0 - yes_price,
    };
    price.clamp(1.0, 99.0) as u8
}

fn contracts_for(position_usd: f64, price_cents: u8) -> u64 {
    ((position_usd * 100.0 / price_cents as f64).floor() as u64).max(1)
}

/// Builds a [`TradeOrder`] from a signal and its sizing, when
/// `kelly.should_trade`. Returns `None` when the gate rejects the trade —
/// a normal control-flow outcome, not an error.
pub fn build_order(signal: Signal, kelly: KellyResult, paper: bool) -> Option<TradeOrder> {
    if !kelly.should_trade {
        return None;
    }
    let limit_price_cents = limit_price_cents(&signal);
    let contracts = contracts_for(kelly.position_size_usd, limit_price_cents);
    Some(TradeOrder {
        ticker: signal.ticker.clone(),
        side: signal.side,
        contracts,
        limit_price_cents,
        signal,
        kelly,
        paper,
        order_id: None,
        fill_price_cents: None,
        timestamp: Utc::now(),
    })
}

/// Appends one JSONL record for a simulated fill at the limit price.
pub async fn commit_paper(order: &TradeOrder, journal_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = journal_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let record = PaperTradeRecord {
        timestamp: order.timestamp,
        ticker: order.ticker.clone(),
        side: order.side,
        contracts: order.contracts,
        limit_price_cents: order.limit_price_cents,
        fill_price_cents: order.limit_price_cents,
        optimal_fraction: order.kelly.optimal_fraction,
        position_size_usd: order.kelly.position_size_usd,
        net_ev: order.kelly.net_ev,
        source: order.signal.source.as_str(),
        rationale: order.signal.rationale.clone(),
        paper: true,
    };
    let mut line = serde_json::to_string(&record).expect("paper trade record is always serializable");
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(journal_path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Submits a live limit order. Submission failures are logged and the
/// order is left unsubmitted (`order_id = None`); the cycle continues.
pub async fn commit_live(gateway: &ExchangeGateway, order: &mut TradeOrder) {
    let (yes_price, no_price) = match order.side {
        Side::Yes => (Some(order.limit_price_cents), None),
        Side::No => (None, Some(order.limit_price_cents)),
    };
    let req = PlaceOrderRequest {
        ticker: order.ticker.clone(),
        action: "buy",
        side: order.side.as_str(),
        order_type: "limit",
        count: order.contracts,
        yes_price,
        no_price,
    };
    match gateway.place_order(&req).await {
        Ok(order_id) => {
            info!(ticker = %order.ticker, order_id, "live order submitted");
            order.order_id = Some(order_id);
        }
        Err(e) => {
            error!(ticker = %order.ticker, error = %e, "live order submission failed");
        }
    }
}

/// Sizes every signal independently against `bankroll_usd`, filters out
/// the ones that don't clear the sizing gate, and commits survivors —
/// sequentially in paper mode, serially with individual error isolation
/// in live mode. No cross-signal portfolio optimization.
pub async fn process_signals(
    signals: Vec<Signal>,
    bankroll_usd: f64,
    params: SizingParams,
    paper: bool,
    journal_path: &Path,
    gateway: Option<&ExchangeGateway>,
) -> Vec<TradeOrder> {
    let mut orders = Vec::new();
    for signal in signals {
        let kelly = size_position(&signal, bankroll_usd, params);
        let Some(mut order) = build_order(signal, kelly, paper) else {
            continue;
        };

        if paper {
            if let Err(e) = commit_paper(&order, journal_path).await {
                error!(ticker = %order.ticker, error = %e, "failed to append paper trade journal");
                continue;
            }
        } else {
            match gateway {
                Some(gw) => commit_live(gw, &mut order).await,
                None => warn!(ticker = %order.ticker, "live mode with no gateway configured, skipping order"),
            }
        }

        orders.push(order);
    }
    orders
}
