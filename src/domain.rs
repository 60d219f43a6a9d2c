//! Core data model for the signal-and-execution engine.
//!
//! Field sets here are carried over as-is from the suite's own data model:
//! `Side`, `SignalSource`, `Signal`, `OrderbookSnapshot`, `KellyResult`, and
//! `TradeOrder` are tagged structs/enums rather than loose dicts, so
//! equality is value equality and malformed variants are unrepresentable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One half of a binary contract. Buying YES at price `p` is equivalent to
/// selling NO at price `100 - p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

/// Which producer emitted a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Orderbook,
    Nlp,
    Arbitrage,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Orderbook => "orderbook",
            SignalSource::Nlp => "nlp",
            SignalSource::Arbitrage => "arbitrage",
        }
    }
}

/// An actionable opinion emitted by a producer. Ephemeral: created per
/// cycle, discarded after sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub source: SignalSource,
    pub ticker: String,
    pub side: Side,
    pub implied_prob: f64,
    pub estimated_fair_prob: f64,
    pub edge: f64,
    pub confidence: f64,
    pub rationale: String,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        source: SignalSource,
        ticker: impl Into<String>,
        side: Side,
        implied_prob: f64,
        estimated_fair_prob: f64,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        let edge = (estimated_fair_prob - implied_prob).abs();
        Self {
            source,
            ticker: ticker.into(),
            side,
            implied_prob,
            estimated_fair_prob,
            edge,
            confidence,
            rationale: rationale.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Derived top-of-book view at one instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub best_yes_bid: i64,
    pub best_no_bid: i64,
    pub synthetic_yes_ask: i64,
    pub spread_cents: i64,
}

impl OrderbookSnapshot {
    /// Builds a snapshot from the best bid on each side, in cents.
    /// `synthetic_yes_ask = 100 - best_no_bid` (or 100 if the NO side is empty).
    pub fn from_best_bids(best_yes_bid: i64, best_no_bid: i64) -> Self {
        let synthetic_yes_ask = if best_no_bid > 0 {
            100 - best_no_bid
        } else {
            100
        };
        Self {
            best_yes_bid,
            best_no_bid,
            synthetic_yes_ask,
            spread_cents: synthetic_yes_ask - best_yes_bid,
        }
    }

    /// A crossed book (negative spread) is malformed and should be discarded.
    pub fn is_well_formed(&self) -> bool {
        self.spread_cents >= 0
    }
}

/// Kelly sizing output for a single [`Signal`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KellyResult {
    pub optimal_fraction: f64,
    pub position_size_usd: f64,
    pub net_ev: f64,
    pub should_trade: bool,
}

impl KellyResult {
    /// The zero result returned when a signal cannot be priced at all
    /// (`market_price` outside `(0,1)`).
    pub fn reject() -> Self {
        Self {
            optimal_fraction: 0.0,
            position_size_usd: 0.0,
            net_ev: 0.0,
            should_trade: false,
        }
    }
}

/// Intent to place an order, carrying the signal and sizing that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    pub ticker: String,
    pub side: Side,
    pub contracts: u64,
    pub limit_price_cents: u8,
    pub signal: Signal,
    pub kelly: KellyResult,
    pub paper: bool,
    pub order_id: Option<String>,
    pub fill_price_cents: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_from_best_bids_matches_invariant() {
        let snap = OrderbookSnapshot::from_best_bids(40, 55);
        assert_eq!(snap.synthetic_yes_ask, 45);
        assert_eq!(snap.spread_cents, 5);
        assert!(snap.is_well_formed());
    }

    #[test]
    fn snapshot_with_empty_no_side_defaults_ask_to_100() {
        let snap = OrderbookSnapshot::from_best_bids(40, 0);
        assert_eq!(snap.synthetic_yes_ask, 100);
        assert_eq!(snap.spread_cents, 60);
    }

    #[test]
    fn crossed_book_is_not_well_formed() {
        let snap = OrderbookSnapshot::from_best_bids(60, 50);
        assert_eq!(snap.synthetic_yes_ask, 50);
        assert!(!snap.is_well_formed());
    }

    #[test]
    fn signal_edge_is_absolute_difference() {
        let sig = Signal::new(
            SignalSource::Orderbook,
            "TICK-1",
            Side::Yes,
            0.40,
            0.425,
            0.5,
            "test",
        );
        assert!((sig.edge - 0.025).abs() < 1e-9);
    }
}
