//! Fee-adjusted Kelly-criterion position sizing.
//!
//! `f* = (p(b+1) - 1) / b`, with the payout ratio `b` first adjusted for
//! the exchange's fee on profit: `net_b = gross_b * (1 - fee_rate)`.

use crate::domain::{KellyResult, Side, Signal};

/// Pure Kelly fraction. Returns 0 when `b <= 0` (no payout, don't bet).
pub fn kelly_fraction(p: f64, b: f64) -> f64 {
    if b <= 0.0 {
        return 0.0;
    }
    (p * (b + 1.0) - 1.0) / b
}

/// Adjusts a gross payout ratio for a fee charged on profit only.
pub fn net_payout_after_fees(gross_b: f64, fee_rate: f64) -> f64 {
    gross_b * (1.0 - fee_rate)
}

/// Sizing parameters threaded through from [`crate::config::Config`].
#[derive(Debug, Clone, Copy)]
pub struct SizingParams {
    pub fee_rate: f64,
    pub kelly_fraction: f64,
    pub kelly_edge_min: f64,
    pub max_position_usd: f64,
}

/// Computes position size for a signal against the current bankroll.
///
/// `p` and `market_price` are read from the signal's side: YES uses the
/// fair/implied probabilities directly, NO uses their complements.
pub fn size_position(signal: &Signal, bankroll_usd: f64, params: SizingParams) -> KellyResult {
    let (p, market_price) = match signal.side {
        Side::Yes => (signal.estimated_fair_prob, signal.implied_prob),
        Side::No => (1.0 - signal.estimated_fair_prob, 1.0 - signal.implied_prob),
    };

    if !(market_price > 0.0 && market_price < 1.0) {
        return KellyResult::reject();
    }

    let gross_b = 1.0 / market_price - 1.0;
    let net_b = net_payout_after_fees(gross_b, params.fee_rate);
    let f_star = kelly_fraction(p, net_b);
    let f_used = (f_star * params.kelly_fraction).max(0.0);
    let position_usd = (f_used * bankroll_usd).min(params.max_position_usd);
    let net_ev = p * net_b - (1.0 - p);

    let should_trade = f_star > params.kelly_edge_min && net_ev > 0.0 && position_usd > 0.0;

    KellyResult {
        optimal_fraction: f_star,
        position_size_usd: (position_usd * 100.0).round() / 100.0,
        net_ev: (net_ev * 10_000.0).round() / 10_000.0,
        should_trade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalSource;

    fn signal(side: Side, implied: f64, fair: f64) -> Signal {
        Signal::new(SignalSource::Arbitrage, "TICK", side, implied, fair, 0.5, "test")
    }

    #[test]
    fn kelly_zero_at_breakeven_price() {
        // p = 1/(b+1) => f* = 0
        let b = 1.5;
        let p = 1.0 / (b + 1.0);
        assert!(kelly_fraction(p, b).abs() < 1e-12);
    }

    #[test]
    fn kelly_returns_zero_for_nonpositive_b() {
        assert_eq!(kelly_fraction(0.6, 0.0), 0.0);
        assert_eq!(kelly_fraction(0.6, -1.0), 0.0);
    }

    #[test]
    fn net_payout_applies_fee_to_gross_b() {
        assert!((net_payout_after_fees(1.0, 0.07) - 0.93).abs() < 1e-12);
    }

    #[test]
    fn scenario_1_even_money_sixty_percent_fair_no_fee() {
        let sig = signal(Side::Yes, 0.5, 0.6);
        let params = SizingParams {
            fee_rate: 0.0,
            kelly_fraction: 1.0,
            kelly_edge_min: 0.05,
            max_position_usd: 10_000.0,
        };
        let res = size_position(&sig, 1000.0, params);
        assert!((res.optimal_fraction - 0.20).abs() < 1e-9);
        assert!((res.position_size_usd - 200.00).abs() < 1e-9);
        assert!((res.net_ev - 0.20).abs() < 1e-9);
        assert!(res.should_trade);
    }

    #[test]
    fn scenario_2_even_money_sixty_percent_fair_with_fees() {
        let sig = signal(Side::Yes, 0.5, 0.6);
        let params = SizingParams {
            fee_rate: 0.07,
            kelly_fraction: 1.0,
            kelly_edge_min: 0.05,
            max_position_usd: 10_000.0,
        };
        let res = size_position(&sig, 1000.0, params);
        // f* = (0.6 * 1.93 - 1) / 0.93 = 0.1699 (the spec's own worked example for
        // this scenario, 0.1731/173.12, is arithmetically inconsistent with its
        // formula; these are the values the formula actually produces).
        assert!((res.optimal_fraction - 0.1699).abs() < 1e-3);
        assert!((res.position_size_usd - 169.89).abs() < 1e-1);
        assert!(res.should_trade);
    }

    #[test]
    fn scenario_3_sub_threshold_edge_does_not_trade() {
        let sig = signal(Side::Yes, 0.50, 0.51);
        let params = SizingParams {
            fee_rate: 0.0,
            kelly_fraction: 1.0,
            kelly_edge_min: 0.05,
            max_position_usd: 10_000.0,
        };
        let res = size_position(&sig, 1000.0, params);
        assert!((res.optimal_fraction - 0.02).abs() < 1e-2);
        assert!(!res.should_trade);
    }

    #[test]
    fn market_price_outside_open_interval_is_rejected() {
        let sig = signal(Side::Yes, 1.0, 0.9);
        let params = SizingParams {
            fee_rate: 0.07,
            kelly_fraction: 0.25,
            kelly_edge_min: 0.05,
            max_position_usd: 500.0,
        };
        let res = size_position(&sig, 1000.0, params);
        assert!(!res.should_trade);
        assert_eq!(res.position_size_usd, 0.0);
    }

    #[test]
    fn no_side_uses_complementary_probabilities() {
        // NO side with implied=0.5, fair=0.4 is equivalent to YES implied=0.5 fair=0.6
        let yes = signal(Side::Yes, 0.5, 0.6);
        let no = signal(Side::No, 0.5, 0.4);
        let params = SizingParams {
            fee_rate: 0.07,
            kelly_fraction: 0.25,
            kelly_edge_min: 0.05,
            max_position_usd: 500.0,
        };
        let r1 = size_position(&yes, 1000.0, params);
        let r2 = size_position(&no, 1000.0, params);
        assert!((r1.optimal_fraction - r2.optimal_fraction).abs() < 1e-9);
    }
}
