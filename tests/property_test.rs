//! Property tests for engine invariants.
//!
//! Uses proptest to verify, over random price walks:
//! 1. Ledger conservation — final balance equals initial plus summed net P&L
//! 2. Single position — closed trades never overlap in time
//! 3. Watermark monotonicity — the peak dominates the balance, drawdown is sane
//! 4. Exit discipline — every stop/target fill sits exactly on its level
//! 5. Sampling independence — the equity cadence never changes the trades
//! 6. No look-ahead — a signal depends only on candles at or before it

mod common;

use common::{test_params, ts};
use proptest::prelude::*;
use volbreak::domain::candle::Candle;
use volbreak::domain::engine::{run_backtest, BacktestConfig};
use volbreak::domain::position::{ExitReason, Side};
use volbreak::domain::signal::{BreakoutRule, SignalRule};

fn walk_candles(steps: Vec<(f64, f64, f64, f64)>) -> Vec<Candle> {
    let mut price = 100.0_f64;
    let mut candles = Vec::with_capacity(steps.len());
    for (i, (drift, up, down, volume)) in steps.into_iter().enumerate() {
        let open = price;
        let close = (price + (drift - 0.5) * 6.0).max(5.0);
        let high = open.max(close) + up * 3.0;
        let low = (open.min(close) - down * 3.0).max(1.0);
        candles.push(Candle {
            timestamp: ts(i),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    candles
}

fn arb_candles() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(
        (0.0..1.0_f64, 0.0..1.0_f64, 0.0..1.0_f64, 1.0..100.0_f64),
        15..80,
    )
    .prop_map(walk_candles)
}

proptest! {
    /// Summing net P&L over the trade list reproduces the balance change.
    #[test]
    fn balance_is_conserved(candles in arb_candles()) {
        let params = test_params(5);
        let rule = BreakoutRule::from_params(&params);
        let config = BacktestConfig::default();

        let result = run_backtest(&candles, &rule, &params, &config).unwrap();
        let ledger = &result.state.ledger;

        let net_sum: f64 = ledger.trades.iter().map(|t| t.net_pnl).sum();
        prop_assert!((ledger.balance - (ledger.initial_balance + net_sum)).abs() < 1e-6);
        prop_assert!(ledger.balance.is_finite());
    }

    /// At most one position at a time: trade intervals are ordered and
    /// never overlap.
    #[test]
    fn trades_are_sequential(candles in arb_candles()) {
        let params = test_params(5);
        let rule = BreakoutRule::from_params(&params);

        let result =
            run_backtest(&candles, &rule, &params, &BacktestConfig::default()).unwrap();
        let trades = &result.state.ledger.trades;

        for trade in trades.iter() {
            prop_assert!(trade.entry_timestamp <= trade.exit_timestamp);
        }
        for pair in trades.windows(2) {
            prop_assert!(pair[0].exit_timestamp <= pair[1].entry_timestamp);
        }
    }

    /// The running peak never falls below the balance and the drawdown
    /// fraction stays non-negative.
    #[test]
    fn watermark_dominates_balance(candles in arb_candles()) {
        let params = test_params(5);
        let rule = BreakoutRule::from_params(&params);

        let result =
            run_backtest(&candles, &rule, &params, &BacktestConfig::default()).unwrap();
        let ledger = &result.state.ledger;

        prop_assert!(ledger.peak_balance >= ledger.balance - 1e-9);
        prop_assert!(ledger.peak_balance >= ledger.initial_balance - 1e-9);
        prop_assert!(ledger.max_drawdown_pct >= 0.0);
    }

    /// Stop and target exits fill exactly at their configured level.
    #[test]
    fn exits_fill_on_their_level(candles in arb_candles()) {
        let params = test_params(5);
        let rule = BreakoutRule::from_params(&params);

        let result =
            run_backtest(&candles, &rule, &params, &BacktestConfig::default()).unwrap();

        for trade in &result.state.ledger.trades {
            let expected = match (trade.side, trade.exit_reason) {
                (Side::Long, ExitReason::StopLoss) => {
                    trade.entry_price * (1.0 - params.stop_loss_pct)
                }
                (Side::Long, ExitReason::TakeProfit) => {
                    trade.entry_price * (1.0 + params.take_profit_pct)
                }
                (Side::Short, ExitReason::StopLoss) => {
                    trade.entry_price * (1.0 + params.stop_loss_pct)
                }
                (Side::Short, ExitReason::TakeProfit) => {
                    trade.entry_price * (1.0 - params.take_profit_pct)
                }
                (_, ExitReason::ForcedClose) => continue,
            };
            prop_assert!((trade.exit_price - expected).abs() < 1e-9);
        }
    }

    /// Equity sampling cadence is observability only; the trade list and
    /// final balance are identical at any cadence.
    #[test]
    fn equity_cadence_never_changes_trades(
        candles in arb_candles(),
        every in 1_u64..8,
    ) {
        let params = test_params(5);
        let rule = BreakoutRule::from_params(&params);
        let base = BacktestConfig::default();
        let sampled = BacktestConfig {
            equity_sample_every: every,
            ..base.clone()
        };

        let dense = run_backtest(&candles, &rule, &params, &base).unwrap();
        let sparse = run_backtest(&candles, &rule, &params, &sampled).unwrap();

        prop_assert_eq!(&dense.state.ledger.trades, &sparse.state.ledger.trades);
        prop_assert!(
            (dense.state.ledger.balance - sparse.state.ledger.balance).abs() < f64::EPSILON
        );
    }

    /// Evaluating the rule on a prefix yields the same signal whether or
    /// not later candles exist in the backing series.
    #[test]
    fn signal_ignores_candles_after_the_newest(
        candles in arb_candles(),
        cut in 0.3..0.95_f64,
    ) {
        let rule = BreakoutRule::from_params(&test_params(5));
        let k = ((candles.len() as f64) * cut) as usize;
        let k = k.clamp(6, candles.len());
        let isolated: Vec<Candle> = candles[..k].to_vec();

        for i in 0..k {
            prop_assert_eq!(
                rule.evaluate(&candles[..=i]),
                rule.evaluate(&isolated[..=i])
            );
        }
    }
}
