use chrono::{Duration, Utc};
use common::{ContractDetails, Direction, PartialExit, Trade};
use rand::seq::SliceRandom;
use rand::Rng;

const SYMBOLS: &[&str] = &["AAPL", "MSFT", "NVDA", "TSLA", "SPY", "QQQ"];
const STRATEGIES: &[&str] = &["Breakout", "Pullback", "Reversal", "Opening Range"];
const TIMEFRAMES: &[&str] = &["1m", "5m", "15m", "1h", "1D"];
const MISTAKES: &[&str] = &["FOMO", "Moved stop", "Oversized", "Early exit"];

/// Generate a plausible journal for demos and benchmarks.
///
/// Trades start on consecutive days ending today; most close the same or a
/// following day, a few stay open.
pub fn generate_synthetic_trades(count: usize, base_price: f64) -> Vec<Trade> {
    let mut rng = rand::thread_rng();
    let mut trades = Vec::with_capacity(count);
    let start = Utc::now() - Duration::days(count as i64);

    for i in 0..count {
        let entry_date = start + Duration::days(i as i64) + Duration::minutes(rng.gen_range(0..360));
        let direction = if rng.gen_bool(0.65) {
            Direction::Long
        } else {
            Direction::Short
        };
        let futures = rng.gen_bool(0.15);

        let (symbol, entry, quantity) = if futures {
            ("ES", 4800.0 + rng.gen_range(-200.0..200.0), rng.gen_range(1..4) as f64)
        } else {
            let symbol = SYMBOLS.choose(&mut rng).copied().unwrap_or("SPY");
            let price = base_price * rng.gen_range(0.5..3.0);
            (symbol, price, rng.gen_range(10..200) as f64)
        };

        // 1R is 1-2% of price; outcomes skew slightly positive
        let risk = entry * rng.gen_range(0.01..0.02);
        let stop = entry - risk * direction.sign();
        let target = entry + 2.0 * risk * direction.sign();
        let outcome_r: f64 = rng.gen_range(-1.2..2.5);
        let exit = entry + outcome_r * risk * direction.sign();

        let mut trade = Trade::new(&format!("syn-{:04}", i + 1), symbol, direction, entry, quantity, entry_date)
            .with_stops(stop, target)
            .with_strategy(STRATEGIES.choose(&mut rng).copied().unwrap_or("Breakout"))
            .with_timeframe(TIMEFRAMES.choose(&mut rng).copied().unwrap_or("5m"))
            .with_account(if futures { "Futures" } else { "Cash" })
            .with_fees((quantity * 0.01).max(1.0));

        if futures {
            trade = trade.with_contract(ContractDetails::new(0.25, 12.5));
        }
        if rng.gen_bool(0.2) {
            trade = trade.with_mistake(MISTAKES.choose(&mut rng).copied().unwrap_or("FOMO"));
        }

        if rng.gen_bool(0.05) {
            trades.push(trade);
            continue;
        }

        let exit_date = entry_date + Duration::hours(rng.gen_range(1..72));
        if quantity >= 2.0 && rng.gen_bool(0.25) {
            let partial_qty = (quantity / 2.0).floor();
            let partial_price = entry + risk * direction.sign();
            let partial_date = entry_date + (exit_date - entry_date) / 2;
            trade = trade.with_partial_exit(PartialExit::new(partial_price, partial_date, partial_qty));
        }

        trades.push(trade.with_exit(exit, exit_date));
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_synthetic_trades() {
        let trades = generate_synthetic_trades(200, 100.0);

        assert_eq!(trades.len(), 200);
        for trade in &trades {
            assert!(trade.validate().is_ok(), "invalid trade {}", trade.id);
            assert!(trade.entry_price.unwrap() > 0.0);
            if let Some(exit) = trade.exit_date {
                assert!(exit > trade.entry_date);
            }
        }
    }
}
