use common::{AnalyticsConfig, CumulativeSeries, JournalSummary, Trade};

use crate::aggregate::slices::resolve_exit_date;
use crate::aggregate::CumulativeAggregator;
use crate::metrics::MetricsCalculator;

/// Headline statistics for the journal dashboard
pub struct SummaryCalculator;

impl SummaryCalculator {
    /// Calculate all summary statistics
    pub fn calculate(trades: &[Trade], config: &AnalyticsConfig) -> JournalSummary {
        let series = CumulativeAggregator::new(config).aggregate(trades);
        Self::calculate_with_series(trades, &series)
    }

    /// Same as [`calculate`](Self::calculate) for callers that already hold
    /// the cumulative series
    pub fn calculate_with_series(trades: &[Trade], series: &CumulativeSeries) -> JournalSummary {
        let open_trades = trades.iter().filter(|t| !t.is_closed()).count() as u32;

        let metrics = MetricsCalculator::calculate_batch(trades);
        let closed: Vec<(&Trade, f64, Option<f64>)> = trades
            .iter()
            .zip(&metrics)
            // Same trade set as the cumulative series
            .filter(|(t, _)| t.is_closed() && resolve_exit_date(t).is_ok())
            .filter_map(|(t, m)| m.profit_loss.map(|pnl| (t, pnl, m.r_multiple)))
            .collect();

        if closed.is_empty() {
            return JournalSummary {
                open_trades,
                ..Default::default()
            };
        }

        let mut winning = 0u32;
        let mut losing = 0u32;
        let mut total_wins = 0.0;
        let mut total_losses = 0.0;
        let mut total_days = 0i64;
        let mut best = f64::MIN;
        let mut worst = f64::MAX;
        let mut r_sum = 0.0;
        let mut r_count = 0u32;

        for (trade, pnl, r) in &closed {
            if *pnl > 0.0 {
                winning += 1;
                total_wins += pnl;
            } else if *pnl < 0.0 {
                losing += 1;
                total_losses += pnl.abs();
            }

            total_days += trade.holding_days().unwrap_or(0);
            best = best.max(*pnl);
            worst = worst.min(*pnl);

            if let Some(r) = r {
                r_sum += r;
                r_count += 1;
            }
        }

        let n = closed.len() as f64;
        let win_rate = (winning as f64 / n) * 100.0;

        let avg_win = if winning > 0 {
            total_wins / winning as f64
        } else {
            0.0
        };

        let avg_loss = if losing > 0 {
            total_losses / losing as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            Some(total_wins / total_losses)
        } else {
            None
        };

        let expectancy = (win_rate / 100.0 * avg_win) - ((1.0 - win_rate / 100.0) * avg_loss);

        JournalSummary {
            total_trades: closed.len() as u32,
            open_trades,
            winning_trades: winning,
            losing_trades: losing,
            break_even_trades: closed.len() as u32 - winning - losing,
            win_rate,
            total_pnl: closed.iter().map(|(_, pnl, _)| pnl).sum(),
            avg_win,
            avg_loss,
            profit_factor,
            expectancy,
            best_trade: best,
            worst_trade: worst,
            avg_r_multiple: if r_count > 0 {
                Some(r_sum / r_count as f64)
            } else {
                None
            },
            avg_holding_days: total_days as f64 / n,
            max_drawdown: Self::calculate_max_drawdown(series),
        }
    }

    /// Largest peak-to-trough drop of the cumulative P&L, in currency.
    /// The curve starts from zero before the first exit.
    pub fn calculate_max_drawdown(series: &CumulativeSeries) -> f64 {
        let mut peak = 0.0_f64;
        let mut max_drawdown = 0.0_f64;

        for point in &series.points {
            peak = peak.max(point.total);
            max_drawdown = max_drawdown.max(peak - point.total);
        }

        max_drawdown
    }
}
