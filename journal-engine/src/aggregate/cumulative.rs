use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{AnalyticsConfig, ChartDataPoint, CumulativeSeries, Trade};

use super::slices::{calendar_offset, collect_slices, day_start_millis};

/// Running total P&L per exit date, plus one running series per strategy
pub struct CumulativeAggregator {
    config: AnalyticsConfig,
}

impl CumulativeAggregator {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Fold the closed trades into chart points ordered by date
    pub fn aggregate(&self, trades: &[Trade]) -> CumulativeSeries {
        let offset = calendar_offset(&self.config);
        let sliced = collect_slices(trades, &self.config);

        let mut total = 0.0;
        let mut running: BTreeMap<String, f64> = BTreeMap::new();
        let mut strategies: Vec<String> = Vec::new();
        // BTreeMap keeps dates ascending; one point per date, last write wins
        let mut points: BTreeMap<NaiveDate, ChartDataPoint> = BTreeMap::new();

        for slice in &sliced.slices {
            total += slice.profit_loss;

            if let Some(strategy) = slice.trade.strategy_name() {
                let value = running.entry(strategy.to_string()).or_insert_with(|| {
                    strategies.push(strategy.to_string());
                    0.0
                });
                *value += slice.profit_loss;
            }

            points.insert(
                slice.date,
                ChartDataPoint {
                    date: slice.date,
                    label: slice.date.format(&self.config.date_label_format).to_string(),
                    timestamp: day_start_millis(slice.date, offset),
                    total,
                    strategies: running.clone(),
                },
            );
        }

        let diagnostics = sliced.diagnostics;
        if diagnostics.excluded() > 0 {
            log::debug!(
                "cumulative series: {} trades included, {} excluded",
                diagnostics.included,
                diagnostics.excluded()
            );
        }

        CumulativeSeries {
            points: points.into_values().collect(),
            strategies,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeZone, Utc};
    use common::{Direction, PartialExit};

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn closed(id: &str, entry: f64, exit: f64, qty: f64, strategy: &str, exit_at: DateTime<Utc>) -> Trade {
        Trade::new(id, "SPY", Direction::Long, entry, qty, exit_at - chrono::Duration::hours(2))
            .with_exit(exit, exit_at)
            .with_strategy(strategy)
    }

    fn aggregate(trades: &[Trade]) -> CumulativeSeries {
        CumulativeAggregator::new(&AnalyticsConfig::default()).aggregate(trades)
    }

    #[test]
    fn test_same_day_trades_share_a_point() {
        let trades = vec![
            closed("a", 100.0, 110.0, 10.0, "Breakout", at(1, 5, 15)),
            closed("b", 50.0, 40.0, 5.0, "Reversal", at(1, 5, 16)),
        ];

        let series = aggregate(&trades);

        assert_eq!(series.points.len(), 1);
        let point = &series.points[0];
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(point.label, "Jan 5, 2024");
        assert_eq!(point.total, 50.0);
        assert_eq!(point.strategies["Breakout"], 100.0);
        assert_eq!(point.strategies["Reversal"], -50.0);
        assert_eq!(series.strategies, vec!["Breakout", "Reversal"]);
    }

    #[test]
    fn test_strategies_start_at_first_appearance() {
        let trades = vec![
            closed("b", 100.0, 90.0, 1.0, "Reversal", at(1, 9, 15)),
            closed("a", 100.0, 120.0, 1.0, "Breakout", at(1, 3, 15)),
        ];

        let series = aggregate(&trades);

        assert_eq!(series.points.len(), 2);
        assert!(!series.points[0].strategies.contains_key("Reversal"));
        assert_eq!(series.points[0].total, 20.0);
        assert_eq!(series.points[1].strategies["Breakout"], 20.0);
        assert_eq!(series.points[1].strategies["Reversal"], -10.0);
        assert_eq!(series.points[1].total, 10.0);
        assert_eq!(series.strategies, vec!["Breakout", "Reversal"]);
    }

    #[test]
    fn test_totals_can_fall() {
        let trades = vec![
            closed("a", 100.0, 110.0, 1.0, "A", at(2, 1, 15)),
            closed("b", 100.0, 80.0, 1.0, "A", at(2, 2, 15)),
        ];

        let series = aggregate(&trades);
        assert!(series.points[1].total < series.points[0].total);
    }

    #[test]
    fn test_timestamps_strictly_increase_and_total_matches_sum() {
        let mut trades = Vec::new();
        let mut expected = 0.0;
        for i in 0..40u32 {
            let entry = 100.0 + i as f64;
            let exit = entry + if i % 3 == 0 { -2.5 } else { 1.75 };
            let qty = 1.0 + (i % 4) as f64;
            expected += (exit - entry) * qty;
            trades.push(closed(
                &format!("t{}", i),
                entry,
                exit,
                qty,
                if i % 2 == 0 { "Even" } else { "Odd" },
                at(1 + i / 28, 1 + i % 28, 10 + i % 5),
            ));
        }

        let series = aggregate(&trades);

        for pair in series.points.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        assert_abs_diff_eq!(series.final_total(), expected, epsilon = 1e-9);

        let deltas: f64 = std::iter::once(series.points[0].total)
            .chain(series.points.windows(2).map(|w| w[1].total - w[0].total))
            .sum();
        assert_abs_diff_eq!(deltas, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let trades = vec![
            closed("a", 100.0, 110.3, 3.0, "A", at(3, 1, 15)),
            closed("b", 10.0, 9.7, 7.0, "B", at(3, 1, 15)),
            closed("c", 55.5, 56.1, 2.0, "A", at(3, 4, 15)),
        ];

        let first = aggregate(&trades);
        let second = aggregate(&trades);

        assert_eq!(first, second);
        for (a, b) in first.points.iter().zip(&second.points) {
            assert_eq!(a.total.to_bits(), b.total.to_bits());
        }
    }

    #[test]
    fn test_open_and_undated_trades_never_appear() {
        let open = Trade::new("open", "SPY", Direction::Long, 100.0, 1.0, at(4, 1, 14))
            .with_strategy("Ghost");
        let mut undated = closed("undated", 100.0, 500.0, 1.0, "Ghost", at(4, 2, 15));
        undated.exit_date = None;
        let trades = vec![
            open,
            undated,
            closed("real", 100.0, 101.0, 1.0, "Real", at(4, 3, 15)),
        ];

        let series = aggregate(&trades);

        assert_eq!(series.points.len(), 1);
        assert_eq!(series.final_total(), 1.0);
        assert!(!series.strategies.contains(&"Ghost".to_string()));
        assert_eq!(series.diagnostics.included, 1);
        assert_eq!(series.diagnostics.excluded(), 2);
    }

    #[test]
    fn test_partial_exit_books_on_its_own_date() {
        let trade = Trade::new("p", "SPY", Direction::Long, 100.0, 10.0, at(5, 1, 14))
            .with_strategy("Scale")
            .with_partial_exit(PartialExit::new(104.0, at(5, 2, 15), 5.0))
            .with_exit(98.0, at(5, 6, 15));

        let series = aggregate(&[trade]);

        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].total, 20.0);
        assert_eq!(series.points[1].total, 10.0);
        assert_eq!(series.points[1].strategies["Scale"], 10.0);
    }

    #[test]
    fn test_empty_journal() {
        let series = aggregate(&[]);
        assert!(series.points.is_empty());
        assert_eq!(series.final_total(), 0.0);
    }
}
