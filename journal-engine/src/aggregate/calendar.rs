use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use common::{AnalyticsConfig, CalendarDay, JournalError, Result, Trade};

use super::slices::collect_slices;

/// Realized P&L per calendar day
pub struct CalendarAggregator {
    config: AnalyticsConfig,
}

impl CalendarAggregator {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Days with at least one exit, ascending. `month` (`YYYY-MM`) limits the
    /// output to one month.
    pub fn aggregate(&self, trades: &[Trade], month: Option<&str>) -> Result<Vec<CalendarDay>> {
        let month = month.map(parse_month).transpose()?;
        let sliced = collect_slices(trades, &self.config);

        // date -> trade index -> P&L booked that day
        let mut days: BTreeMap<NaiveDate, BTreeMap<usize, f64>> = BTreeMap::new();
        for slice in &sliced.slices {
            if let Some(first) = month {
                if !same_month(slice.date, first) {
                    continue;
                }
            }
            *days
                .entry(slice.date)
                .or_default()
                .entry(slice.trade_index)
                .or_insert(0.0) += slice.profit_loss;
        }

        Ok(days
            .into_iter()
            .map(|(date, per_trade)| CalendarDay {
                date,
                profit_loss: per_trade.values().sum(),
                trade_count: per_trade.len() as u32,
                winners: per_trade.values().filter(|&&pnl| pnl > 0.0).count() as u32,
                losers: per_trade.values().filter(|&&pnl| pnl < 0.0).count() as u32,
            })
            .collect())
    }
}

/// Parse `YYYY-MM` into the first day of that month
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| JournalError::InvalidParameter(format!("invalid month: {}", month)))
}

fn same_month(date: NaiveDate, first: NaiveDate) -> bool {
    date.year() == first.year() && date.month() == first.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use common::{Direction, PartialExit};

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 15, 0, 0).unwrap()
    }

    fn closed(id: &str, pnl: f64, exit_at: DateTime<Utc>) -> Trade {
        Trade::new(id, "IWM", Direction::Long, 100.0, 1.0, exit_at - chrono::Duration::hours(1))
            .with_exit(100.0 + pnl, exit_at)
    }

    #[test]
    fn test_days_group_trades() {
        let trades = vec![
            closed("a", 10.0, at(3, 4)),
            closed("b", -3.0, at(3, 4)),
            closed("c", 2.0, at(3, 7)),
        ];

        let days = CalendarAggregator::new(&AnalyticsConfig::default())
            .aggregate(&trades, None)
            .unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].profit_loss, 7.0);
        assert_eq!(days[0].trade_count, 2);
        assert_eq!(days[0].winners, 1);
        assert_eq!(days[0].losers, 1);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
    }

    #[test]
    fn test_month_filter() {
        let trades = vec![closed("a", 10.0, at(3, 4)), closed("b", 5.0, at(4, 1))];

        let days = CalendarAggregator::new(&AnalyticsConfig::default())
            .aggregate(&trades, Some("2024-04"))
            .unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].profit_loss, 5.0);
    }

    #[test]
    fn test_partial_and_final_exit_same_day_count_once() {
        let trade = Trade::new("p", "IWM", Direction::Short, 100.0, 2.0, at(3, 4))
            .with_partial_exit(PartialExit::new(95.0, at(3, 5), 1.0))
            .with_exit(97.0, at(3, 5));

        let days = CalendarAggregator::new(&AnalyticsConfig::default())
            .aggregate(&[trade], None)
            .unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].trade_count, 1);
        assert_eq!(days[0].profit_loss, 8.0);
    }

    #[test]
    fn test_invalid_month() {
        let result = CalendarAggregator::new(&AnalyticsConfig::default()).aggregate(&[], Some("2024-13"));
        assert!(result.is_err());
    }
}
