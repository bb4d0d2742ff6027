use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use common::{
    AnalyticsConfig, CategoryAggregate, GrandTotal, MonthPerformanceData, MonthlyReport, Trade,
};

use super::category::Category;
use super::slices::collect_slices;

/// P&L and R a single trade contributed to one month
#[derive(Debug, Default)]
struct TradeContribution {
    profit_loss: f64,
    r_multiple: Option<f64>,
}

/// Buckets closed trades by exit month and by category
pub struct MonthlyAggregator {
    config: AnalyticsConfig,
}

impl MonthlyAggregator {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Build the monthly table for `categories`, columns in the given order
    pub fn aggregate(&self, trades: &[Trade], categories: &[Category]) -> MonthlyReport {
        let sliced = collect_slices(trades, &self.config);

        // first day of month -> trade index -> contribution
        let mut buckets: BTreeMap<NaiveDate, BTreeMap<usize, TradeContribution>> = BTreeMap::new();
        for slice in &sliced.slices {
            let month = first_of_month(slice.date);
            let contribution = buckets
                .entry(month)
                .or_default()
                .entry(slice.trade_index)
                .or_default();
            contribution.profit_loss += slice.profit_loss;
            if let Some(r) = slice.r_multiple {
                contribution.r_multiple = Some(contribution.r_multiple.unwrap_or(0.0) + r);
            }
        }

        let ids: Vec<String> = categories.iter().map(Category::id).collect();
        let mut grand_total = GrandTotal {
            categories: empty_cells(&ids),
            total: CategoryAggregate::default(),
        };

        let months: Vec<MonthPerformanceData> = buckets
            .into_iter()
            .map(|(month, contributions)| {
                let mut cells = empty_cells(&ids);
                let mut monthly_total = CategoryAggregate::default();

                for (trade_index, contribution) in &contributions {
                    let trade = &trades[*trade_index];
                    monthly_total.record(contribution.profit_loss, contribution.r_multiple);

                    for (category, id) in categories.iter().zip(&ids) {
                        if category.matches(trade) {
                            if let Some(cell) = cells.get_mut(id) {
                                cell.record(contribution.profit_loss, contribution.r_multiple);
                            }
                        }
                    }
                }

                for (id, cell) in &cells {
                    if let Some(total) = grand_total.categories.get_mut(id) {
                        total.merge(cell);
                    }
                }
                grand_total.total.merge(&monthly_total);

                MonthPerformanceData {
                    month: month.format("%Y-%m").to_string(),
                    label: month.format(&self.config.month_label_format).to_string(),
                    categories: cells,
                    monthly_total,
                }
            })
            .collect();

        log::debug!(
            "monthly report: {} months, {} categories, {} trades excluded",
            months.len(),
            categories.len(),
            sliced.diagnostics.excluded()
        );

        MonthlyReport {
            categories: categories.iter().map(Category::descriptor).collect(),
            months,
            grand_total,
            diagnostics: sliced.diagnostics,
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn empty_cells(ids: &[String]) -> BTreeMap<String, CategoryAggregate> {
    ids.iter()
        .map(|id| (id.clone(), CategoryAggregate::default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};
    use common::{Direction, PartialExit};

    use crate::aggregate::category::CategoryDimension;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 15, 0, 0).unwrap()
    }

    fn closed(id: &str, pnl: f64, exit_at: DateTime<Utc>) -> Trade {
        Trade::new(id, "QQQ", Direction::Long, 100.0, 1.0, exit_at - chrono::Duration::hours(1))
            .with_exit(100.0 + pnl, exit_at)
            .with_stops(98.0, 106.0)
    }

    fn report(trades: &[Trade], categories: &[Category]) -> MonthlyReport {
        MonthlyAggregator::new(&AnalyticsConfig::default()).aggregate(trades, categories)
    }

    #[test]
    fn test_only_active_months_are_emitted() {
        let trades = vec![
            closed("m1", 10.0, at(3, 4)),
            closed("m2", -4.0, at(3, 20)),
            closed("y1", 6.0, at(5, 2)),
        ];

        let report = report(&trades, &[]);

        assert_eq!(report.months.len(), 2);
        assert_eq!(report.months[0].month, "2024-03");
        assert_eq!(report.months[0].label, "March 2024");
        assert_eq!(report.months[1].month, "2024-05");

        let march = &report.months[0].monthly_total;
        assert_eq!(march.count, 2);
        assert_relative_eq!(march.total_dollar_value, 6.0);
        assert_relative_eq!(march.total_r, 3.0);

        let grand = &report.grand_total.total;
        assert_eq!(grand.count, 3);
        assert_relative_eq!(grand.total_dollar_value, 12.0);
        assert_relative_eq!(grand.total_r, 6.0);
    }

    #[test]
    fn test_every_category_cell_is_present() {
        let trades = vec![
            closed("a", 10.0, at(3, 4)).with_strategy("Breakout"),
            closed("b", -2.0, at(4, 4)).with_strategy("Reversal"),
        ];
        let categories = CategoryDimension::Strategy.categories_from_trades(&trades);

        let report = report(&trades, &categories);

        let march = &report.months[0];
        assert_eq!(march.categories.len(), 2);
        assert_eq!(march.categories["strategy:Breakout"].count, 1);
        assert!(march.categories["strategy:Reversal"].is_empty());
        assert_eq!(report.categories[0].label, "Breakout");
        assert_eq!(report.grand_total.categories["strategy:Reversal"].total_dollar_value, -2.0);
    }

    #[test]
    fn test_monthly_total_is_not_a_sum_of_cells() {
        let trades = vec![
            closed("both", 10.0, at(6, 3)).with_mistake("FOMO").with_mistake("Oversized"),
            closed("none", 5.0, at(6, 4)),
        ];
        let categories = vec![
            Category::Mistake("FOMO".into()),
            Category::Mistake("Oversized".into()),
        ];

        let report = report(&trades, &categories);
        let june = &report.months[0];

        assert_eq!(june.categories["mistake:FOMO"].total_dollar_value, 10.0);
        assert_eq!(june.categories["mistake:Oversized"].total_dollar_value, 10.0);
        assert_eq!(june.monthly_total.total_dollar_value, 15.0);
        assert_eq!(june.monthly_total.count, 2);
    }

    #[test]
    fn test_symbol_case_variants_share_one_column() {
        let mut lower = closed("lower", 5.0, at(9, 3));
        lower.symbol = "qqq".to_string();
        let trades = vec![closed("upper", 10.0, at(9, 2)), lower];
        let categories = CategoryDimension::Symbol.categories_from_trades(&trades);

        let report = report(&trades, &categories);
        let september = &report.months[0];

        assert_eq!(report.categories.len(), 1);
        assert_eq!(september.categories["symbol:QQQ"].count, 2);
        assert_eq!(september.categories["symbol:QQQ"].total_dollar_value, 15.0);
        assert_eq!(september.monthly_total.total_dollar_value, 15.0);
    }

    #[test]
    fn test_undefined_r_counts_as_zero() {
        let mut trade = closed("no-stop", 10.0, at(7, 1));
        trade.initial_stop_loss = None;
        trade.stop_loss = None;

        let report = report(&[trade], &[]);
        let total = &report.months[0].monthly_total;

        assert_eq!(total.count, 1);
        assert_eq!(total.total_dollar_value, 10.0);
        assert_eq!(total.total_r, 0.0);
    }

    #[test]
    fn test_excluded_trades_never_fill_cells() {
        let open = Trade::new("open", "QQQ", Direction::Long, 100.0, 1.0, at(8, 1))
            .with_strategy("Breakout");
        let mut undated = closed("undated", 50.0, at(8, 2)).with_strategy("Breakout");
        undated.exit_date = None;
        let categories = vec![Category::Strategy("Breakout".into())];

        let report = report(&[open, undated], &categories);

        assert!(report.months.is_empty());
        assert!(report.grand_total.categories["strategy:Breakout"].is_empty());
        assert_eq!(report.diagnostics.excluded(), 2);
    }

    #[test]
    fn test_partial_exit_across_months_counts_once_per_month() {
        let trade = Trade::new("p", "QQQ", Direction::Long, 100.0, 2.0, at(1, 30))
            .with_stops(95.0, 120.0)
            .with_partial_exit(PartialExit::new(110.0, at(1, 31), 1.0))
            .with_exit(90.0, at(2, 2));

        let report = report(&[trade], &[]);

        assert_eq!(report.months.len(), 2);
        assert_eq!(report.months[0].monthly_total.total_dollar_value, 10.0);
        assert_eq!(report.months[1].monthly_total.total_dollar_value, -10.0);
        assert_relative_eq!(report.months[0].monthly_total.total_r, 1.0);
        assert_relative_eq!(report.months[1].monthly_total.total_r, -1.0);
        assert_eq!(report.grand_total.total.count, 2);
        assert_eq!(report.grand_total.total.total_dollar_value, 0.0);
    }
}
