use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use common::{AggregationDiagnostics, AnalyticsConfig, JournalError, Result, Trade, TradeMetrics};

use crate::metrics::MetricsCalculator;

/// Realized P&L booked on one exit date.
///
/// A closed trade expands into one slice per partial exit plus one for the
/// final exit of the remaining quantity.
#[derive(Debug, Clone)]
pub struct ExitSlice<'a> {
    pub trade: &'a Trade,
    /// Position of the trade in the input collection
    pub trade_index: usize,
    pub exit_time: DateTime<Utc>,
    /// Calendar date of the exit in the configured offset
    pub date: NaiveDate,
    pub profit_loss: f64,
    pub r_multiple: Option<f64>,
}

/// Dated slices of every usable trade, ordered by exit time
#[derive(Debug, Clone, Default)]
pub struct SlicedTrades<'a> {
    pub slices: Vec<ExitSlice<'a>>,
    pub diagnostics: AggregationDiagnostics,
}

/// Expand the closed trades into exit slices.
///
/// Open trades, trades without an exit date and trades whose P&L cannot be
/// computed are skipped and counted in the diagnostics. The sort is stable,
/// so slices sharing an exit time keep input order.
pub fn collect_slices<'a>(trades: &'a [Trade], config: &AnalyticsConfig) -> SlicedTrades<'a> {
    let offset = calendar_offset(config);
    let mut diagnostics = AggregationDiagnostics::default();
    let mut slices = Vec::with_capacity(trades.len());

    for (trade_index, trade) in trades.iter().enumerate() {
        if !trade.is_closed() {
            diagnostics.excluded_open += 1;
            continue;
        }
        let exit_time = match resolve_exit_date(trade) {
            Ok(date) => date,
            Err(e) => {
                log::debug!("{}, left out of aggregates", e);
                diagnostics.excluded_unresolvable_date += 1;
                continue;
            }
        };

        let metrics = MetricsCalculator::calculate(trade);
        let profit_loss = match metrics.profit_loss {
            Some(pnl) => pnl,
            None => {
                log::debug!("trade {}: P&L undefined, left out of aggregates", trade.id);
                diagnostics.excluded_invalid += 1;
                continue;
            }
        };
        diagnostics.included += 1;

        if !config.split_partial_exits || trade.partial_exits.is_empty() {
            slices.push(ExitSlice {
                trade,
                trade_index,
                exit_time,
                date: calendar_date(exit_time, offset),
                profit_loss,
                r_multiple: metrics.r_multiple,
            });
            continue;
        }

        // Entry and multiplier are known good once P&L is defined
        let entry = trade.entry_price.unwrap_or_default();
        let multiplier = metrics.contract_multiplier;
        let exit_price = trade.exit_price.unwrap_or_default();

        for partial in &trade.partial_exits {
            let pnl = MetricsCalculator::slice_profit_loss(
                trade.direction,
                entry,
                partial.exit_price,
                partial.quantity,
                multiplier,
                partial.fees,
            );
            slices.push(ExitSlice {
                trade,
                trade_index,
                exit_time: partial.exit_date,
                date: calendar_date(partial.exit_date, offset),
                profit_loss: pnl,
                r_multiple: slice_r_multiple(trade, &metrics, pnl),
            });
        }

        let pnl = MetricsCalculator::slice_profit_loss(
            trade.direction,
            entry,
            exit_price,
            trade.remaining_quantity(),
            multiplier,
            trade.fees,
        );
        slices.push(ExitSlice {
            trade,
            trade_index,
            exit_time,
            date: calendar_date(exit_time, offset),
            profit_loss: pnl,
            r_multiple: slice_r_multiple(trade, &metrics, pnl),
        });
    }

    slices.sort_by_key(|s| s.exit_time);

    SlicedTrades {
        slices,
        diagnostics,
    }
}

/// Final exit date used to place a closed trade on the timeline
pub fn resolve_exit_date(trade: &Trade) -> Result<DateTime<Utc>> {
    trade.exit_date.ok_or_else(|| JournalError::UnresolvableDate {
        trade_id: trade.id.clone(),
    })
}

/// Share of the trade's R-multiple carried by one slice; slices of a trade
/// sum to the trade's R
fn slice_r_multiple(trade: &Trade, metrics: &TradeMetrics, profit_loss: f64) -> Option<f64> {
    metrics.r_multiple?;
    let risk = metrics.risk_distance?;
    let denominator = risk * trade.quantity * metrics.contract_multiplier;
    if denominator > 0.0 {
        Some(profit_loss / denominator)
    } else {
        None
    }
}

pub fn calendar_offset(config: &AnalyticsConfig) -> FixedOffset {
    config.utc_offset().unwrap_or_else(|| Utc.fix())
}

pub fn calendar_date(time: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    time.with_timezone(&offset).date_naive()
}

/// Milliseconds since the epoch at the start of `date` in `offset`
pub fn day_start_millis(date: NaiveDate, offset: FixedOffset) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    midnight - i64::from(offset.local_minus_utc()) * 1000
}
