use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};

/// Tolerance used when comparing exited quantity against trade quantity
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Trade status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Contract specification for derivatives (futures)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDetails {
    pub tick_size: f64,
    pub tick_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_size: Option<f64>,
}

impl ContractDetails {
    pub fn new(tick_size: f64, tick_value: f64) -> Self {
        Self {
            tick_size,
            tick_value,
            contract_size: None,
        }
    }

    /// Currency value of a one point move per contract, `None` when the tick
    /// definition cannot produce one
    pub fn multiplier(&self) -> Option<f64> {
        if !self.tick_size.is_finite() || !self.tick_value.is_finite() || self.tick_size <= 0.0 {
            return None;
        }
        Some(self.tick_value / self.tick_size)
    }
}

/// A slice of a trade closed before the final exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialExit {
    pub exit_price: f64,
    pub exit_date: DateTime<Utc>,
    pub quantity: f64,
    #[serde(default)]
    pub fees: f64,
}

impl PartialExit {
    pub fn new(exit_price: f64, exit_date: DateTime<Utc>, quantity: f64) -> Self {
        Self {
            exit_price,
            exit_date,
            quantity,
            fees: 0.0,
        }
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = fees;
        self
    }
}

/// Journal trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub entry_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<DateTime<Utc>>,
    pub status: TradeStatus,
    #[serde(default)]
    pub fees: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub mistakes: BTreeSet<String>,
    #[serde(default)]
    pub partial_exits: Vec<PartialExit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractDetails>,
    #[serde(default)]
    pub notes: String,
}

impl Trade {
    /// New open trade
    pub fn new(
        id: &str,
        symbol: &str,
        direction: Direction,
        entry_price: f64,
        quantity: f64,
        entry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
            direction,
            entry_price: Some(entry_price),
            exit_price: None,
            quantity,
            entry_date,
            exit_date: None,
            status: TradeStatus::Open,
            fees: 0.0,
            stop_loss: None,
            take_profit: None,
            initial_stop_loss: None,
            strategy: None,
            account: None,
            timeframe: None,
            tags: BTreeSet::new(),
            mistakes: BTreeSet::new(),
            partial_exits: Vec::new(),
            contract: None,
            notes: String::new(),
        }
    }

    pub fn with_exit(mut self, exit_price: f64, exit_date: DateTime<Utc>) -> Self {
        self.exit_price = Some(exit_price);
        self.exit_date = Some(exit_date);
        self.status = TradeStatus::Closed;
        self
    }

    pub fn with_partial_exit(mut self, partial: PartialExit) -> Self {
        self.partial_exits.push(partial);
        self
    }

    pub fn with_stops(mut self, initial_stop_loss: f64, take_profit: f64) -> Self {
        self.initial_stop_loss = Some(initial_stop_loss);
        self.stop_loss = Some(initial_stop_loss);
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_strategy(mut self, strategy: &str) -> Self {
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn with_account(mut self, account: &str) -> Self {
        self.account = Some(account.to_string());
        self
    }

    pub fn with_timeframe(mut self, timeframe: &str) -> Self {
        self.timeframe = Some(timeframe.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn with_mistake(mut self, mistake: &str) -> Self {
        self.mistakes.insert(mistake.to_string());
        self
    }

    pub fn with_contract(mut self, contract: ContractDetails) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Strategy name, ignoring blank entries
    pub fn strategy_name(&self) -> Option<&str> {
        self.strategy
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Quantity already taken off through partial exits
    pub fn partial_quantity(&self) -> f64 {
        self.partial_exits.iter().map(|p| p.quantity).sum()
    }

    /// Quantity left for the final exit
    pub fn remaining_quantity(&self) -> f64 {
        (self.quantity - self.partial_quantity()).max(0.0)
    }

    /// Whole days between entry and final exit, `None` while open
    pub fn holding_days(&self) -> Option<i64> {
        self.exit_date.map(|exit| (exit - self.entry_date).num_days())
    }

    /// Check the structural invariants of a trade record
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(JournalError::invalid_trade(&self.id, "id must not be empty"));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(JournalError::invalid_trade(
                &self.id,
                format!("quantity must be positive, got {}", self.quantity),
            ));
        }

        for partial in &self.partial_exits {
            if !partial.quantity.is_finite() || partial.quantity <= 0.0 {
                return Err(JournalError::invalid_trade(
                    &self.id,
                    "partial exit quantity must be positive",
                ));
            }
            if !partial.exit_price.is_finite() {
                return Err(JournalError::invalid_trade(
                    &self.id,
                    "partial exit price must be a number",
                ));
            }
        }

        let exited = self.partial_quantity();
        if exited > self.quantity + QUANTITY_EPSILON {
            return Err(JournalError::invalid_trade(
                &self.id,
                format!(
                    "partial exits total {} exceeds quantity {}",
                    exited, self.quantity
                ),
            ));
        }

        match self.status {
            TradeStatus::Closed => {
                if self.exit_date.is_none() {
                    return Err(JournalError::invalid_trade(
                        &self.id,
                        "closed trade requires an exit date",
                    ));
                }
                match self.exit_price {
                    Some(price) if price.is_finite() => {}
                    _ => {
                        return Err(JournalError::invalid_trade(
                            &self.id,
                            "closed trade requires an exit price",
                        ))
                    }
                }
            }
            TradeStatus::Open => {
                if self.exit_date.is_some() || self.exit_price.is_some() {
                    return Err(JournalError::invalid_trade(
                        &self.id,
                        "open trade must not carry an exit",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// A field that could not be used while computing trade metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsIssue {
    pub field: String,
    pub reason: String,
}

/// Derived per-trade financial metrics, `None` means undefined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeMetrics {
    pub trade_id: String,
    pub profit_loss: Option<f64>,
    pub r_multiple: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub risk_distance: Option<f64>,
    pub reward_distance: Option<f64>,
    pub contract_multiplier: f64,
    /// Set for open trades; values are not final
    pub provisional: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<MetricsIssue>,
}

impl TradeMetrics {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Why trades were left out of a date-keyed aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationDiagnostics {
    pub included: usize,
    pub excluded_open: usize,
    pub excluded_unresolvable_date: usize,
    pub excluded_invalid: usize,
}

impl AggregationDiagnostics {
    pub fn excluded(&self) -> usize {
        self.excluded_open + self.excluded_unresolvable_date + self.excluded_invalid
    }
}

/// One point of the cumulative P&L chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub date: NaiveDate,
    pub label: String,
    /// Start of the calendar day in milliseconds since the epoch
    pub timestamp: i64,
    pub total: f64,
    pub strategies: BTreeMap<String, f64>,
}

/// Cumulative P&L series with the strategies it tracks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeSeries {
    pub points: Vec<ChartDataPoint>,
    /// Strategy names in first-seen order
    pub strategies: Vec<String>,
    pub diagnostics: AggregationDiagnostics,
}

impl CumulativeSeries {
    pub fn final_total(&self) -> f64 {
        self.points.last().map(|p| p.total).unwrap_or(0.0)
    }
}

/// Aggregate of one monthly table cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub total_dollar_value: f64,
    pub total_r: f64,
    pub count: u32,
}

impl CategoryAggregate {
    pub fn record(&mut self, profit_loss: f64, r_multiple: Option<f64>) {
        self.total_dollar_value += profit_loss;
        self.total_r += r_multiple.unwrap_or(0.0);
        self.count += 1;
    }

    pub fn merge(&mut self, other: &CategoryAggregate) {
        self.total_dollar_value += other.total_dollar_value;
        self.total_r += other.total_r;
        self.count += other.count;
    }

    /// Cell with no trades ("no data")
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Id and display label of a monthly report column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub id: String,
    pub label: String,
}

/// One row of the monthly performance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPerformanceData {
    /// `YYYY-MM`
    pub month: String,
    pub label: String,
    pub categories: BTreeMap<String, CategoryAggregate>,
    pub monthly_total: CategoryAggregate,
}

/// Grand-total row of the monthly performance table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrandTotal {
    pub categories: BTreeMap<String, CategoryAggregate>,
    pub total: CategoryAggregate,
}

/// Monthly performance table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub categories: Vec<CategoryDescriptor>,
    pub months: Vec<MonthPerformanceData>,
    pub grand_total: GrandTotal,
    pub diagnostics: AggregationDiagnostics,
}

/// Realized P&L of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub profit_loss: f64,
    pub trade_count: u32,
    pub winners: u32,
    pub losers: u32,
}

/// Headline journal statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
    pub total_trades: u32,
    pub open_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub break_even_trades: u32,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: Option<f64>,
    pub expectancy: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_r_multiple: Option<f64>,
    pub avg_holding_days: f64,
    pub max_drawdown: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_closed_trade_validates() {
        let trade = Trade::new("t1", "AAPL", Direction::Long, 100.0, 10.0, day(1))
            .with_partial_exit(PartialExit::new(105.0, day(2), 4.0))
            .with_exit(110.0, day(3));

        assert!(trade.validate().is_ok());
        assert_eq!(trade.remaining_quantity(), 6.0);
        assert_eq!(trade.holding_days(), Some(2));
    }

    #[test]
    fn test_closed_trade_requires_exit_price() {
        let mut trade = Trade::new("t1", "AAPL", Direction::Long, 100.0, 10.0, day(1))
            .with_exit(110.0, day(3));
        trade.exit_price = None;

        assert!(matches!(
            trade.validate(),
            Err(JournalError::InvalidTrade { .. })
        ));
    }

    #[test]
    fn test_open_trade_rejects_exit_date() {
        let mut trade = Trade::new("t1", "AAPL", Direction::Long, 100.0, 10.0, day(1));
        trade.exit_date = Some(day(2));

        assert!(trade.validate().is_err());
    }

    #[test]
    fn test_partial_exits_cannot_exceed_quantity() {
        let trade = Trade::new("t1", "ES", Direction::Short, 4000.0, 2.0, day(1))
            .with_partial_exit(PartialExit::new(3990.0, day(2), 1.5))
            .with_partial_exit(PartialExit::new(3980.0, day(3), 1.0));

        assert!(trade.validate().is_err());
    }

    #[test]
    fn test_contract_multiplier() {
        assert_eq!(ContractDetails::new(0.25, 12.5).multiplier(), Some(50.0));
        assert_eq!(ContractDetails::new(0.0, 12.5).multiplier(), None);
    }

    #[test]
    fn test_trade_json_uses_lowercase_enums() {
        let trade = Trade::new("t1", "AAPL", Direction::Short, 100.0, 1.0, day(1));
        let json = serde_json::to_string(&trade).unwrap();

        assert!(json.contains("\"direction\":\"short\""));
        assert!(json.contains("\"status\":\"open\""));

        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trade);
    }
}
