use std::str::FromStr;

use common::{
    AnalyticsConfig, CalendarDay, CumulativeSeries, JournalError, JournalSummary, MonthlyReport,
    Result, Trade, TradeMetrics,
};
use serde::Serialize;

use crate::aggregate::{CalendarAggregator, CategoryDimension, CumulativeAggregator, MonthlyAggregator};
use crate::metrics::MetricsCalculator;
use crate::summary::SummaryCalculator;

/// Which analytics to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary,
    Cumulative,
    Monthly,
    Calendar,
    Metrics,
    All,
}

impl ReportKind {
    fn includes(self, other: ReportKind) -> bool {
        self == ReportKind::All || self == other
    }
}

impl FromStr for ReportKind {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(ReportKind::Summary),
            "cumulative" => Ok(ReportKind::Cumulative),
            "monthly" => Ok(ReportKind::Monthly),
            "calendar" => Ok(ReportKind::Calendar),
            "metrics" => Ok(ReportKind::Metrics),
            "all" => Ok(ReportKind::All),
            other => Err(JournalError::InvalidParameter(format!(
                "unknown report: {}",
                other
            ))),
        }
    }
}

/// Parameters of one analytics request
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub dimension: CategoryDimension,
    /// `YYYY-MM` filter for the calendar
    pub month: Option<String>,
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            kind: ReportKind::All,
            dimension: CategoryDimension::Strategy,
            month: None,
        }
    }
}

/// Analytics computed from one snapshot of the journal
#[derive(Debug, Clone, Serialize)]
pub struct JournalReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JournalSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative: Option<CumulativeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly: Option<MonthlyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Vec<CalendarDay>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<TradeMetrics>>,
}

impl JournalReport {
    /// Recompute every requested aggregate from `trades`
    pub fn build(
        trades: &[Trade],
        config: &AnalyticsConfig,
        request: &ReportRequest,
    ) -> Result<Self> {
        let kind = request.kind;

        let cumulative = if kind.includes(ReportKind::Cumulative) || kind.includes(ReportKind::Summary) {
            Some(CumulativeAggregator::new(config).aggregate(trades))
        } else {
            None
        };

        let summary = match (&cumulative, kind.includes(ReportKind::Summary)) {
            (Some(series), true) => Some(SummaryCalculator::calculate_with_series(trades, series)),
            _ => None,
        };

        let monthly = if kind.includes(ReportKind::Monthly) {
            let categories = request.dimension.categories_from_trades(trades);
            Some(MonthlyAggregator::new(config).aggregate(trades, &categories))
        } else {
            None
        };

        let calendar = if kind.includes(ReportKind::Calendar) {
            Some(CalendarAggregator::new(config).aggregate(trades, request.month.as_deref())?)
        } else {
            None
        };

        let metrics = if kind.includes(ReportKind::Metrics) {
            Some(MetricsCalculator::calculate_batch(trades))
        } else {
            None
        };

        Ok(Self {
            summary,
            cumulative: cumulative.filter(|_| kind.includes(ReportKind::Cumulative)),
            monthly,
            calendar,
            metrics,
        })
    }

    /// Trades left out of the date-keyed aggregates
    pub fn excluded_trades(&self) -> usize {
        self.cumulative
            .as_ref()
            .map(|c| c.diagnostics.excluded())
            .or_else(|| self.monthly.as_ref().map(|m| m.diagnostics.excluded()))
            .unwrap_or(0)
    }
}
