pub mod aggregate;
pub mod data;
pub mod format;
pub mod metrics;
pub mod report;
pub mod store;
pub mod summary;

pub use aggregate::{
    CalendarAggregator, Category, CategoryDimension, CumulativeAggregator, MonthlyAggregator,
};
pub use data::{generate_synthetic_trades, load_file};
pub use format::Formatter;
pub use metrics::MetricsCalculator;
pub use report::{JournalReport, ReportKind, ReportRequest};
pub use store::{InMemoryTradeStore, JsonFileStore, TradeRepository};
pub use summary::SummaryCalculator;

// Re-export common types
pub use common::{
    AggregationDiagnostics, AnalyticsConfig, CalendarDay, CategoryAggregate, ChartDataPoint,
    CumulativeSeries, Direction, JournalError, JournalSummary, MonthPerformanceData,
    MonthlyReport, PartialExit, Result, Trade, TradeMetrics, TradeStatus,
};
