pub mod calendar;
pub mod category;
pub mod cumulative;
pub mod monthly;
pub mod slices;

pub use calendar::{parse_month, CalendarAggregator};
pub use category::{Category, CategoryDimension};
pub use cumulative::CumulativeAggregator;
pub use monthly::MonthlyAggregator;
pub use slices::{collect_slices, ExitSlice, SlicedTrades};
