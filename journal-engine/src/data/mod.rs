//! Journal import: broker or spreadsheet exports (CSV), journal backups
//! (JSON array of trades) and a synthetic journal for demos.

pub mod loader;
pub mod synthetic;

pub use loader::{load_csv, load_json, parse_timestamp, read_csv};
pub use synthetic::generate_synthetic_trades;

use std::path::Path;

use common::{JournalError, Result, Trade};

/// Import a journal export, picking the reader from the file extension.
///
/// Records are returned as read; store insertion validates them.
pub fn load_file(path: &Path) -> Result<Vec<Trade>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let trades = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        _ => {
            return Err(JournalError::DataLoadError(format!(
                "{}: unsupported journal export (expected .csv or .json)",
                path.display()
            )))
        }
    };

    log::debug!("read {} trades from {}", trades.len(), path.display());
    Ok(trades)
}
