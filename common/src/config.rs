use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};

/// Analytics and presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    // === Calendar ===
    /// Offset from UTC used to derive the calendar date of an exit
    pub utc_offset_minutes: i32,
    /// chrono format for chart point labels
    pub date_label_format: String,
    /// chrono format for monthly row labels
    pub month_label_format: String,

    // === Aggregation ===
    /// Book each partial exit on its own date; otherwise the whole trade
    /// lands on the final exit date
    pub split_partial_exits: bool,

    // === Display ===
    pub currency_symbol: String,
    pub currency_decimals: usize,
    pub ratio_decimals: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            date_label_format: "%b %-d, %Y".to_string(),
            month_label_format: "%B %Y".to_string(),
            split_partial_exits: true,
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            ratio_decimals: 2,
        }
    }
}

impl AnalyticsConfig {
    /// Load settings from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            JournalError::DataLoadError(format!("{}: {}", path.display(), e))
        })?;
        let config: AnalyticsConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.utc_offset().is_none() {
            return Err(JournalError::InvalidParameter(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Fixed offset for calendar bucketing, `None` if out of range
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_split_partial_exits(mut self, split: bool) -> Self {
        self.split_partial_exits = split;
        self
    }

    pub fn with_currency(mut self, symbol: &str, decimals: usize) -> Self {
        self.currency_symbol = symbol.to_string();
        self.currency_decimals = decimals;
        self
    }

    pub fn with_ratio_decimals(mut self, decimals: usize) -> Self {
        self.ratio_decimals = decimals;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalyticsConfig =
            serde_json::from_str(r#"{"utc_offset_minutes": -300}"#).unwrap();

        assert_eq!(config.utc_offset_minutes, -300);
        assert!(config.split_partial_exits);
        assert_eq!(config.currency_symbol, "$");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_offset_out_of_range() {
        let config = AnalyticsConfig::default().with_utc_offset_minutes(24 * 60);
        assert!(config.utc_offset().is_none());
        assert!(config.validate().is_err());
    }
}
