use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use common::{ContractDetails, Direction, JournalError, Result, Trade, TradeStatus};

/// Load trades from a CSV file
pub fn load_csv(path: &Path) -> Result<Vec<Trade>> {
    let file = File::open(path).map_err(|e| JournalError::DataLoadError(e.to_string()))?;
    read_csv(BufReader::new(file))
}

/// Read trades from CSV with a header row.
///
/// Columns are matched by header name. Rows without a usable symbol,
/// direction, quantity or entry date are skipped with a warning. Any other
/// value that does not parse is left empty so the trade still loads.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Trade>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: HashMap<String, usize> = csv_reader
        .headers()
        .map_err(|e| JournalError::CsvError(e.to_string()))?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect();

    let mut trades = Vec::new();

    for (row, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| JournalError::CsvError(e.to_string()))?;
        let field = |name: &str| column(&columns, &record, name);
        let line = row + 2;

        let id = field("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{}", line));

        let symbol = match field("symbol") {
            Some(s) => s.to_string(),
            None => {
                log::warn!("line {}: missing symbol, row skipped", line);
                continue;
            }
        };
        let direction = match field("direction").and_then(parse_direction) {
            Some(d) => d,
            None => {
                log::warn!("line {}: missing or unknown direction, row skipped", line);
                continue;
            }
        };
        let quantity = match number(field("quantity"), line, "quantity") {
            Some(q) => q,
            None => {
                log::warn!("line {}: missing quantity, row skipped", line);
                continue;
            }
        };
        let entry_date = match field("entry_date").map(parse_timestamp) {
            Some(Ok(ts)) => ts,
            _ => {
                log::warn!("line {}: missing or invalid entry date, row skipped", line);
                continue;
            }
        };

        let exit_date = match field("exit_date").map(parse_timestamp) {
            Some(Ok(ts)) => Some(ts),
            Some(Err(e)) => {
                log::warn!("line {}: {}", line, e);
                None
            }
            None => None,
        };
        let exit_price = number(field("exit_price"), line, "exit_price");

        let status = match field("status").map(|s| s.to_lowercase()) {
            Some(s) if s == "closed" => TradeStatus::Closed,
            Some(s) if s == "open" => TradeStatus::Open,
            _ if exit_price.is_some() || exit_date.is_some() => TradeStatus::Closed,
            _ => TradeStatus::Open,
        };

        let contract = match (
            number(field("tick_size"), line, "tick_size"),
            number(field("tick_value"), line, "tick_value"),
        ) {
            (Some(tick_size), Some(tick_value)) => Some(ContractDetails {
                tick_size,
                tick_value,
                contract_size: number(field("contract_size"), line, "contract_size"),
            }),
            _ => None,
        };

        trades.push(Trade {
            id,
            symbol,
            direction,
            entry_price: number(field("entry_price"), line, "entry_price"),
            exit_price,
            quantity,
            entry_date,
            exit_date,
            status,
            fees: number(field("fees"), line, "fees").unwrap_or(0.0),
            stop_loss: number(field("stop_loss"), line, "stop_loss"),
            take_profit: number(field("take_profit"), line, "take_profit"),
            initial_stop_loss: number(field("initial_stop_loss"), line, "initial_stop_loss"),
            strategy: field("strategy").map(str::to_string),
            account: field("account").map(str::to_string),
            timeframe: field("timeframe").map(str::to_string),
            tags: list(field("tags")),
            mistakes: list(field("mistakes")),
            partial_exits: Vec::new(),
            contract,
            notes: field("notes").unwrap_or_default().to_string(),
        });
    }

    Ok(trades)
}

/// Load trades from a JSON array
pub fn load_json(path: &Path) -> Result<Vec<Trade>> {
    let file = File::open(path).map_err(|e| JournalError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let trades: Vec<Trade> = serde_json::from_reader(reader)?;
    Ok(trades)
}

fn column<'r>(
    columns: &HashMap<String, usize>,
    record: &'r csv::StringRecord,
    name: &str,
) -> Option<&'r str> {
    columns
        .get(name)
        .and_then(|&i| record.get(i))
        .filter(|v| !v.is_empty())
}

/// Lenient numeric field: a value that does not parse is logged and dropped
fn number(value: Option<&str>, line: usize, name: &str) -> Option<f64> {
    let raw = value?;
    match raw.replace(',', "").trim_start_matches('$').parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            log::warn!("line {}: {} is not a number: {:?}", line, name, raw);
            None
        }
    }
}

fn list(value: Option<&str>) -> BTreeSet<String> {
    value
        .map(|v| {
            v.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_direction(s: &str) -> Option<Direction> {
    match s.to_lowercase().as_str() {
        "long" | "buy" => Some(Direction::Long),
        "short" | "sell" => Some(Direction::Short),
        _ => None,
    }
}

/// Parse timestamp from various formats
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    // Try ISO 8601 format first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    for fmt in &["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
        }
    }

    // Try Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(JournalError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const SAMPLE: &str = "\
id,symbol,direction,entry_price,exit_price,quantity,entry_date,exit_date,status,fees,initial_stop_loss,take_profit,strategy,tags,mistakes,tick_size,tick_value
a1,AAPL,long,100,110,10,2024-01-05 09:30:00,2024-01-05T15:00:00Z,closed,1.5,95,120,Breakout,earnings;gap,,,
a2,ES,short,4000,3990,2,2024-01-08,2024-01-09,,4.2,,,Reversal,,FOMO,0.25,12.5
a3,TSLA,long,abc,,3,2024-01-10,,open,,,,,,,,
a4,NVDA,sideways,10,11,1,2024-01-10,2024-01-11,closed,,,,,,,,
a5,MSFT,long,300,305,1,2024-01-10,not-a-date,closed,,,,,,,,
";

    #[test]
    fn test_read_csv() {
        let trades = read_csv(SAMPLE.as_bytes()).unwrap();

        // a4 has no usable direction
        assert_eq!(trades.len(), 4);

        let a1 = &trades[0];
        assert_eq!(a1.status, TradeStatus::Closed);
        assert_eq!(a1.fees, 1.5);
        assert_eq!(a1.initial_stop_loss, Some(95.0));
        assert_eq!(a1.strategy.as_deref(), Some("Breakout"));
        assert!(a1.tags.contains("gap"));
        assert!(a1.mistakes.is_empty());
        assert!(a1.contract.is_none());

        let a2 = &trades[1];
        assert_eq!(a2.direction, Direction::Short);
        assert_eq!(a2.status, TradeStatus::Closed);
        assert_eq!(a2.contract.as_ref().unwrap().multiplier(), Some(50.0));
        assert!(a2.mistakes.contains("FOMO"));

        let a3 = &trades[2];
        assert_eq!(a3.entry_price, None);
        assert_eq!(a3.status, TradeStatus::Open);

        let a5 = &trades[3];
        assert!(a5.is_closed());
        assert_eq!(a5.exit_date, None);
    }

    #[test]
    fn test_parse_timestamp_iso() {
        let ts = parse_timestamp("2024-01-15T09:30:00Z").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 1);
        assert_eq!(ts.day(), 15);
    }

    #[test]
    fn test_parse_timestamp_common() {
        let ts = parse_timestamp("2024-01-15 09:30:00").unwrap();
        assert_eq!(ts.hour(), 9);
    }

    #[test]
    fn test_parse_timestamp_date_only() {
        let ts = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(ts.day(), 15);
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn test_parse_timestamp_unix() {
        let ts = parse_timestamp("1705312200").unwrap();
        assert!(ts.year() >= 2024);
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
