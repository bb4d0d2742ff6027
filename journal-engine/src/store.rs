use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use common::{JournalError, PartialExit, Result, Trade, TradeStatus, QUANTITY_EPSILON};

/// Owner of the trade collection. Analytics never touch the store; they
/// receive the snapshot returned by [`list`](TradeRepository::list).
pub trait TradeRepository {
    /// All trades in insertion order
    fn list(&self) -> Vec<Trade>;

    fn get(&self, id: &str) -> Option<Trade>;

    fn insert(&mut self, trade: Trade) -> Result<()>;

    /// Replace the stored trade with the same id
    fn update(&mut self, trade: Trade) -> Result<()>;

    fn delete(&mut self, id: &str) -> Result<Trade>;

    /// Record a partial exit on an open trade
    fn add_partial_exit(&mut self, id: &str, partial: PartialExit) -> Result<Trade> {
        let mut trade = self
            .get(id)
            .ok_or_else(|| JournalError::TradeNotFound(id.to_string()))?;

        if trade.is_closed() {
            return Err(JournalError::invalid_trade(id, "trade is already closed"));
        }
        if partial.quantity > trade.remaining_quantity() + QUANTITY_EPSILON {
            return Err(JournalError::invalid_trade(
                id,
                format!(
                    "partial exit of {} exceeds remaining quantity {}",
                    partial.quantity,
                    trade.remaining_quantity()
                ),
            ));
        }
        if partial.exit_date < trade.entry_date {
            return Err(JournalError::invalid_trade(id, "exit precedes entry"));
        }

        trade.partial_exits.push(partial);
        self.update(trade.clone())?;
        Ok(trade)
    }

    /// Close the remaining quantity of an open trade
    fn close_trade(
        &mut self,
        id: &str,
        exit_price: f64,
        exit_date: DateTime<Utc>,
        fees: f64,
    ) -> Result<Trade> {
        let mut trade = self
            .get(id)
            .ok_or_else(|| JournalError::TradeNotFound(id.to_string()))?;

        if trade.is_closed() {
            return Err(JournalError::invalid_trade(id, "trade is already closed"));
        }
        if exit_date < trade.entry_date {
            return Err(JournalError::invalid_trade(id, "exit precedes entry"));
        }

        trade.exit_price = Some(exit_price);
        trade.exit_date = Some(exit_date);
        trade.fees += fees;
        trade.status = TradeStatus::Closed;

        self.update(trade.clone())?;
        Ok(trade)
    }
}

/// Trade store held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryTradeStore {
    trades: Vec<Trade>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records, validating each one
    pub fn from_trades(trades: Vec<Trade>) -> Result<Self> {
        let mut store = Self::new();
        for trade in trades {
            store.insert(trade)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Borrowed view of the trades, for analytics without a copy
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.trades.iter().position(|t| t.id == id)
    }
}

impl TradeRepository for InMemoryTradeStore {
    fn list(&self) -> Vec<Trade> {
        self.trades.clone()
    }

    fn get(&self, id: &str) -> Option<Trade> {
        self.position(id).map(|i| self.trades[i].clone())
    }

    fn insert(&mut self, trade: Trade) -> Result<()> {
        trade.validate()?;
        if self.position(&trade.id).is_some() {
            return Err(JournalError::DuplicateTradeId(trade.id));
        }
        self.trades.push(trade);
        Ok(())
    }

    fn update(&mut self, trade: Trade) -> Result<()> {
        trade.validate()?;
        let index = self
            .position(&trade.id)
            .ok_or_else(|| JournalError::TradeNotFound(trade.id.clone()))?;
        self.trades[index] = trade;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<Trade> {
        let index = self
            .position(id)
            .ok_or_else(|| JournalError::TradeNotFound(id.to_string()))?;
        Ok(self.trades.remove(index))
    }
}

/// Trade store persisted as a JSON array.
///
/// Every mutation rewrites the whole file. Concurrent writers are not
/// coordinated; the last write wins.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: InMemoryTradeStore,
}

impl JsonFileStore {
    /// Open the journal at `path`; a missing file is an empty journal
    pub fn open(path: &Path) -> Result<Self> {
        let inner = if path.exists() {
            let file = File::open(path)?;
            let trades: Vec<Trade> = serde_json::from_reader(BufReader::new(file))?;
            InMemoryTradeStore::from_trades(trades)?
        } else {
            InMemoryTradeStore::new()
        };

        log::debug!("opened journal {} with {} trades", path.display(), inner.len());

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trades(&self) -> &[Trade] {
        self.inner.trades()
    }

    fn persist(&self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, self.inner.trades())?;
        writer.flush()?;
        Ok(())
    }
}

impl TradeRepository for JsonFileStore {
    fn list(&self) -> Vec<Trade> {
        self.inner.list()
    }

    fn get(&self, id: &str) -> Option<Trade> {
        self.inner.get(id)
    }

    fn insert(&mut self, trade: Trade) -> Result<()> {
        self.inner.insert(trade)?;
        self.persist()
    }

    fn update(&mut self, trade: Trade) -> Result<()> {
        self.inner.update(trade)?;
        self.persist()
    }

    fn delete(&mut self, id: &str) -> Result<Trade> {
        let trade = self.inner.delete(id)?;
        self.persist()?;
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::Direction;
    use tempfile::tempdir;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, d, 14, 30, 0).unwrap()
    }

    fn open_trade(id: &str) -> Trade {
        Trade::new(id, "AMD", Direction::Long, 150.0, 10.0, at(1))
    }

    #[test]
    fn test_crud() {
        let mut store = InMemoryTradeStore::new();
        store.insert(open_trade("a")).unwrap();
        store.insert(open_trade("b")).unwrap();

        assert!(matches!(
            store.insert(open_trade("a")),
            Err(JournalError::DuplicateTradeId(_))
        ));

        let mut edited = store.get("b").unwrap();
        edited.notes = "late entry".to_string();
        store.update(edited).unwrap();
        assert_eq!(store.get("b").unwrap().notes, "late entry");

        store.delete("a").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_none());
        assert!(matches!(store.delete("a"), Err(JournalError::TradeNotFound(_))));
    }

    #[test]
    fn test_insert_validates() {
        let mut store = InMemoryTradeStore::new();
        let mut bad = open_trade("bad");
        bad.quantity = 0.0;

        assert!(store.insert(bad).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_exit_actions() {
        let mut store = InMemoryTradeStore::new();
        store.insert(open_trade("a")).unwrap();

        store
            .add_partial_exit("a", PartialExit::new(155.0, at(2), 4.0))
            .unwrap();
        assert!(store
            .add_partial_exit("a", PartialExit::new(156.0, at(3), 7.0))
            .is_err());

        let closed = store.close_trade("a", 160.0, at(5), 1.5).unwrap();
        assert!(closed.is_closed());
        assert_eq!(closed.remaining_quantity(), 6.0);
        assert_eq!(closed.fees, 1.5);

        assert!(store.close_trade("a", 161.0, at(6), 0.0).is_err());
        assert!(store
            .add_partial_exit("a", PartialExit::new(156.0, at(6), 1.0))
            .is_err());
    }

    #[test]
    fn test_close_before_entry_rejected() {
        let mut store = InMemoryTradeStore::new();
        store
            .insert(Trade::new("a", "AMD", Direction::Long, 150.0, 1.0, at(5)))
            .unwrap();

        assert!(store.close_trade("a", 151.0, at(4), 0.0).is_err());
        assert!(!store.get("a").unwrap().is_closed());
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            assert!(store.list().is_empty());
            store.insert(open_trade("a").with_strategy("Breakout")).unwrap();
            store.insert(open_trade("b")).unwrap();
            store.close_trade("a", 160.0, at(3), 0.0).unwrap();
            store.delete("b").unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        let trades = reopened.list();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, "a");
        assert!(trades[0].is_closed());
        assert_eq!(trades[0].strategy.as_deref(), Some("Breakout"));
    }

    #[test]
    fn test_json_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(JournalError::JsonError(_))
        ));
    }
}
