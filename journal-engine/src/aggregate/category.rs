use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use common::{CategoryDescriptor, Direction, JournalError, Trade};
use serde::{Deserialize, Serialize};

/// Dimension a monthly report is broken down by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDimension {
    Strategy,
    Mistake,
    Timeframe,
    Tag,
    Account,
    Symbol,
    Direction,
}

impl CategoryDimension {
    /// Every category of this dimension observed in `trades`, sorted by name
    pub fn categories_from_trades(self, trades: &[Trade]) -> Vec<Category> {
        if self == CategoryDimension::Direction {
            let directions: BTreeSet<Direction> = trades.iter().map(|t| t.direction).collect();
            return directions.into_iter().map(Category::Direction).collect();
        }

        let mut names: BTreeSet<String> = BTreeSet::new();
        for trade in trades {
            match self {
                CategoryDimension::Strategy => {
                    names.extend(trade.strategy_name().map(str::to_string))
                }
                CategoryDimension::Mistake => names.extend(trade.mistakes.iter().cloned()),
                CategoryDimension::Timeframe => names.extend(trade.timeframe.clone()),
                CategoryDimension::Tag => names.extend(trade.tags.iter().cloned()),
                CategoryDimension::Account => names.extend(trade.account.clone()),
                // Symbols match case-insensitively, so one column per ticker
                CategoryDimension::Symbol => {
                    names.insert(trade.symbol.trim().to_uppercase());
                }
                CategoryDimension::Direction => {}
            }
        }

        names
            .into_iter()
            .filter(|n| !n.trim().is_empty())
            .filter_map(|name| self.named(name))
            .collect()
    }

    fn named(self, name: String) -> Option<Category> {
        match self {
            CategoryDimension::Strategy => Some(Category::Strategy(name)),
            CategoryDimension::Mistake => Some(Category::Mistake(name)),
            CategoryDimension::Timeframe => Some(Category::Timeframe(name)),
            CategoryDimension::Tag => Some(Category::Tag(name)),
            CategoryDimension::Account => Some(Category::Account(name)),
            CategoryDimension::Symbol => Some(Category::Symbol(name)),
            CategoryDimension::Direction => None,
        }
    }
}

impl fmt::Display for CategoryDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CategoryDimension::Strategy => "strategy",
            CategoryDimension::Mistake => "mistake",
            CategoryDimension::Timeframe => "timeframe",
            CategoryDimension::Tag => "tag",
            CategoryDimension::Account => "account",
            CategoryDimension::Symbol => "symbol",
            CategoryDimension::Direction => "direction",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CategoryDimension {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strategy" => Ok(CategoryDimension::Strategy),
            "mistake" => Ok(CategoryDimension::Mistake),
            "timeframe" => Ok(CategoryDimension::Timeframe),
            "tag" => Ok(CategoryDimension::Tag),
            "account" => Ok(CategoryDimension::Account),
            "symbol" => Ok(CategoryDimension::Symbol),
            "direction" => Ok(CategoryDimension::Direction),
            other => Err(JournalError::InvalidParameter(format!(
                "unknown category dimension: {}",
                other
            ))),
        }
    }
}

/// Classification of trades into one monthly report column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Category {
    Strategy(String),
    Mistake(String),
    Timeframe(String),
    Tag(String),
    Account(String),
    Symbol(String),
    Direction(Direction),
}

impl Category {
    pub fn dimension(&self) -> CategoryDimension {
        match self {
            Category::Strategy(_) => CategoryDimension::Strategy,
            Category::Mistake(_) => CategoryDimension::Mistake,
            Category::Timeframe(_) => CategoryDimension::Timeframe,
            Category::Tag(_) => CategoryDimension::Tag,
            Category::Account(_) => CategoryDimension::Account,
            Category::Symbol(_) => CategoryDimension::Symbol,
            Category::Direction(_) => CategoryDimension::Direction,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Category::Strategy(name)
            | Category::Mistake(name)
            | Category::Timeframe(name)
            | Category::Tag(name)
            | Category::Account(name)
            | Category::Symbol(name) => name.clone(),
            Category::Direction(direction) => direction.to_string(),
        }
    }

    /// Stable column id, `dimension:label`
    pub fn id(&self) -> String {
        format!("{}:{}", self.dimension(), self.label())
    }

    pub fn descriptor(&self) -> CategoryDescriptor {
        CategoryDescriptor {
            id: self.id(),
            label: self.label(),
        }
    }

    /// Whether `trade` belongs to this column. A trade may match any number
    /// of categories.
    pub fn matches(&self, trade: &Trade) -> bool {
        match self {
            Category::Strategy(name) => trade.strategy_name() == Some(name.as_str()),
            Category::Mistake(name) => trade.mistakes.contains(name),
            Category::Timeframe(name) => trade.timeframe.as_deref() == Some(name.as_str()),
            Category::Tag(name) => trade.tags.contains(name),
            Category::Account(name) => trade.account.as_deref() == Some(name.as_str()),
            Category::Symbol(name) => trade.symbol.trim().eq_ignore_ascii_case(name),
            Category::Direction(direction) => trade.direction == *direction,
        }
    }
}
