use crate::date_cursor::DateCursor;
use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

pub const DEFAULT_CATEGORIES: [&str; 4] = ["protein", "carbs", "vegetables", "fats"];

/// Identifier of one tracked counter. Keys end up as URL path segments, so the
/// characters that would change the path shape are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryKey(String);

impl CategoryKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ModelError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ModelError::EmptyCategory);
        }
        if key
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%'))
        {
            return Err(ModelError::InvalidCategory(key));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_CATEGORIES
            .iter()
            .map(|key| Self((*key).to_string()))
            .collect()
    }
}

impl TryFrom<String> for CategoryKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryKey> for String {
    fn from(key: CategoryKey) -> Self {
        key.0
    }
}

impl FromStr for CategoryKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn delta(self) -> i64 {
        match self {
            Direction::Increase => 1,
            Direction::Decrease => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increase => f.write_str("increase"),
            Direction::Decrease => f.write_str("decrease"),
        }
    }
}

/// Which record a counter belongs to: the portions of one day, or the goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Day(DateCursor),
    Goals,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Day(day) => write!(f, "day {day}"),
            Scope::Goals => f.write_str("goals"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Portions,
    Goals,
}

pub type CounterMap = BTreeMap<CategoryKey, u32>;
