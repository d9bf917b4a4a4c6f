use crate::errors::DateError;
use chrono::{Local, NaiveDate};
use std::{fmt, str::FromStr};

const KEY_FORMAT: &str = "%Y-%m-%d";

/// The calendar day being viewed.
///
/// Backed by a `NaiveDate`, so there is no time of day or offset that could
/// shift the key across midnight. Stepping follows the proleptic Gregorian
/// calendar and saturates at the ends of chrono's representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateCursor(NaiveDate);

impl DateCursor {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The viewer's current wall-clock day.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or(DateError::OutOfRange { year, month, day })
    }

    pub fn parse(input: &str) -> Result<Self, DateError> {
        NaiveDate::parse_from_str(input.trim(), KEY_FORMAT)
            .map(Self)
            .map_err(|source| DateError::Parse {
                input: input.to_string(),
                source,
            })
    }

    pub fn previous_day(self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }

    pub fn next_day(self) -> Self {
        Self(self.0.succ_opt().unwrap_or(self.0))
    }

    pub fn to_key(self) -> String {
        self.0.format(KEY_FORMAT).to_string()
    }
}

impl FromStr for DateCursor {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DateCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}
