use chrono::{DateTime, Utc};
use std::fmt;

use crate::utils::timestamp::format_api_timestamp;

/// Latest measurement time already present in the silver tier. Derived on
/// every run; `None` inside means the store is empty (first run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Watermark(Option<DateTime<Utc>>);

impl Watermark {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(Some(instant))
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Lower bound for the extractor's `date_from` filter.
    pub fn as_api_filter(&self) -> Option<String> {
        self.0.as_ref().map(format_api_timestamp)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(instant) => write!(f, "{}", instant.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "none (full extraction)"),
        }
    }
}
