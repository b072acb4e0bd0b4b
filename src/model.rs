use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub const REVIEW_COLUMN: &str = "review";
pub const RATING_COLUMN: &str = "rating";
pub const DATE_COLUMN: &str = "date";
pub const BANK_COLUMN: &str = "bank";
pub const SOURCE_COLUMN: &str = "source";
pub const SOURCE_APP_COLUMN: &str = "source_app";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    REVIEW_COLUMN,
    RATING_COLUMN,
    DATE_COLUMN,
    BANK_COLUMN,
    SOURCE_COLUMN,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub review: String,
    pub rating: Option<u8>,
    pub date: String,
    pub bank: String,
    pub source: String,
    pub source_app: Option<String>,
}

impl ReviewRecord {
    pub fn into_cells(self, with_source_app: bool) -> Vec<Option<String>> {
        let mut cells = vec![
            Some(self.review),
            self.rating.map(|rating| rating.to_string()),
            Some(self.date),
            Some(self.bank),
            Some(self.source),
        ];
        if with_source_app {
            cells.push(self.source_app);
        }
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Null,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReview {
    fields: BTreeMap<String, RawValue>,
}

impl RawReview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: RawValue) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }
}
