use crate::model::{RawReview, RawValue, ReviewRecord};

const TEXT_KEYS: [&str; 2] = ["content", "review"];
const RATING_KEYS: [&str; 2] = ["score", "rating"];
const TIMESTAMP_KEY: &str = "at";

pub fn normalize_review(
    raw: &RawReview,
    bank: &str,
    source: &str,
    source_app: Option<&str>,
) -> ReviewRecord {
    ReviewRecord {
        review: review_text(raw),
        rating: rating(raw),
        date: review_date(raw),
        bank: bank.to_string(),
        source: source.to_string(),
        source_app: source_app.map(ToOwned::to_owned),
    }
}

fn review_text(raw: &RawReview) -> String {
    TEXT_KEYS
        .iter()
        .filter_map(|key| match raw.get(key)? {
            RawValue::Text(text) if !text.is_empty() => Some(text.clone()),
            RawValue::Integer(value) => Some(value.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_default()
}

fn rating(raw: &RawReview) -> Option<u8> {
    RATING_KEYS
        .iter()
        .filter_map(|key| match raw.get(key)? {
            RawValue::Integer(value) => star_rating(*value),
            RawValue::Text(text) => parse_rating(text),
            _ => None,
        })
        .next()
}

fn parse_rating(text: &str) -> Option<u8> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return star_rating(value);
    }
    let value = text.parse::<f64>().ok()?;
    if value.fract() != 0.0 {
        return None;
    }
    star_rating(value as i64)
}

fn star_rating(value: i64) -> Option<u8> {
    (1..=5).contains(&value).then_some(value as u8)
}

fn review_date(raw: &RawReview) -> String {
    match raw.get(TIMESTAMP_KEY) {
        Some(RawValue::Timestamp(at)) => at.format("%Y-%m-%d").to_string(),
        Some(RawValue::Text(text)) => text.clone(),
        Some(RawValue::Integer(value)) => value.to_string(),
        Some(RawValue::Null) | None => String::new(),
    }
}
