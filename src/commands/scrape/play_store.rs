use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::DateTime;
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use super::fetch::{FetchParams, ReviewPage, ReviewSource};
use crate::model::{RawReview, RawValue};

const PLAY_STORE_BASE_URL: &str = "https://play.google.com";
const REVIEWS_RPC_ID: &str = "UsvDTd";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct PlayStoreClient {
    client: reqwest::blocking::Client,
    base_url: String,
    envelope: Regex,
}

impl PlayStoreClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("bank-reviews/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: PLAY_STORE_BASE_URL.to_string(),
            envelope: review_envelope_regex()?,
        })
    }

    fn review_request(
        &self,
        app_id: &str,
        params: &FetchParams,
        count: usize,
        token: Option<&str>,
    ) -> reqwest::blocking::RequestBuilder {
        self.client
            .post(format!("{}/_/PlayStoreUi/data/batchexecute", self.base_url))
            .query(&[("hl", params.lang.as_str()), ("gl", params.country.as_str())])
            .form(&[("f.req", build_request_payload(app_id, params, count, token))])
    }
}

impl ReviewSource for PlayStoreClient {
    fn fetch_page(
        &self,
        app_id: &str,
        params: &FetchParams,
        count: usize,
        token: Option<&str>,
    ) -> Result<ReviewPage> {
        debug!(app_id, count, paginated = token.is_some(), "requesting review page");

        let response = self
            .review_request(app_id, params, count, token)
            .send()
            .with_context(|| format!("review request failed for {app_id}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("review request for {app_id} returned HTTP {status}");
        }

        let body = response
            .text()
            .with_context(|| format!("failed to read review response for {app_id}"))?;

        parse_review_response(&self.envelope, &body)
            .with_context(|| format!("failed to decode review response for {app_id}"))
    }
}

fn review_envelope_regex() -> Result<Regex> {
    Regex::new(r"\)\]\}'\n\n([\s\S]+)").context("failed to compile review envelope regex")
}

pub fn build_request_payload(
    app_id: &str,
    params: &FetchParams,
    count: usize,
    token: Option<&str>,
) -> String {
    let inner = json!([
        null,
        null,
        [2, params.sort.wire_code(), [count, null, token], null, [null, null]],
        [app_id, 7]
    ]);
    json!([[[REVIEWS_RPC_ID, inner.to_string(), null, "generic"]]]).to_string()
}

pub fn parse_review_response(envelope: &Regex, body: &str) -> Result<ReviewPage> {
    let captures = envelope
        .captures(body)
        .context("response is missing the batchexecute envelope")?;
    let outer: Value =
        serde_json::from_str(&captures[1]).context("failed to parse batchexecute envelope")?;

    let Some(payload) = outer.pointer("/0/2").and_then(Value::as_str) else {
        return Ok(ReviewPage::default());
    };
    let data: Value = serde_json::from_str(payload).context("failed to parse review payload")?;

    let reviews = data
        .get(0)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(decode_review).collect())
        .unwrap_or_default();

    Ok(ReviewPage {
        reviews,
        next_token: continuation_token(&data),
    })
}

fn continuation_token(data: &Value) -> Option<String> {
    let items = data.as_array()?;
    items
        .len()
        .checked_sub(2)
        .and_then(|index| items[index].as_array())
        .and_then(|entry| entry.last())
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn decode_review(item: &Value) -> RawReview {
    let at = item
        .pointer("/5/0")
        .and_then(Value::as_i64)
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
        .map(RawValue::Timestamp)
        .unwrap_or(RawValue::Null);

    RawReview::new()
        .with("score", raw_value(item.pointer("/2")))
        .with("content", raw_value(item.pointer("/4")))
        .with("at", at)
}

fn raw_value(value: Option<&Value>) -> RawValue {
    match value {
        Some(Value::String(text)) => RawValue::Text(text.clone()),
        Some(Value::Number(number)) => number
            .as_i64()
            .map(RawValue::Integer)
            .unwrap_or_else(|| RawValue::Text(number.to_string())),
        Some(Value::Bool(flag)) => RawValue::Text(flag.to_string()),
        _ => RawValue::Null,
    }
}
