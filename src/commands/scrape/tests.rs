use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};

use super::aggregate::dedup_by_text;
use super::fetch::{
    FetchOutcome, FetchParams, MAX_COUNT_EACH_FETCH, ReviewPage, ReviewSource, fetch_all_reviews,
    fetch_reviews, fetch_with_fallback,
};
use super::run::{collect_reviews, run_with_source};
use crate::cli::{CleanArgs, ScrapeArgs, SortOrder};
use crate::commands::clean;
use crate::mapping::SubjectMapping;
use crate::model::{RawReview, RawValue, ReviewRecord};
use crate::table::Table;

#[derive(Default)]
struct ScriptedSource {
    pages: RefCell<HashMap<String, VecDeque<Result<ReviewPage, String>>>>,
    requests: RefCell<Vec<(String, usize, Option<String>)>>,
}

impl ScriptedSource {
    fn push(&self, app_id: &str, page: Result<ReviewPage, String>) {
        self.pages
            .borrow_mut()
            .entry(app_id.to_string())
            .or_default()
            .push_back(page);
    }

    fn requests_for(&self, app_id: &str) -> Vec<(usize, Option<String>)> {
        self.requests
            .borrow()
            .iter()
            .filter(|(id, _, _)| id == app_id)
            .map(|(_, count, token)| (*count, token.clone()))
            .collect()
    }
}

impl ReviewSource for ScriptedSource {
    fn fetch_page(
        &self,
        app_id: &str,
        _params: &FetchParams,
        count: usize,
        token: Option<&str>,
    ) -> Result<ReviewPage> {
        self.requests
            .borrow_mut()
            .push((app_id.to_string(), count, token.map(ToOwned::to_owned)));

        let next = self
            .pages
            .borrow_mut()
            .get_mut(app_id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(ReviewPage::default()),
        }
    }
}

fn params() -> FetchParams {
    FetchParams {
        lang: "en".to_string(),
        country: "us".to_string(),
        sort: SortOrder::Newest,
    }
}

fn raw(text: &str) -> RawReview {
    RawReview::new()
        .with("content", RawValue::Text(text.to_string()))
        .with("score", RawValue::Integer(5))
}

fn page(texts: &[&str], token: Option<&str>) -> ReviewPage {
    ReviewPage {
        reviews: texts.iter().map(|text| raw(text)).collect(),
        next_token: token.map(ToOwned::to_owned),
    }
}

fn numbered_page(prefix: &str, len: usize, token: Option<&str>) -> ReviewPage {
    ReviewPage {
        reviews: (0..len).map(|index| raw(&format!("{prefix} {index}"))).collect(),
        next_token: token.map(ToOwned::to_owned),
    }
}

fn scrape_args(output: &Path, overrides: &[&str]) -> ScrapeArgs {
    ScrapeArgs {
        output: output.to_path_buf(),
        count: 450,
        lang: "en".to_string(),
        country: "us".to_string(),
        sort: SortOrder::Newest,
        delay_ms: 0,
        banks_file: None,
        bank_overrides: overrides.iter().map(|pair| pair.to_string()).collect(),
        min_per_bank: 0,
        max_missing_pct: 5.0,
        source_label: None,
    }
}

#[test]
fn bounded_fetch_pages_in_store_sized_batches_until_count() {
    let source = ScriptedSource::default();
    source.push("app", Ok(numbered_page("a", MAX_COUNT_EACH_FETCH, Some("T1"))));
    source.push("app", Ok(numbered_page("b", MAX_COUNT_EACH_FETCH, Some("T2"))));
    source.push("app", Ok(numbered_page("c", 52, Some("T3"))));

    let reviews = fetch_reviews(&source, "app", &params(), 450).expect("fetch succeeds");

    assert_eq!(reviews.len(), 450);
    assert_eq!(
        source.requests_for("app"),
        vec![
            (199, None),
            (199, Some("T1".to_string())),
            (52, Some("T2".to_string())),
        ]
    );
}

#[test]
fn bounded_fetch_stops_without_continuation_token() {
    let source = ScriptedSource::default();
    source.push("app", Ok(page(&["one", "two"], None)));

    let reviews = fetch_reviews(&source, "app", &params(), 450).expect("fetch succeeds");

    assert_eq!(reviews.len(), 2);
    assert_eq!(source.requests_for("app").len(), 1);
}

#[test]
fn paging_stops_when_the_same_token_comes_back() {
    let source = ScriptedSource::default();
    source.push("app", Ok(page(&["one"], Some("T1"))));
    source.push("app", Ok(page(&["two"], Some("T1"))));
    source.push("app", Ok(page(&["three"], Some("T2"))));

    let reviews = fetch_reviews(&source, "app", &params(), 450).expect("fetch succeeds");

    assert_eq!(reviews.len(), 2);
    assert_eq!(
        source.requests_for("app"),
        vec![(199, None), (199, Some("T1".to_string()))]
    );

    let source = ScriptedSource::default();
    source.push("app", Ok(page(&["one"], Some("T1"))));
    source.push("app", Ok(page(&["two"], Some("T1"))));
    source.push("app", Ok(page(&["three"], Some("T2"))));

    let reviews = fetch_all_reviews(&source, "app", &params()).expect("fetch succeeds");

    assert_eq!(reviews.len(), 2);
    assert_eq!(source.requests_for("app").len(), 2);
}

#[test]
fn empty_bounded_fetch_falls_back_to_following_all_tokens() {
    let source = ScriptedSource::default();
    source.push("app", Ok(page(&[], None)));
    source.push("app", Ok(page(&["one", "two"], Some("T1"))));
    source.push("app", Ok(page(&["three"], None)));

    let outcome = fetch_with_fallback(&source, "app", &params(), 450);

    match outcome {
        FetchOutcome::Fetched(reviews) => assert_eq!(reviews.len(), 3),
        FetchOutcome::Failed { error } => panic!("unexpected failure: {error}"),
    }
    assert_eq!(source.requests_for("app").len(), 3);
}

#[test]
fn fetch_errors_become_zero_count_failures() {
    let source = ScriptedSource::default();
    source.push("app", Ok(page(&["one"], Some("T1"))));
    source.push("app", Err("connection reset".to_string()));

    let outcome = fetch_with_fallback(&source, "app", &params(), 450);

    assert_eq!(outcome.raw_count(), 0);
    match outcome {
        FetchOutcome::Failed { error } => assert!(error.to_string().contains("connection reset")),
        FetchOutcome::Fetched(_) => panic!("expected a failure"),
    }
}

#[test]
fn multi_identifier_raw_count_sums_identifiers_even_when_one_fails() {
    let mut mapping = SubjectMapping::default();
    mapping.set("X", vec!["A".to_string(), "B".to_string()]);

    let source = ScriptedSource::default();
    source.push("A", Err("provider error".to_string()));
    source.push("B", Ok(page(&["first", "second"], None)));

    let result = collect_reviews(
        &source,
        &mapping,
        &params(),
        450,
        Duration::ZERO,
        "Google Play (US)",
    );

    assert!(result.with_source_app);
    let tally = &result.tallies[0];
    assert_eq!(tally.bank, "X");
    assert_eq!(tally.raw, 2);
    assert_eq!(tally.kept, 2);
    assert_eq!(tally.failures.len(), 1);
    assert_eq!(tally.failures[0].app_id, "A");
    assert!(
        result
            .records
            .iter()
            .all(|record| record.source_app.as_deref() == Some("B"))
    );
}

#[test]
fn aggregation_counts_raw_before_dedup_and_keeps_first_seen_order() {
    let mut mapping = SubjectMapping::default();
    mapping.set("CBE", vec!["cbe".to_string()]);
    mapping.set("BOA", vec!["boa".to_string()]);

    let source = ScriptedSource::default();
    source.push("cbe", Ok(page(&["Great app", "Slow", "Great app"], None)));
    source.push("boa", Ok(page(&["Slow", "Useful"], None)));

    let result = collect_reviews(&source, &mapping, &params(), 450, Duration::ZERO, "src");

    let texts = result
        .records
        .iter()
        .map(|record| (record.bank.as_str(), record.review.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(texts, vec![("CBE", "Great app"), ("CBE", "Slow"), ("BOA", "Useful")]);
    assert_eq!(result.duplicates_dropped, 2);
    assert_eq!((result.tallies[0].raw, result.tallies[0].kept), (3, 2));
    assert_eq!((result.tallies[1].raw, result.tallies[1].kept), (2, 1));
    assert!(!result.with_source_app);
}

#[test]
fn dedup_by_text_is_idempotent() {
    let record = |text: &str, bank: &str| ReviewRecord {
        review: text.to_string(),
        rating: None,
        date: String::new(),
        bank: bank.to_string(),
        source: "src".to_string(),
        source_app: None,
    };
    let records = vec![
        record("a", "CBE"),
        record("b", "CBE"),
        record("a", "BOA"),
        record("", "BOA"),
        record("", "CBE"),
    ];

    let (once, dropped) = dedup_by_text(records);
    let (twice, dropped_again) = dedup_by_text(once.clone());

    assert_eq!(dropped, 2);
    assert_eq!(dropped_again, 0);
    assert_eq!(once, twice);
}

#[test]
fn scrape_then_clean_keeps_single_review_for_duplicate_and_empty_texts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw_path = dir.path().join("data").join("reviews.csv");
    let clean_path = dir.path().join("data").join("clean_reviews.csv");

    let source = ScriptedSource::default();
    source.push(
        "com.example.app",
        Ok(page(&["Great app", "Great app", ""], None)),
    );

    run_with_source(&scrape_args(&raw_path, &["TestBank=com.example.app"]), &source)
        .expect("scrape succeeds");

    let header = fs::read_to_string(&raw_path).expect("raw csv exists");
    assert!(header.starts_with("review,rating,date,bank,source\n"));

    clean::run(CleanArgs {
        input: raw_path,
        output: clean_path.clone(),
        min_per_bank: 0,
        max_missing_pct: 5.0,
        strict_min_per_bank: false,
    })
    .expect("clean succeeds");

    let cleaned = Table::load_csv(&clean_path).expect("clean csv loads");
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned.rows()[0][0].as_deref(), Some("Great app"));
    assert_eq!(cleaned.rows()[0][3].as_deref(), Some("TestBank"));
    assert_eq!(cleaned.rows()[0][4].as_deref(), Some("Google Play (US)"));
}

#[test]
fn scrape_rejects_malformed_override_before_fetching() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = ScriptedSource::default();

    let err = run_with_source(&scrape_args(&dir.path().join("out.csv"), &["TestBank"]), &source)
        .expect_err("override without id is fatal");

    assert!(err.to_string().contains("expected NAME=ID"));
    assert!(source.requests.borrow().is_empty());
}
