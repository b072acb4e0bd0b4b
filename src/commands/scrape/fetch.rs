use anyhow::Result;
use tracing::{info, warn};

use crate::cli::SortOrder;
use crate::model::RawReview;

pub const MAX_COUNT_EACH_FETCH: usize = 199;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub lang: String,
    pub country: String,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<RawReview>,
    pub next_token: Option<String>,
}

pub trait ReviewSource {
    fn fetch_page(
        &self,
        app_id: &str,
        params: &FetchParams,
        count: usize,
        token: Option<&str>,
    ) -> Result<ReviewPage>;
}

#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Vec<RawReview>),
    Failed { error: anyhow::Error },
}

impl FetchOutcome {
    pub fn raw_count(&self) -> usize {
        match self {
            Self::Fetched(reviews) => reviews.len(),
            Self::Failed { .. } => 0,
        }
    }
}

pub fn fetch_reviews(
    source: &dyn ReviewSource,
    app_id: &str,
    params: &FetchParams,
    count: usize,
) -> Result<Vec<RawReview>> {
    let mut reviews = Vec::new();
    let mut token: Option<String> = None;

    while reviews.len() < count {
        let batch = (count - reviews.len()).min(MAX_COUNT_EACH_FETCH);
        let page = source.fetch_page(app_id, params, batch, token.as_deref())?;
        let received = page.reviews.len();
        reviews.extend(page.reviews);

        match page.next_token {
            Some(next) if received > 0 && token.as_deref() != Some(next.as_str()) => {
                token = Some(next)
            }
            _ => break,
        }
    }

    reviews.truncate(count);
    Ok(reviews)
}

pub fn fetch_all_reviews(
    source: &dyn ReviewSource,
    app_id: &str,
    params: &FetchParams,
) -> Result<Vec<RawReview>> {
    let mut reviews = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = source.fetch_page(app_id, params, MAX_COUNT_EACH_FETCH, token.as_deref())?;
        let received = page.reviews.len();
        reviews.extend(page.reviews);

        match page.next_token {
            Some(next) if received > 0 && token.as_deref() != Some(next.as_str()) => {
                token = Some(next)
            }
            _ => break,
        }
    }

    Ok(reviews)
}

pub fn fetch_with_fallback(
    source: &dyn ReviewSource,
    app_id: &str,
    params: &FetchParams,
    count: usize,
) -> FetchOutcome {
    let result = fetch_reviews(source, app_id, params, count).and_then(|reviews| {
        if reviews.is_empty() {
            info!(app_id, "bounded fetch returned no reviews; following continuation tokens");
            fetch_all_reviews(source, app_id, params)
        } else {
            Ok(reviews)
        }
    });

    match result {
        Ok(reviews) => FetchOutcome::Fetched(reviews),
        Err(error) => {
            warn!(app_id, error = %format!("{error:#}"), "review fetch failed; counting as zero");
            FetchOutcome::Failed { error }
        }
    }
}
