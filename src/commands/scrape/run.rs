use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use super::aggregate::{AggregateResult, Aggregator};
use super::fetch::{FetchParams, ReviewSource, fetch_with_fallback};
use super::play_store::PlayStoreClient;
use crate::cli::ScrapeArgs;
use crate::mapping::{SubjectMapping, resolve_subjects};
use crate::quality::{QualityThresholds, build_report, ensure_schema, log_report};
use crate::table::Table;

pub fn run(args: ScrapeArgs) -> Result<()> {
    let client = PlayStoreClient::new()?;
    run_with_source(&args, &client)
}

pub fn run_with_source(args: &ScrapeArgs, source: &dyn ReviewSource) -> Result<()> {
    let mapping = resolve_subjects(args.banks_file.as_deref(), &args.bank_overrides)?;
    let params = FetchParams {
        lang: args.lang.clone(),
        country: args.country.clone(),
        sort: args.sort,
    };
    let source_label = args
        .source_label
        .clone()
        .unwrap_or_else(|| format!("Google Play ({})", args.country.to_uppercase()));

    info!(
        subjects = mapping.subjects().len(),
        count = args.count,
        lang = %params.lang,
        country = %params.country,
        output = %args.output.display(),
        "starting scrape"
    );

    let result = collect_reviews(
        source,
        &mapping,
        &params,
        args.count,
        Duration::from_millis(args.delay_ms),
        &source_label,
    );

    for tally in &result.tallies {
        info!(
            bank = %tally.bank,
            raw = tally.raw,
            kept = tally.kept,
            failed_fetches = tally.failures.len(),
            "scrape tally"
        );
        for failure in &tally.failures {
            warn!(
                bank = %tally.bank,
                app_id = %failure.app_id,
                reason = %failure.reason,
                "identifier contributed no reviews"
            );
        }
    }
    info!(
        duplicates_dropped = result.duplicates_dropped,
        "removed duplicate reviews by text"
    );

    let table = ensure_schema(&Table::from_records(result.records, result.with_source_app));

    let thresholds = QualityThresholds {
        min_per_bank: args.min_per_bank,
        max_missing_pct: args.max_missing_pct,
        strict_min_per_bank: false,
    };
    let expected_banks = mapping
        .subjects()
        .iter()
        .map(|subject| subject.name.clone())
        .collect::<Vec<_>>();
    let report = build_report(&table, &thresholds, &expected_banks);
    log_report(&report);

    table.write_csv(&args.output)?;
    info!(path = %args.output.display(), rows = table.len(), "wrote scraped reviews");

    Ok(())
}

pub fn collect_reviews(
    source: &dyn ReviewSource,
    mapping: &SubjectMapping,
    params: &FetchParams,
    count: usize,
    delay: Duration,
    source_label: &str,
) -> AggregateResult {
    let mut aggregator = Aggregator::new(mapping, source_label);
    let mut first_fetch = true;

    for subject in mapping.subjects() {
        info!(bank = %subject.name, app_ids = subject.app_ids.len(), "scraping reviews");

        for app_id in &subject.app_ids {
            if !first_fetch && !delay.is_zero() {
                thread::sleep(delay);
            }
            first_fetch = false;

            let outcome = fetch_with_fallback(source, app_id, params, count);
            let raw = aggregator.record(&subject.name, app_id, outcome);
            info!(bank = %subject.name, app_id = %app_id, raw, "fetched reviews");
        }
    }

    aggregator.finish()
}
