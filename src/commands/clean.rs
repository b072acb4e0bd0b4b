use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::cli::CleanArgs;
use crate::model::{BANK_COLUMN, DATE_COLUMN, REVIEW_COLUMN};
use crate::quality::{QualityThresholds, build_report, enforce, ensure_schema, log_report};
use crate::table::{Table, is_missing};

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const EMPTY_ROW_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub loaded_rows: usize,
    pub unparsable_dates: usize,
    pub empty_reviews_dropped: usize,
    pub duplicates_dropped: usize,
}

pub fn run(args: CleanArgs) -> Result<()> {
    let thresholds = QualityThresholds {
        min_per_bank: args.min_per_bank,
        max_missing_pct: args.max_missing_pct,
        strict_min_per_bank: args.strict_min_per_bank,
    };

    let table = Table::load_csv(&args.input)?;
    info!(path = %args.input.display(), rows = table.len(), "loaded reviews");

    let (table, stats) = clean_table(table)?;
    info!(
        loaded = stats.loaded_rows,
        unparsable_dates = stats.unparsable_dates,
        empty_reviews_dropped = stats.empty_reviews_dropped,
        duplicates_dropped = stats.duplicates_dropped,
        rows = table.len(),
        "cleaning finished"
    );

    let report = build_report(&table, &thresholds, &[]);
    log_report(&report);

    table.write_csv(&args.output)?;
    info!(path = %args.output.display(), rows = table.len(), "wrote cleaned reviews");

    enforce(&report, &thresholds)
}

pub fn clean_table(mut table: Table) -> Result<(Table, CleanStats)> {
    let Some(review_index) = table.column_index(REVIEW_COLUMN) else {
        bail!("input is missing required column `{REVIEW_COLUMN}`");
    };

    let mut stats = CleanStats {
        loaded_rows: table.len(),
        ..CleanStats::default()
    };

    table.map_column(DATE_COLUMN, |cell| {
        let normalized = cell.as_deref().and_then(normalize_date);
        if normalized.is_none() && !is_missing(&cell) {
            stats.unparsable_dates += 1;
        }
        normalized
    });
    if stats.unparsable_dates > 0 {
        info!(rows = stats.unparsable_dates, "unparsable dates blanked");
    }

    table.map_column(REVIEW_COLUMN, |cell| {
        Some(cell.map(|text| text.trim().to_string()).unwrap_or_default())
    });

    let bank_index = table.column_index(BANK_COLUMN);
    let samples = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| is_missing(&row[review_index]))
        .take(EMPTY_ROW_SAMPLE_LIMIT)
        .map(|(index, row)| {
            let bank = bank_index
                .and_then(|bank_index| row[bank_index].clone())
                .unwrap_or_default();
            format!("row {} (bank={bank})", index + 2)
        })
        .collect::<Vec<_>>();

    stats.empty_reviews_dropped = table.retain_rows(|row| !is_missing(&row[review_index]));
    if stats.empty_reviews_dropped > 0 {
        warn!(
            rows = stats.empty_reviews_dropped,
            samples = ?samples,
            "dropped empty-review rows"
        );
    } else {
        info!("no empty-review rows found");
    }

    stats.duplicates_dropped = table.dedup_by_column(REVIEW_COLUMN);
    info!(rows = stats.duplicates_dropped, "removed duplicate rows");

    Ok((ensure_schema(&table), stats))
}

pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|value| value.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
                .ok()
                .map(|value| value.date_naive())
        })?;

    Some(date.format("%Y-%m-%d").to_string())
}
