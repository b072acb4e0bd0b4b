use std::collections::HashMap;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{BANK_COLUMN, REQUIRED_COLUMNS, SOURCE_APP_COLUMN};
use crate::table::{Table, is_missing};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub min_per_bank: usize,
    pub max_missing_pct: f64,
    pub strict_min_per_bank: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
    pub missing_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankCount {
    pub bank: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub columns: Vec<ColumnMissing>,
    pub max_missing_pct: f64,
    pub max_missing_pct_threshold: f64,
    pub bank_counts: Vec<BankCount>,
    pub min_per_bank: usize,
    pub banks_below_minimum: Vec<String>,
}

impl QualityReport {
    pub fn missing_over_threshold(&self) -> bool {
        self.max_missing_pct > self.max_missing_pct_threshold
    }
}

pub fn missing_pct(missing: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    missing as f64 / total as f64 * 100.0
}

pub fn ensure_schema(table: &Table) -> Table {
    for column in REQUIRED_COLUMNS {
        if !table.has_column(column) {
            warn!(column, rows = table.len(), "required column missing; inserting empty column");
        }
    }

    let extra = table
        .columns()
        .iter()
        .filter(|column| {
            !REQUIRED_COLUMNS.contains(&column.as_str()) && column.as_str() != SOURCE_APP_COLUMN
        })
        .cloned()
        .collect::<Vec<_>>();
    if !extra.is_empty() {
        warn!(columns = ?extra, "dropping columns outside the review schema");
    }

    let mut columns = REQUIRED_COLUMNS.to_vec();
    if table.has_column(SOURCE_APP_COLUMN) {
        columns.push(SOURCE_APP_COLUMN);
    }
    table.select_columns(&columns)
}

pub fn build_report(
    table: &Table,
    thresholds: &QualityThresholds,
    expected_banks: &[String],
) -> QualityReport {
    let total_rows = table.len();

    let columns = REQUIRED_COLUMNS
        .iter()
        .map(|column| {
            let missing = if table.has_column(column) {
                table.column_values(column).filter(|cell| is_missing(cell)).count()
            } else {
                total_rows
            };
            ColumnMissing {
                column: column.to_string(),
                missing,
                missing_pct: missing_pct(missing, total_rows),
            }
        })
        .collect::<Vec<_>>();

    let max_missing_pct = columns
        .iter()
        .map(|column| column.missing_pct)
        .fold(0.0_f64, f64::max);

    let mut counts: HashMap<&str, usize> = expected_banks
        .iter()
        .map(|bank| (bank.as_str(), 0))
        .collect();
    for cell in table.column_values(BANK_COLUMN) {
        if let Some(bank) = cell.as_deref().map(str::trim).filter(|bank| !bank.is_empty()) {
            *counts.entry(bank).or_default() += 1;
        }
    }

    let mut bank_counts = counts
        .into_iter()
        .map(|(bank, rows)| BankCount {
            bank: bank.to_string(),
            rows,
        })
        .collect::<Vec<_>>();
    bank_counts.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.bank.cmp(&b.bank)));

    let banks_below_minimum = if thresholds.min_per_bank == 0 {
        Vec::new()
    } else {
        bank_counts
            .iter()
            .filter(|count| count.rows < thresholds.min_per_bank)
            .map(|count| count.bank.clone())
            .collect()
    };

    QualityReport {
        total_rows,
        columns,
        max_missing_pct,
        max_missing_pct_threshold: thresholds.max_missing_pct,
        bank_counts,
        min_per_bank: thresholds.min_per_bank,
        banks_below_minimum,
    }
}

pub fn log_report(report: &QualityReport) {
    info!(rows = report.total_rows, "data quality summary");
    for column in &report.columns {
        info!(
            column = %column.column,
            missing = column.missing,
            missing_pct = %format!("{:.2}", column.missing_pct),
            "missing values"
        );
    }

    if report.missing_over_threshold() {
        warn!(
            max_missing_pct = %format!("{:.2}", report.max_missing_pct),
            threshold = %format!("{:.2}", report.max_missing_pct_threshold),
            "maximum missing percentage exceeds threshold"
        );
    }

    for count in &report.bank_counts {
        info!(bank = %count.bank, rows = count.rows, "rows per bank");
    }

    if !report.banks_below_minimum.is_empty() {
        warn!(
            min_per_bank = report.min_per_bank,
            banks = ?report.banks_below_minimum,
            "banks below minimum review count"
        );
    }
}

pub fn enforce(report: &QualityReport, thresholds: &QualityThresholds) -> Result<()> {
    if thresholds.strict_min_per_bank && !report.banks_below_minimum.is_empty() {
        let detail = report
            .bank_counts
            .iter()
            .filter(|count| report.banks_below_minimum.contains(&count.bank))
            .map(|count| format!("{}={}", count.bank, count.rows))
            .collect::<Vec<_>>()
            .join(", ");
        bail!(
            "banks below minimum of {} reviews: {}",
            thresholds.min_per_bank,
            detail
        );
    }
    Ok(())
}
