use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReportArgs;
use crate::quality::{QualityReport, QualityThresholds, build_report, ensure_schema, log_report};
use crate::table::Table;

pub fn run(args: ReportArgs) -> Result<()> {
    let table = Table::load_csv(&args.input)?;
    info!(path = %args.input.display(), rows = table.len(), "loaded reviews");

    let thresholds = QualityThresholds {
        min_per_bank: args.min_per_bank,
        max_missing_pct: args.max_missing_pct,
        strict_min_per_bank: false,
    };
    let report = build_report(&ensure_schema(&table), &thresholds, &[]);

    if args.json {
        write_json_report(&report)
    } else {
        log_report(&report);
        write_text_report(&report)
    }
}

fn write_json_report(report: &QualityReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize report json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_report(report: &QualityReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Rows: {}", report.total_rows)?;
    writeln!(output, "Missing values:")?;
    for column in &report.columns {
        writeln!(
            output,
            "  {:<8} {:>6} ({:.2}%)",
            column.column, column.missing, column.missing_pct
        )?;
    }
    writeln!(
        output,
        "Max missing: {:.2}% (threshold {:.2}%)",
        report.max_missing_pct, report.max_missing_pct_threshold
    )?;

    writeln!(output, "Rows per bank:")?;
    for count in &report.bank_counts {
        let flag = if report.banks_below_minimum.contains(&count.bank) {
            " below minimum"
        } else {
            ""
        };
        writeln!(output, "  {:<12} {:>6}{flag}", count.bank, count.rows)?;
    }

    output.flush()?;
    Ok(())
}
