use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "bank-reviews",
    version,
    about = "Scrape, clean and validate banking app reviews"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Scrape(ScrapeArgs),
    Clean(CleanArgs),
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    #[arg(long, short = 'o', default_value = "data/reviews.csv")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 450)]
    pub count: usize,

    #[arg(long, default_value = "en")]
    pub lang: String,

    #[arg(long, default_value = "us")]
    pub country: String,

    #[arg(long, value_enum, default_value_t = SortOrder::Newest)]
    pub sort: SortOrder,

    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    #[arg(long)]
    pub banks_file: Option<PathBuf>,

    #[arg(long = "bank", value_name = "NAME=ID")]
    pub bank_overrides: Vec<String>,

    #[arg(long, default_value_t = 0)]
    pub min_per_bank: usize,

    #[arg(long, default_value_t = 5.0)]
    pub max_missing_pct: f64,

    #[arg(long)]
    pub source_label: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortOrder {
    Newest,
    MostRelevant,
    Rating,
}

impl SortOrder {
    pub fn wire_code(self) -> u8 {
        match self {
            Self::MostRelevant => 1,
            Self::Newest => 2,
            Self::Rating => 3,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    #[arg(long, short = 'i', default_value = "data/reviews.csv")]
    pub input: PathBuf,

    #[arg(long, short = 'o', default_value = "data/clean_reviews.csv")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 400)]
    pub min_per_bank: usize,

    #[arg(long, default_value_t = 5.0)]
    pub max_missing_pct: f64,

    #[arg(long, default_value_t = false)]
    pub strict_min_per_bank: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, short = 'i', default_value = "data/clean_reviews.csv")]
    pub input: PathBuf,

    #[arg(long, default_value_t = 400)]
    pub min_per_bank: usize,

    #[arg(long, default_value_t = 5.0)]
    pub max_missing_pct: f64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
