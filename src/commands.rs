pub mod clean;
pub mod report;
pub mod scrape;
