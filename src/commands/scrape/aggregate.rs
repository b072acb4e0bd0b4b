use std::collections::HashSet;

use super::fetch::FetchOutcome;
use super::normalize::normalize_review;
use crate::mapping::SubjectMapping;
use crate::model::ReviewRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectTally {
    pub bank: String,
    pub raw: usize,
    pub kept: usize,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub app_id: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct Aggregator {
    source_label: String,
    with_source_app: bool,
    records: Vec<ReviewRecord>,
    tallies: Vec<SubjectTally>,
}

#[derive(Debug)]
pub struct AggregateResult {
    pub records: Vec<ReviewRecord>,
    pub tallies: Vec<SubjectTally>,
    pub duplicates_dropped: usize,
    pub with_source_app: bool,
}

impl Aggregator {
    pub fn new(mapping: &SubjectMapping, source_label: &str) -> Self {
        let tallies = mapping
            .subjects()
            .iter()
            .map(|subject| SubjectTally {
                bank: subject.name.clone(),
                ..SubjectTally::default()
            })
            .collect();

        Self {
            source_label: source_label.to_string(),
            with_source_app: mapping.is_multi_identifier(),
            records: Vec::new(),
            tallies,
        }
    }

    pub fn record(&mut self, bank: &str, app_id: &str, outcome: FetchOutcome) -> usize {
        let raw_count = outcome.raw_count();
        let source_app = self.with_source_app.then_some(app_id);

        match outcome {
            FetchOutcome::Fetched(reviews) => {
                self.records.extend(
                    reviews
                        .iter()
                        .map(|raw| normalize_review(raw, bank, &self.source_label, source_app)),
                );
            }
            FetchOutcome::Failed { error } => {
                self.tally_mut(bank).failures.push(FetchFailure {
                    app_id: app_id.to_string(),
                    reason: format!("{error:#}"),
                });
            }
        }

        self.tally_mut(bank).raw += raw_count;
        raw_count
    }

    pub fn finish(self) -> AggregateResult {
        let (records, duplicates_dropped) = dedup_by_text(self.records);

        let mut tallies = self.tallies;
        for tally in &mut tallies {
            tally.kept = records
                .iter()
                .filter(|record| record.bank == tally.bank)
                .count();
        }

        AggregateResult {
            records,
            tallies,
            duplicates_dropped,
            with_source_app: self.with_source_app,
        }
    }

    fn tally_mut(&mut self, bank: &str) -> &mut SubjectTally {
        let index = match self.tallies.iter().position(|tally| tally.bank == bank) {
            Some(index) => index,
            None => {
                self.tallies.push(SubjectTally {
                    bank: bank.to_string(),
                    ..SubjectTally::default()
                });
                self.tallies.len() - 1
            }
        };
        &mut self.tallies[index]
    }
}

pub fn dedup_by_text(records: Vec<ReviewRecord>) -> (Vec<ReviewRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let kept = records
        .into_iter()
        .filter(|record| seen.insert(record.review.clone()))
        .collect::<Vec<_>>();
    let dropped = before - kept.len();
    (kept, dropped)
}
