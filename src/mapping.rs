use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

use crate::util::read_file;

const DEFAULT_SUBJECTS: [(&str, &str); 3] = [
    ("CBE", "com.combanketh.mobilebanking"),
    ("BOA", "com.boa.boaMobileBanking"),
    ("Dashen", "com.cr2.amolelight"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub app_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectMapping {
    subjects: Vec<Subject>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MappingFileEntry {
    Single(String),
    Many(Vec<String>),
}

impl SubjectMapping {
    pub fn defaults() -> Self {
        let mut mapping = Self::default();
        for (name, app_id) in DEFAULT_SUBJECTS {
            mapping.set(name, vec![app_id.to_string()]);
        }
        mapping
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn is_multi_identifier(&self) -> bool {
        self.subjects.iter().any(|subject| subject.app_ids.len() > 1)
    }

    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.name == name)
    }

    pub fn set(&mut self, name: &str, app_ids: Vec<String>) {
        match self.subjects.iter_mut().find(|subject| subject.name == name) {
            Some(subject) => subject.app_ids = app_ids,
            None => self.subjects.push(Subject {
                name: name.to_string(),
                app_ids,
            }),
        }
    }

    pub fn merge(&mut self, overrides: SubjectMapping) {
        for subject in overrides.subjects {
            self.set(&subject.name, subject.app_ids);
        }
    }

    pub fn parse_json(raw: &[u8]) -> Result<Self> {
        let entries: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(raw).context("mapping file must be a JSON object")?;

        let mut mapping = Self::default();
        for (name, value) in entries {
            let name = name.trim();
            if name.is_empty() {
                bail!("mapping file contains an empty subject name");
            }

            let entry: MappingFileEntry = serde_json::from_value(value).with_context(|| {
                format!("subject {name} must map to a string or an array of strings")
            })?;
            let app_ids = match entry {
                MappingFileEntry::Single(app_id) => vec![app_id],
                MappingFileEntry::Many(app_ids) => app_ids,
            };
            let app_ids = app_ids
                .into_iter()
                .map(|app_id| app_id.trim().to_string())
                .collect::<Vec<_>>();
            if app_ids.is_empty() || app_ids.iter().any(String::is_empty) {
                bail!("subject {name} must map to at least one non-empty identifier");
            }

            mapping.set(name, app_ids);
        }

        Ok(mapping)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = read_file(path)?;
        Self::parse_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse_overrides(pairs: &[String]) -> Result<Self> {
        let mut mapping = Self::default();
        for pair in pairs {
            let (name, app_id) = parse_override(pair)?;
            let mut app_ids = mapping
                .get(&name)
                .map(|subject| subject.app_ids.clone())
                .unwrap_or_default();
            if !app_ids.contains(&app_id) {
                app_ids.push(app_id);
            }
            mapping.set(&name, app_ids);
        }
        Ok(mapping)
    }
}

pub fn parse_override(pair: &str) -> Result<(String, String)> {
    let Some((name, app_id)) = pair.split_once('=') else {
        bail!("invalid --bank override {pair:?}: expected NAME=ID");
    };

    let name = name.trim();
    let app_id = app_id.trim();
    if name.is_empty() || app_id.is_empty() {
        bail!("invalid --bank override {pair:?}: NAME and ID must both be non-empty");
    }

    Ok((name.to_string(), app_id.to_string()))
}

pub fn resolve_subjects(banks_file: Option<&Path>, overrides: &[String]) -> Result<SubjectMapping> {
    let mut mapping = SubjectMapping::defaults();

    if let Some(path) = banks_file {
        let from_file = SubjectMapping::load_file(path)?;
        info!(
            path = %path.display(),
            subjects = from_file.subjects().len(),
            "loaded subject mapping file"
        );
        mapping.merge(from_file);
    }

    let from_cli = SubjectMapping::parse_overrides(overrides)?;
    mapping.merge(from_cli);

    for subject in mapping.subjects() {
        debug!(bank = %subject.name, app_ids = ?subject.app_ids, "resolved subject");
    }

    Ok(mapping)
}
