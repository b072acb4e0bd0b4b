use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::model::{REQUIRED_COLUMNS, ReviewRecord, SOURCE_APP_COLUMN};
use crate::util::ensure_parent_directory;

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

pub fn is_missing(cell: &Cell) -> bool {
    cell.as_deref().map(|value| value.trim().is_empty()).unwrap_or(true)
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_records(records: Vec<ReviewRecord>, with_source_app: bool) -> Self {
        let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        if with_source_app {
            columns.push(SOURCE_APP_COLUMN.to_string());
        }

        let rows = records
            .into_iter()
            .map(|record| record.into_cells(with_source_app))
            .collect();

        Self { columns, rows }
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("input file not found: {}", path.display());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let columns = reader
            .headers()
            .with_context(|| format!("failed to read header row of {}", path.display()))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect::<Vec<_>>();

        let mut table = Self::new(columns);
        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("failed to read row {} of {}", index + 2, path.display())
            })?;

            table.push_row(
                record
                    .iter()
                    .map(|value| (!value.is_empty()).then(|| value.to_string()))
                    .collect(),
            );
        }

        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        ensure_parent_directory(path)?;

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer
            .write_record(&self.columns)
            .with_context(|| format!("failed to write header to {}", path.display()))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .with_context(|| format!("failed to write row to {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;

        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Cell> + 'a {
        let index = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| index.map(|index| &row[index]))
    }

    pub fn map_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(Cell) -> Cell,
    {
        let Some(index) = self.column_index(name) else {
            return;
        };
        for row in &mut self.rows {
            let value = row[index].take();
            row[index] = f(value);
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row.as_slice()));
        before - self.rows.len()
    }

    pub fn dedup_by_column(&mut self, name: &str) -> usize {
        let Some(index) = self.column_index(name) else {
            return 0;
        };
        let mut seen = HashSet::new();
        self.retain_rows(|row| seen.insert(row[index].clone()))
    }

    pub fn select_columns(&self, names: &[&str]) -> Self {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Vec<_>>();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|index| index.and_then(|index| row[index].clone()))
                    .collect()
            })
            .collect();

        Self {
            columns: names.iter().map(|name| name.to_string()).collect(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests;
