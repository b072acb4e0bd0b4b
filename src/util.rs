use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn ensure_parent_directory(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
