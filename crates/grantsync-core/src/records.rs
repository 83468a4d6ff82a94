//! CSV exports: read into header-ordered records, write back after a job.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One CSV row. Cells are addressed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: HashMap<String, String>,
}

impl Record {
    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw cell, exactly as exported.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Trimmed cell; `None` when the column is absent or blank.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.to_string(), value.into());
    }
}

/// A whole CSV file: header order plus rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Append `name` to the headers if it is not there yet.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.headers.iter().any(|h| h == name) {
            self.headers.push(name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a CSV export with a header row.
pub fn read_csv(path: &Path) -> Result<Table> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_from(file).with_context(|| format!("parse {}", path.display()))
}

/// Read CSV from any reader. Short rows are padded with empty cells.
pub fn read_from<R: std::io::Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("read CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", index + 1))?;
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or_default().to_string()))
            .collect();
        rows.push(Record { cells });
    }

    Ok(Table { headers, rows })
}

/// Path of the temp file used while rewriting `path` (`file.csv` → `file.csv.part`).
pub fn temp_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}

/// Write `table` to `path` via a `.part` file and an atomic rename.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut wtr = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        wtr.write_record(&table.headers)?;
        for row in &table.rows {
            wtr.write_record(
                table
                    .headers
                    .iter()
                    .map(|h| row.get(h).unwrap_or_default()),
            )?;
        }
        wtr.flush()
            .with_context(|| format!("flush {}", tmp.display()))?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename {} to {}", tmp.display(), path.display()))?;
    Ok(())
}
