// ============================================================
// Layer 4 — CSV Loader
// ============================================================
// Reads comma-separated tables with the `csv` crate.
//
// Header names are trimmed on read: catalogue exports often
// carry stray spaces (" pl_period") that would otherwise
// fail the feature contract.
//
// Two tables merge like a row-wise concat: the column set is
// the union of both headers (base order first), and cells a
// table does not have are left empty.

use anyhow::{Context, Result};
use std::{fs::File, io::Read, path::Path};

use crate::domain::error::{PipelineError, PipelineResult};

/// An in-memory CSV table of raw string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows:    Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Open and parse a CSV file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Cannot open CSV '{}'", path.display()))?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            "Loaded '{}' ({} rows, {} columns)",
            path.display(),
            table.len(),
            table.headers.len()
        );
        Ok(table)
    }

    /// Parse CSV from any reader (an upload body, a test string...).
    pub fn from_reader<R: Read>(reader: R) -> PipelineResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(malformed)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(malformed)?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append `other` below `self`, aligning columns by name.
    pub fn merge(self, other: CsvTable) -> CsvTable {
        let mut headers = self.headers.clone();
        for h in &other.headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }

        let realign = |table: &CsvTable| -> Vec<Vec<String>> {
            let mapping: Vec<Option<usize>> =
                headers.iter().map(|h| table.column_index(h)).collect();
            table
                .rows
                .iter()
                .map(|row| {
                    mapping
                        .iter()
                        .map(|idx| idx.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                        .collect()
                })
                .collect()
        };

        let mut rows = realign(&self);
        rows.extend(realign(&other));
        CsvTable::new(headers, rows)
    }
}

/// Reject uploads that are not named `*.csv`.
pub fn ensure_csv_extension(path: &Path) -> PipelineResult<()> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        Ok(())
    } else {
        Err(PipelineError::UnsupportedFile(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("<unnamed>")
                .to_string(),
        ))
    }
}

fn malformed(err: csv::Error) -> PipelineError {
    PipelineError::UnsupportedFile(format!("malformed CSV ({err})"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_trimmed() {
        let table = CsvTable::from_reader(" transit_id , pl_period\nT1,3.5\n".as_bytes()).unwrap();
        assert_eq!(table.headers(), &["transit_id".to_string(), "pl_period".to_string()]);
        assert_eq!(table.rows()[0], vec!["T1".to_string(), "3.5".to_string()]);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = CsvTable::from_reader("a,b\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFile(_)));
    }

    #[test]
    fn test_merge_aligns_columns() {
        let base = CsvTable::from_reader("a,b\n1,2\n".as_bytes()).unwrap();
        let user = CsvTable::from_reader("b,c\n3,4\n".as_bytes()).unwrap();
        let merged = base.merge(user);
        assert_eq!(merged.headers(), &["a", "b", "c"].map(String::from));
        assert_eq!(merged.rows()[0], ["1", "2", ""].map(String::from).to_vec());
        assert_eq!(merged.rows()[1], ["", "3", "4"].map(String::from).to_vec());
    }

    #[test]
    fn test_csv_extension_check() {
        assert!(ensure_csv_extension(Path::new("upload.CSV")).is_ok());
        assert!(matches!(
            ensure_csv_extension(Path::new("upload.xlsx")),
            Err(PipelineError::UnsupportedFile(_))
        ));
    }
}
