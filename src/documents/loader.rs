//! File loaders. One call per path; failures are per file.
//!
//! Supported:
//! - `.txt`, `.md`: whole file as one document
//! - `.csv`: all rows merged into one document, `column: value` per line

use serde_json::Value;
use std::fs;
use std::path::Path;

use super::{Document, LoadError};
use crate::protocol::Metadata;

pub type Result<T> = std::result::Result<T, LoadError>;

/// Turns a file into documents.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// Loader for plain files on the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct FsLoader;

impl FsLoader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "txt" | "md" => load_text(path),
            "csv" => load_csv(path),
            _ => Err(LoadError::Unsupported(path.display().to_string())),
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn source_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "source".to_string(),
        Value::String(path.display().to_string()),
    );
    metadata
}

fn load_text(path: &Path) -> Result<Vec<Document>> {
    let text = read(path)?;
    Ok(vec![Document::new(text, source_metadata(path))])
}

fn load_csv(path: &Path) -> Result<Vec<Document>> {
    let content = read(path)?;
    let mut records = parse_csv(&content).map_err(|reason| LoadError::Malformed {
        path: path.display().to_string(),
        reason,
    })?;

    if records.is_empty() {
        return Ok(vec![Document::new(String::new(), source_metadata(path))]);
    }

    let header = records.remove(0);
    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            header
                .iter()
                .zip(record.iter().chain(std::iter::repeat(&String::new())))
                .map(|(column, value)| format!("{}: {}", column.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    let mut metadata = source_metadata(path);
    metadata.insert("rows".to_string(), Value::from(rows.len()));

    Ok(vec![Document::new(rows.join("\n\n"), metadata)])
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF or LF.
fn parse_csv(content: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_text() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("notes.TXT");
        fs::write(&path, "hello world").unwrap();

        let docs = FsLoader::new().load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "hello world");
        assert_eq!(
            docs[0].metadata["source"],
            Value::String(path.display().to_string())
        );
    }

    #[test]
    fn test_load_csv_merges_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("kpi.csv");
        fs::write(&path, "quarter,kpi\r\nQ1,\"revenue, net\"\nQ2,churn\n").unwrap();

        let docs = FsLoader::new().load(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].text,
            "quarter: Q1\nkpi: revenue, net\n\nquarter: Q2\nkpi: churn"
        );
        assert_eq!(docs[0].metadata["rows"], Value::from(2));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FsLoader::new().load(Path::new("deck.pptx")).unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = FsLoader::new().load(Path::new("/nonexistent/a.txt")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_parse_csv_quotes() {
        let records = parse_csv("a,b\n\"x \"\"y\"\"\",z").unwrap();
        assert_eq!(records, vec![vec!["a", "b"], vec!["x \"y\"", "z"]]);
        assert!(parse_csv("a,\"b").is_err());
    }
}
