mod records;

pub use records::*;

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Read every record from a newline-delimited JSON log. A missing file is
/// an empty log, not an error.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).map_err(|e| StoreError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| StoreError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            source: e,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Append one record as a single line. Records are never rewritten; a later
/// append for the same key supersedes at load time.
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Append {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let line = serde_json::to_string(record)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::Append {
            path: path.to_path_buf(),
            source: e,
        })?;
    writeln!(file, "{}", line).map_err(|e| StoreError::Append {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Rewrite a JSONL file wholesale (sample manifest only; the stage logs are
/// append-only).
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Append {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let mut lines = String::new();
    for record in records {
        lines.push_str(&serde_json::to_string(record)?);
        lines.push('\n');
    }
    std::fs::write(path, lines).map_err(|e| StoreError::Append {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Collapse a log into a key-value view where the last occurrence of a key
/// wins.
pub fn latest_by_key<T, K, F>(records: Vec<T>, key_fn: F) -> HashMap<K, T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut map = HashMap::new();
    for record in records {
        map.insert(key_fn(&record), record);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
        value: i32,
    }

    #[test]
    fn test_append_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/log.jsonl");

        append_jsonl(&path, &Row { id: "a".into(), value: 1 }).unwrap();
        append_jsonl(&path, &Row { id: "b".into(), value: 2 }).unwrap();

        let rows: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, 2);
    }

    #[test]
    fn test_read_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = read_jsonl(&dir.path().join("absent.jsonl")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_latest_by_key_last_wins() {
        let rows = vec![
            Row { id: "a".into(), value: 1 },
            Row { id: "b".into(), value: 2 },
            Row { id: "a".into(), value: 3 },
        ];

        let map = latest_by_key(rows, |r| r.id.clone());
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"].value, 3);
    }

    #[test]
    fn test_write_jsonl_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.jsonl");

        write_jsonl(&path, &[Row { id: "a".into(), value: 1 }]).unwrap();
        write_jsonl(&path, &[Row { id: "b".into(), value: 2 }]).unwrap();

        let rows: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "b");
    }
}
