// Source Readers / Writers - filesystem edges of the pipeline
// JSON-LD document discovery plus JSON output. The readers for the tabular
// and Lua name datasets live with their providers in names.rs.

use anyhow::{Context, Result};
use glob::glob;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::warn;

/// Discover and deserialize every `*.jsonld` document in a directory.
///
/// The file stem is the person ID (one document per person). Documents that
/// fail to parse are skipped with a warning; whether an empty result is
/// fatal is the caller's call. Results are sorted by person ID so processing
/// order never depends on directory enumeration order.
pub fn scan_documents(dir: &Path) -> Result<Vec<(String, Value)>> {
    let pattern = dir.join("*.jsonld");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("non-UTF-8 path {}", dir.display()))?;

    let mut documents = Vec::new();
    for entry in glob(pattern).context("invalid glob pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "unreadable directory entry");
                continue;
            }
        };

        let person_id = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };

        match read_document(&path) {
            Ok(document) => documents.push((person_id, document)),
            Err(err) => warn!(path = %path.display(), %err, "skipping unparseable document"),
        }
    }

    documents.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(documents)
}

fn read_document(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cantobench-{}-{}",
            tag,
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_scan_sorted_by_person_id() {
        let dir = temp_dir("scan");
        fs::write(dir.join("Q2.jsonld"), r#"{"@graph": []}"#).unwrap();
        fs::write(dir.join("Q1.jsonld"), r#"{"@graph": []}"#).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let documents = scan_documents(&dir).unwrap();
        let ids: Vec<&str> = documents.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_scan_skips_unparseable() {
        let dir = temp_dir("bad");
        fs::write(dir.join("Q1.jsonld"), r#"{"@graph": []}"#).unwrap();
        fs::write(dir.join("Q2.jsonld"), "not json at all").unwrap();

        let documents = scan_documents(&dir).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].0, "Q1");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_scan_empty_dir_is_ok_empty() {
        let dir = temp_dir("empty");
        assert!(scan_documents(&dir).unwrap().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_json_roundtrip() {
        let dir = temp_dir("write");
        let path = dir.join("nested/out.json");
        write_json(&path, &json!({"ok": true})).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["ok"], json!(true));

        fs::remove_dir_all(&dir).unwrap();
    }
}
