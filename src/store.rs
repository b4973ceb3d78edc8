//! JSON document store: one file per repository plus the run summary.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{RepoRecord, RunSummary};

pub const SUMMARY_FILE: &str = "latest_run.json";

pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self, repo: &str) -> PathBuf {
        self.dir.join(format!("{}.json", repo))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    /// Stored record for `repo`, or an empty one when missing or unreadable.
    pub fn load_record(&self, repo: &str) -> RepoRecord {
        let path = self.record_path(repo);
        if !path.exists() {
            debug!("No existing record at {}", path.display());
            return RepoRecord::new(repo);
        }

        match read_json::<RepoRecord>(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Ignoring unreadable record");
                RepoRecord::new(repo)
            }
        }
    }

    pub fn save_record(&self, record: &RepoRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.repo);
        write_json(&path, record)?;
        Ok(path)
    }

    pub fn save_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self.summary_path();
        write_json(&path, summary)?;
        Ok(path)
    }

    pub fn load_summary(&self) -> Option<RunSummary> {
        let path = self.summary_path();
        if !path.exists() {
            return None;
        }

        read_json(&path)
            .map_err(|e| {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Ignoring unreadable run summary")
            })
            .ok()
    }

    /// Every repository record in the store, ordered by file name.
    pub fn load_all_records(&self) -> Result<Vec<RepoRecord>> {
        if !self.dir.exists() {
            debug!("Data directory {} does not exist", self.dir.display());
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read data directory: {}", self.dir.display()))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter(|path| path.file_name().is_some_and(|name| name != SUMMARY_FILE))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match read_json::<RepoRecord>(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping unreadable record")
                }
            }
        }

        Ok(records)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    content.push('\n');

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyCount;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_record_returns_skeleton() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());

        let record = store.load_record("absent");
        assert_eq!(record, RepoRecord::new("absent"));
    }

    #[test]
    fn test_load_malformed_record_returns_skeleton() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        fs::write(store.record_path("broken"), "{ not json").unwrap();

        let record = store.load_record("broken");
        assert_eq!(record.repo, "broken");
        assert!(record.views.is_empty());
    }

    #[test]
    fn test_record_round_trip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("nested"));

        let mut record = RepoRecord::new("tool");
        record.owner = "octo".to_string();
        record
            .views
            .insert("2023-01-01".to_string(), DailyCount { count: 3, uniques: 1 });
        record
            .clones
            .insert("2024-01-01".to_string(), DailyCount { count: 1, uniques: 1 });

        let path = store.save_record(&record).unwrap();
        assert!(path.ends_with("nested/tool.json"));
        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
        assert_eq!(store.load_record("tool"), record);
    }

    #[test]
    fn test_load_all_records_skips_summary_and_garbage() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());

        store.save_record(&RepoRecord::new("beta")).unwrap();
        store.save_record(&RepoRecord::new("alpha")).unwrap();
        store
            .save_summary(&RunSummary {
                collected_at: "2024-01-08T06:00:00+00:00".to_string(),
                repos_checked: 2,
                ..RunSummary::default()
            })
            .unwrap();
        fs::write(dir.path().join("junk.json"), "[1, 2").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let records = store.load_all_records().unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        assert_eq!(store.load_summary().unwrap().repos_checked, 2);
    }

    #[test]
    fn test_load_all_records_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("never-created"));

        assert!(store.load_all_records().unwrap().is_empty());
        assert!(store.load_summary().is_none());
    }
}
