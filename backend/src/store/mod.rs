//! Submission Store - duplicate-aware persistence of raw inputs
//!
//! Raw FAST UI documents are kept one JSON file per submission, named by the
//! SHA-256 hash of their canonical JSON rendering. Submitting the same content
//! twice is reported as a duplicate and leaves the store untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::logs::{log_success, log_warning};

/// Default directory for stored submissions (relative to current dir)
pub const DEFAULT_STORE_DIR: &str = ".aim/submissions";

/// A stored raw input with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Content hash, also the file stem
    pub hash: String,
    pub product_type: String,
    pub data: Value,
    /// RFC 3339 submission time
    pub timestamp: String,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Stored(String),
    Duplicate(String),
    Error(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub by_product: BTreeMap<String, usize>,
}

/// Persistence boundary for raw inputs.
pub trait SubmissionStore {
    /// Store `data` unless identical content is already present.
    fn submit(&mut self, data: &Value, product_type: &str) -> SubmissionOutcome;

    /// All submissions, newest first.
    fn list(&self) -> Vec<&Submission>;

    fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for submission in self.list() {
            stats.total += 1;
            *stats.by_product.entry(submission.product_type.clone()).or_default() += 1;
        }
        stats
    }
}

/// SHA-256 hex digest of the canonical JSON rendering (object keys sorted).
pub fn content_hash(data: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Directory-backed store, one `<hash>.json` file per submission
pub struct JsonSubmissionStore {
    dir: PathBuf,
    submissions: HashMap<String, Submission>,
}

impl JsonSubmissionStore {
    /// Open the store at the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_STORE_DIR)
    }

    /// Open a store in `dir`, loading existing submissions.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            dir: dir.as_ref().to_path_buf(),
            submissions: HashMap::new(),
        };
        store.load_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, hash: &str) -> Option<&Submission> {
        self.submissions.get(hash)
    }

    pub fn contains(&self, data: &Value) -> bool {
        self.submissions.contains_key(&content_hash(data))
    }

    fn load_all(&mut self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match load_submission(&path) {
                Ok(submission) => {
                    self.submissions.insert(submission.hash.clone(), submission);
                }
                Err(e) => log_warning(format!("Skipping {}: {}", path.display(), e)),
            }
        }
    }

    fn write(&self, submission: &Submission) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", submission.hash));
        fs::write(path, serde_json::to_string_pretty(submission)?)?;
        Ok(())
    }
}

impl Default for JsonSubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStore for JsonSubmissionStore {
    fn submit(&mut self, data: &Value, product_type: &str) -> SubmissionOutcome {
        let hash = content_hash(data);
        if self.submissions.contains_key(&hash) {
            log_warning(format!("Duplicate submission {}", &hash[..12]));
            return SubmissionOutcome::Duplicate(hash);
        }

        let submission = Submission {
            hash: hash.clone(),
            product_type: product_type.to_string(),
            data: data.clone(),
            timestamp: chrono::Local::now().to_rfc3339(),
        };
        if let Err(e) = self.write(&submission) {
            return SubmissionOutcome::Error(e.to_string());
        }

        log_success(format!("Stored submission {}", &hash[..12]));
        self.submissions.insert(hash.clone(), submission);
        SubmissionOutcome::Stored(hash)
    }

    fn list(&self) -> Vec<&Submission> {
        let mut all: Vec<&Submission> = self.submissions.values().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
        all
    }
}

fn load_submission(path: &Path) -> Result<Submission, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
