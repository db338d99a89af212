/// Up-to-date records
///
/// One JSON record per job, stored under `<state_dir>/state/<name>.json`.
/// A job is up to date when its record matches the current fingerprint and
/// the output file still holds what the last render wrote.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::fingerprint::hash_file;

const RECORD_VERSION: u32 = 1;

/// Record of the last successful render of a job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobState {
    pub version: u32,
    pub name: String,
    pub fingerprint: String,
    pub output: PathBuf,
    pub output_hash: String,
    pub rendered_at: DateTime<Utc>,
}

impl JobState {
    /// Build a record for an output that was just rendered
    pub fn capture(name: &str, fingerprint: &str, output: &Path) -> Result<Self> {
        let digest = hash_file(output)
            .with_context(|| format!("Failed to hash output: {}", output.display()))?;

        Ok(Self {
            version: RECORD_VERSION,
            name: name.to_string(),
            fingerprint: fingerprint.to_string(),
            output: output.to_path_buf(),
            output_hash: hex::encode(digest),
            rendered_at: Utc::now(),
        })
    }
}

/// Why a job needs to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    NeverRendered,
    FingerprintChanged,
    OutputMissing,
    OutputModified,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StaleReason::NeverRendered => "no previous render",
            StaleReason::FingerprintChanged => "inputs or data values changed",
            StaleReason::OutputMissing => "output file is missing",
            StaleReason::OutputModified => "output file was modified",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    UpToDate,
    Stale(StaleReason),
}

/// Store of up-to-date records
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Open (and create) the store below `state_dir`
    pub fn new(state_dir: &Path) -> Result<Self> {
        let dir = state_dir.join("state");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Get the record of a job, if one exists and can be read
    pub fn get(&self, name: &str) -> Result<Option<JobState>> {
        let path = self.record_path(name);

        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state record: {}", path.display()))?;

        match serde_json::from_str::<JobState>(&json) {
            Ok(state) if state.version == RECORD_VERSION => Ok(Some(state)),
            _ => {
                // Unreadable or outdated record - drop it
                let _ = fs::remove_file(&path);
                Ok(None)
            }
        }
    }

    /// Store the record of a job
    pub fn put(&self, state: &JobState) -> Result<()> {
        let path = self.record_path(&state.name);
        let json = serde_json::to_string_pretty(state).context("Failed to serialize state record")?;
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary state record")?;
        temp.write_all(json.as_bytes())
            .context("Failed to write temporary state record")?;
        temp.persist(&path)
            .with_context(|| format!("Failed to write state record: {}", path.display()))?;
        Ok(())
    }

    /// Remove the record of a job
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove state record: {}", path.display()))?;
        }

        Ok(())
    }

    /// List the names of all recorded jobs
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        if !self.dir.exists() {
            return Ok(names);
        }

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read state directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Remove all records
    pub fn clean_all(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).with_context(|| {
                format!("Failed to remove state directory: {}", self.dir.display())
            })?;
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("Failed to recreate state directory: {}", self.dir.display())
            })?;
        }
        Ok(())
    }

    /// Compare a job's record against its current fingerprint and output
    pub fn check(&self, name: &str, fingerprint: &str, output: &Path) -> Result<Freshness> {
        let Some(state) = self.get(name)? else {
            return Ok(Freshness::Stale(StaleReason::NeverRendered));
        };

        if state.fingerprint != fingerprint {
            return Ok(Freshness::Stale(StaleReason::FingerprintChanged));
        }

        if !output.is_file() {
            return Ok(Freshness::Stale(StaleReason::OutputMissing));
        }

        let current = hex::encode(
            hash_file(output)
                .with_context(|| format!("Failed to hash output: {}", output.display()))?,
        );
        if current != state.output_hash {
            return Ok(Freshness::Stale(StaleReason::OutputModified));
        }

        Ok(Freshness::UpToDate)
    }
}
