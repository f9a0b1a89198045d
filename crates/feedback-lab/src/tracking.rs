//! Experiment tracking seam.
//!
//! Directors never record anything themselves. Orchestration code holds a
//! [`Tracker`] and records at its own boundaries, usually through
//! [`record_or_warn`] so a tracking outage does not fail the run.

use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Destination of the resolved configuration of a run.
pub const RUN_CONFIGURATION: &str = "run_configuration.json";

/// Stores run artifacts.
pub trait Tracker: Send + Sync {
    /// Record `artifact` under `destination`, a relative path such as
    /// `"teacher_model/prompt.json"`.
    fn record(&self, artifact: &Value, destination: &str) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl Tracker for NoopTracker {
    fn record(&self, _artifact: &Value, _destination: &str) -> Result<()> {
        Ok(())
    }
}

/// Keeps artifacts in memory, in recording order.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    records: Mutex<Vec<(String, Value)>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(String, Value)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recent artifact recorded under `destination`.
    pub fn get(&self, destination: &str) -> Option<Value> {
        self.records()
            .into_iter()
            .rev()
            .find(|(d, _)| d == destination)
            .map(|(_, v)| v)
    }
}

impl Tracker for MemoryTracker {
    fn record(&self, artifact: &Value, destination: &str) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| Error::Tracking("memory tracker lock poisoned".into()))?
            .push((destination.to_string(), artifact.clone()));
        Ok(())
    }
}

/// Writes artifacts as pretty JSON under `<root>/artifacts/<run_id>/`.
///
/// Each file wraps the artifact in an envelope:
///
/// ```json
/// {"run_id": "...", "recorded_at": "2024-05-01T12:00:00+00:00", "artifact": ...}
/// ```
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    run_id: String,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            run_id: run_id.into(),
        }
    }

    /// Store for a fresh run named after the current UTC time.
    pub fn timestamped(root: impl Into<PathBuf>) -> Self {
        let run_id = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        Self::new(root, run_id)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Directory that holds this run's artifacts.
    pub fn run_dir(&self) -> PathBuf {
        self.root.join("artifacts").join(&self.run_id)
    }

    /// Read back the artifact stored under `destination`, without its envelope.
    pub fn load(&self, destination: &str) -> Result<Value> {
        let path = self.path_for(destination)?;
        let data = std::fs::read_to_string(&path)?;
        let mut envelope: Value = serde_json::from_str(&data)?;
        Ok(envelope
            .get_mut("artifact")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    fn path_for(&self, destination: &str) -> Result<PathBuf> {
        let relative = Path::new(destination);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if destination.is_empty() || escapes {
            return Err(Error::Tracking(format!(
                "destination '{destination}' must be a relative path inside the run directory"
            )));
        }
        Ok(self.run_dir().join(relative))
    }
}

impl Tracker for LocalArtifactStore {
    fn record(&self, artifact: &Value, destination: &str) -> Result<()> {
        let path = self.path_for(destination)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let envelope = json!({
            "run_id": self.run_id,
            "recorded_at": chrono::Utc::now().to_rfc3339(),
            "artifact": artifact,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&envelope)?)?;
        debug!("[tracking] recorded {} to {}", destination, path.display());
        Ok(())
    }
}

/// Record and log a warning on failure instead of propagating it.
///
/// Returns whether the artifact was recorded.
pub fn record_or_warn(tracker: &dyn Tracker, artifact: &Value, destination: &str) -> bool {
    match tracker.record(artifact, destination) {
        Ok(()) => true,
        Err(e) => {
            warn!("[tracking] failed to record {destination}: {e}");
            false
        }
    }
}
