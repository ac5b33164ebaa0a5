use crate::error::ExtractorError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageState {
    pub fn with_status(status: StageStatus) -> Self {
        Self {
            status,
            start_time: None,
            end_time: None,
            error: None,
        }
    }
}

/// On-disk pipeline state. Stage names we do not know (from newer versions)
/// ride along untouched because the map round-trips verbatim.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub stages: BTreeMap<String, StageState>,
    pub last_update: u64,
}

pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl PipelineState {
    /// Missing file yields a fresh state; an unreadable file is
    /// StateCorruption and stops the pipeline until the operator acts.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)
            .with_context(|| format!("failed to open state file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ExtractorError::StateCorruption {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
            .into()
        })
    }

    /// Atomic save: temp file then rename.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_update = now_epoch();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp)
            .with_context(|| format!("failed to create temp state file: {}", tmp.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .context("failed to serialize pipeline state")?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to rename state file to {}", path.display()))?;
        Ok(())
    }

    pub fn status_of(&self, stage: &str) -> StageStatus {
        self.stages
            .get(stage)
            .map(|s| s.status)
            .unwrap_or(StageStatus::Pending)
    }

    pub fn mark(&mut self, stage: &str, state: StageState) {
        self.stages.insert(stage.to_string(), state);
    }

    pub fn mark_running(&mut self, stage: &str) {
        self.stages.insert(
            stage.to_string(),
            StageState {
                status: StageStatus::Running,
                start_time: Some(now_epoch()),
                end_time: None,
                error: None,
            },
        );
    }

    pub fn mark_finished(&mut self, stage: &str, status: StageStatus, error: Option<String>) {
        let start = self.stages.get(stage).and_then(|s| s.start_time);
        self.stages.insert(
            stage.to_string(),
            StageState {
                status,
                start_time: start,
                end_time: Some(now_epoch()),
                error,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_state_is_fresh() {
        let dir = TempDir::new().unwrap();
        let state = PipelineState::load(&dir.path().join("none.json")).unwrap();
        assert!(state.stages.is_empty());
        assert_eq!(state.status_of("merge"), StageStatus::Pending);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_state.json");

        let mut state = PipelineState::default();
        state.mark_running("merge");
        state.mark_finished("merge", StageStatus::Completed, None);
        state.save(&path).unwrap();

        let back = PipelineState::load(&path).unwrap();
        assert_eq!(back.status_of("merge"), StageStatus::Completed);
        assert!(back.stages["merge"].end_time.is_some());
        assert!(back.last_update > 0);
    }

    #[test]
    fn corrupt_state_refuses_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_state.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"{ not json").unwrap();

        let err = PipelineState::load(&path).unwrap_err();
        assert!(err.to_string().contains("remove or repair"));
    }

    #[test]
    fn unknown_stages_are_retained() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_state.json");
        fs::write(
            &path,
            r#"{"stages":{"future_stage":{"status":"completed"}},"last_update":1}"#,
        )
        .unwrap();

        let mut state = PipelineState::load(&path).unwrap();
        state.mark_finished("merge", StageStatus::Completed, None);
        state.save(&path).unwrap();

        let back = PipelineState::load(&path).unwrap();
        assert_eq!(back.status_of("future_stage"), StageStatus::Completed);
        assert_eq!(back.status_of("merge"), StageStatus::Completed);
    }

    #[test]
    fn failure_records_error() {
        let mut state = PipelineState::default();
        state.mark_running("filter");
        state.mark_finished("filter", StageStatus::Failed, Some("boom".to_string()));
        assert_eq!(state.status_of("filter"), StageStatus::Failed);
        assert_eq!(state.stages["filter"].error.as_deref(), Some("boom"));
    }

    #[test]
    fn no_tmp_left_after_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_state.json");
        PipelineState::default().save(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
