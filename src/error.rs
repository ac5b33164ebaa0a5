use std::path::PathBuf;
use thiserror::Error;

/// Fatal error classes. Recoverable per-page faults are counted and skipped
/// inside their stage and never surface through this type.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The outer structure of a dump is unreadable (bad bz2 stream,
    /// truncated XML root, unparseable SQL). Fatal for the stage.
    #[error("malformed dump {path}: {detail}")]
    MalformedDump { path: PathBuf, detail: String },

    /// The pipeline state file exists but cannot be parsed. The pipeline
    /// refuses to run until the operator removes or repairs it.
    #[error("pipeline state file {path} is corrupt: {detail}; remove or repair it to continue")]
    StateCorruption { path: PathBuf, detail: String },

    /// `from_stage` named a stage that is not part of the DAG.
    #[error("unknown stage '{0}'")]
    UnknownStage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_corruption_message_tells_operator_what_to_do() {
        let err = ExtractorError::StateCorruption {
            path: PathBuf::from("/work/pipeline_state.json"),
            detail: "expected value at line 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pipeline_state.json"));
        assert!(msg.contains("remove or repair"));
    }

    #[test]
    fn unknown_stage_names_the_stage() {
        let err = ExtractorError::UnknownStage("normalise".to_string());
        assert!(err.to_string().contains("normalise"));
    }
}
