use crate::incident::Incident;
use crate::video::VideoInfo;
use serde::{Deserialize, Serialize};

/// Stage layout shared by the pipeline runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub stages: Vec<String>,
    pub ticks_per_stage: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                "Initializing".to_string(),
                "Loading models".to_string(),
                "Processing frames".to_string(),
                "Analyzing incidents".to_string(),
                "Complete".to_string(),
            ],
            ticks_per_stage: 20,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> VarResult<()> {
        if self.stages.is_empty() {
            return Err(VarError::InvalidConfig("at least one stage is required".into()));
        }
        if self.ticks_per_stage == 0 {
            return Err(VarError::InvalidConfig("ticks_per_stage must be positive".into()));
        }
        if self.checked_total_ticks().is_none() {
            return Err(VarError::InvalidConfig(format!(
                "{} stages x {} ticks exceeds the tick counter",
                self.stages.len(),
                self.ticks_per_stage
            )));
        }
        Ok(())
    }

    /// Saturates on layouts that `validate` rejects.
    pub fn total_ticks(&self) -> u32 {
        self.checked_total_ticks().unwrap_or(u32::MAX)
    }

    fn checked_total_ticks(&self) -> Option<u32> {
        u32::try_from(self.stages.len())
            .ok()?
            .checked_mul(self.ticks_per_stage)
    }
}

/// Common error type for session, extraction and pipeline operations.
#[derive(thiserror::Error, Debug)]
pub enum VarError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("unreadable video: {0}")]
    UnreadableVideo(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type VarResult<T> = Result<T, VarError>;

/// Turns video metadata into the incidents committed at the end of a run.
///
/// Implementations must be deterministic: the same `VideoInfo` has to yield
/// the same incidents.
pub trait IncidentDeriver: Send {
    fn derive(&self, video: &VideoInfo) -> Vec<Incident>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_spans_one_hundred_ticks() {
        let config = PipelineConfig::default();
        assert_eq!(config.stages.len(), 5);
        assert_eq!(config.total_ticks(), 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_layouts() {
        let config = PipelineConfig {
            stages: Vec::new(),
            ticks_per_stage: 4,
        };
        assert!(matches!(config.validate(), Err(VarError::InvalidConfig(_))));

        let config = PipelineConfig {
            ticks_per_stage: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VarError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_tick_counter_overflow() {
        let config = PipelineConfig {
            ticks_per_stage: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VarError::InvalidConfig(_))));
        assert_eq!(config.total_ticks(), u32::MAX);

        let config = PipelineConfig {
            stages: vec!["only".into()],
            ticks_per_stage: u32::MAX,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.total_ticks(), u32::MAX);
    }
}
