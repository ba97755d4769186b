use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use varcore::pipeline::PipelineRunner;
use varcore::video::VideoMetadataExtractor;
use varcore::{AnalysisSession, PipelineConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub stages: Vec<String>,
    pub ticks_per_stage: u32,
    pub tick_interval_ms: u64,
    pub temp_dir: Option<PathBuf>,
    pub report_dir: PathBuf,
    pub bind: SocketAddr,
    /// Clip produced by `--demo`.
    pub demo: GeneratorConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            stages: pipeline.stages,
            ticks_per_stage: pipeline.ticks_per_stage,
            tick_interval_ms: 10,
            temp_dir: None,
            report_dir: PathBuf::from("reports"),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            demo: GeneratorConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .to_pipeline_config()
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(ticks_per_stage: u32, tick_interval_ms: u64) -> Self {
        Self {
            ticks_per_stage,
            tick_interval_ms,
            ..Default::default()
        }
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            stages: self.stages.clone(),
            ticks_per_stage: self.ticks_per_stage,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn build_session(&self) -> anyhow::Result<AnalysisSession> {
        let runner = PipelineRunner::new(self.to_pipeline_config())
            .context("building pipeline runner")?;
        let extractor = match &self.temp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating upload dir {}", dir.display()))?;
                VideoMetadataExtractor::with_temp_dir(dir.clone())
            }
            None => VideoMetadataExtractor::new(),
        };
        Ok(AnalysisSession::with_parts(runner, extractor))
    }
}
