use crate::incident::{Incident, ResultSummary};
use crate::pipeline::{PipelineRunner, RunPhase, RunProgress};
use crate::prelude::{PipelineConfig, VarResult};
use crate::report::{self, ReportDocument};
use crate::session::store::SessionStore;
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::video::{VideoArtifact, VideoInfo, VideoMetadataExtractor};
use std::sync::Arc;

/// The boundary the presentation layer talks to: three read accessors, the
/// `upload` and `run_analysis` commands, and `export`.
pub struct AnalysisSession {
    store: Arc<SessionStore>,
    runner: PipelineRunner,
    extractor: VideoMetadataExtractor,
    artifact: Option<VideoArtifact>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl AnalysisSession {
    pub fn new(config: PipelineConfig) -> VarResult<Self> {
        Ok(Self::with_parts(
            PipelineRunner::new(config)?,
            VideoMetadataExtractor::new(),
        ))
    }

    pub fn with_parts(runner: PipelineRunner, extractor: VideoMetadataExtractor) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            runner,
            extractor,
            artifact: None,
            metrics: Arc::new(MetricsRecorder::new()),
            logger: LogManager::new("session"),
        }
    }

    /// Shared handle for readers that should not wait on session commands.
    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.store.video_info()
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.store.incidents()
    }

    pub fn results(&self) -> Option<ResultSummary> {
        self.store.results()
    }

    pub fn progress(&self) -> RunProgress {
        self.runner.progress()
    }

    pub fn video_artifact(&self) -> Option<&VideoArtifact> {
        self.artifact.as_ref()
    }

    /// Accepts a new clip. On failure the session keeps its previous video,
    /// incidents and results; on success both are dropped and any active run
    /// is cancelled.
    pub fn upload(&mut self, filename: &str, bytes: &[u8]) -> VarResult<VideoInfo> {
        let ingested = match self.extractor.ingest(filename, bytes) {
            Ok(ingested) => ingested,
            Err(err) => {
                self.metrics.record_upload(false);
                self.logger
                    .warn(&format!("upload {} rejected: {}", filename, err));
                return Err(err);
            }
        };

        if self.runner.cancel() {
            self.metrics.record_run_cancelled();
        }
        self.store.replace_video(ingested.info);
        if let Some(previous) = self.artifact.replace(ingested.artifact) {
            if let Err(err) = previous.close() {
                self.logger
                    .warn(&format!("failed to remove previous upload: {}", err));
            }
        }
        self.metrics.record_upload(true);
        Ok(ingested.info)
    }

    pub fn run_analysis(&mut self) -> VarResult<RunProgress> {
        let progress = self.runner.start(&self.store)?;
        self.metrics.record_run_started();
        Ok(progress)
    }

    pub fn tick(&mut self) -> VarResult<RunProgress> {
        let progress = self.runner.tick(&self.store)?;
        if progress.phase == RunPhase::Complete {
            self.metrics.record_run_completed();
        }
        Ok(progress)
    }

    /// Runs the whole stage sequence without pacing.
    pub fn run_to_completion(
        &mut self,
        observer: impl FnMut(&RunProgress),
    ) -> VarResult<RunProgress> {
        let progress = self.runner.run_to_completion(&self.store, observer)?;
        self.metrics.record_run_started();
        self.metrics.record_run_completed();
        Ok(progress)
    }

    pub fn cancel(&mut self) -> bool {
        let cancelled = self.runner.cancel();
        if cancelled {
            self.metrics.record_run_cancelled();
        }
        cancelled
    }

    pub fn export(&self) -> VarResult<ReportDocument> {
        report::export(&self.store.snapshot())
    }

    /// Returns to the empty session state and removes the uploaded clip.
    pub fn reset(&mut self) -> VarResult<()> {
        self.cancel();
        self.store.reset();
        if let Some(artifact) = self.artifact.take() {
            artifact.close()?;
        }
        Ok(())
    }

    /// Tears the session down.
    pub fn close(mut self) -> VarResult<()> {
        self.reset()
    }
}
