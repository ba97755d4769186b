use crate::incident::{FixedOffsetDeriver, ResultSummary};
use crate::pipeline::progress::{ProgressCurve, RunPhase, RunProgress};
use crate::prelude::{IncidentDeriver, PipelineConfig, VarError, VarResult};
use crate::session::SessionStore;
use crate::telemetry::LogManager;
use crate::video::VideoInfo;

enum RunState {
    Idle,
    Running {
        tick: u32,
        video: VideoInfo,
        video_generation: u64,
    },
    Complete,
}

/// Drives the simulated analysis stages one tick at a time.
///
/// `Idle -> Running -> Complete`. Wall-clock pacing belongs to the caller;
/// the runner only counts ticks, so a run is reproducible in tests.
pub struct PipelineRunner {
    config: PipelineConfig,
    curve: ProgressCurve,
    deriver: Box<dyn IncidentDeriver>,
    state: RunState,
    logger: LogManager,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> VarResult<Self> {
        Self::with_deriver(config, Box::new(FixedOffsetDeriver))
    }

    pub fn with_deriver(
        config: PipelineConfig,
        deriver: Box<dyn IncidentDeriver>,
    ) -> VarResult<Self> {
        config.validate()?;
        Ok(Self {
            curve: ProgressCurve::new(&config),
            config,
            deriver,
            state: RunState::Idle,
            logger: LogManager::new("pipeline"),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        match self.state {
            RunState::Idle => RunPhase::Idle,
            RunState::Running { .. } => RunPhase::Running,
            RunState::Complete => RunPhase::Complete,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == RunPhase::Running
    }

    pub fn progress(&self) -> RunProgress {
        match self.state {
            RunState::Idle => self.report(RunPhase::Idle, 0),
            RunState::Running { tick, .. } => self.report(RunPhase::Running, tick),
            RunState::Complete => self.report(RunPhase::Complete, self.curve.total_ticks()),
        }
    }

    /// Enters `Running` for the video currently in `store`, clearing any
    /// previous analysis first.
    pub fn start(&mut self, store: &SessionStore) -> VarResult<RunProgress> {
        if self.is_running() {
            return Err(VarError::InvalidState("analysis already running".into()));
        }
        let current = store.snapshot();
        let video = current
            .video_info
            .ok_or_else(|| VarError::InvalidState("no video uploaded".into()))?;

        store.clear_analysis();
        self.state = RunState::Running {
            tick: 0,
            video,
            video_generation: current.video_generation,
        };
        self.logger.record(&format!(
            "run started: {} stages over {} ticks",
            self.config.stages.len(),
            self.curve.total_ticks()
        ));
        Ok(self.progress())
    }

    /// Advances one tick. The tick that reaches 100% derives the incidents and
    /// commits them together with the result summary.
    pub fn tick(&mut self, store: &SessionStore) -> VarResult<RunProgress> {
        let (tick, video, video_generation) = match self.state {
            RunState::Running {
                tick,
                video,
                video_generation,
            } => (tick + 1, video, video_generation),
            _ => return Err(VarError::InvalidState("no analysis running".into())),
        };

        let previous_stage = self.curve.stage_at(tick - 1);
        if tick < self.curve.total_ticks() {
            self.state = RunState::Running {
                tick,
                video,
                video_generation,
            };
            let stage = self.curve.stage_at(tick);
            if stage != previous_stage {
                self.logger.record(&format!(
                    "stage {}/{}: {}",
                    stage + 1,
                    self.config.stages.len(),
                    self.config.stages[stage]
                ));
            }
            return Ok(self.report(RunPhase::Running, tick));
        }

        let incidents = self.deriver.derive(&video);
        let incident_count = incidents.len();
        let results = ResultSummary {
            processed_frame_count: video.frame_count,
        };
        if let Err(err) = store.commit_analysis(video_generation, incidents, results) {
            self.state = RunState::Idle;
            self.logger.warn(&format!("run discarded: {}", err));
            return Err(err);
        }

        self.state = RunState::Complete;
        self.logger.record(&format!(
            "run complete: {} frames, {} incidents",
            video.frame_count, incident_count
        ));
        Ok(self.report(RunPhase::Complete, tick))
    }

    /// Abandons a running analysis without touching the session.
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = RunState::Idle;
        self.logger.record("run cancelled");
        true
    }

    /// Starts a run and ticks it to completion, handing every progress report
    /// (including the initial 0%) to `observer`.
    pub fn run_to_completion(
        &mut self,
        store: &SessionStore,
        mut observer: impl FnMut(&RunProgress),
    ) -> VarResult<RunProgress> {
        let mut progress = self.start(store)?;
        observer(&progress);
        while progress.phase == RunPhase::Running {
            progress = self.tick(store)?;
            observer(&progress);
        }
        Ok(progress)
    }

    fn report(&self, phase: RunPhase, tick: u32) -> RunProgress {
        let stage_index = self.curve.stage_at(tick);
        RunProgress {
            phase,
            stage_index,
            stage_name: self.config.stages[stage_index].clone(),
            percent: self.curve.percent_at(tick),
            tick,
            total_ticks: self.curve.total_ticks(),
        }
    }
}
