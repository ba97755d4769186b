use anyhow::Context;
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use varcore::pipeline::{RunPhase, RunProgress};
use varcore::AnalysisSession;

pub type SharedSession = Arc<Mutex<AnalysisSession>>;

pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, AnalysisSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Paces pipeline ticks against the wall clock; total run time is bounded by
/// `total_ticks * interval`.
#[derive(Clone, Copy, Debug)]
pub struct AnalysisDriver {
    interval: Duration,
}

impl AnalysisDriver {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Starts a run on `session` and blocks until it completes.
    pub fn run_blocking(
        &self,
        session: &mut AnalysisSession,
        mut observer: impl FnMut(&RunProgress),
    ) -> anyhow::Result<RunProgress> {
        let mut progress = session.run_analysis().context("starting analysis")?;
        observer(&progress);
        while progress.phase == RunPhase::Running {
            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
            progress = session.tick().context("advancing analysis")?;
            observer(&progress);
        }
        Ok(progress)
    }

    /// Ticks an already started run from an async task.
    ///
    /// Stops early once `epoch` moves past `run_epoch` (a cancel or a new
    /// upload) or the session leaves `Running`.
    pub async fn drive(
        &self,
        session: SharedSession,
        epoch: Arc<AtomicU64>,
        run_epoch: u64,
    ) -> Option<RunProgress> {
        loop {
            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
            if let Step::Done(outcome) = advance(&session, &epoch, run_epoch) {
                return outcome;
            }
        }
    }
}

enum Step {
    Continue,
    Done(Option<RunProgress>),
}

// The session lock is never held across an await. Writers bump the epoch
// while holding the lock, so the check below cannot interleave with them.
fn advance(session: &SharedSession, epoch: &AtomicU64, run_epoch: u64) -> Step {
    let mut guard = lock_session(session);
    if epoch.load(Ordering::SeqCst) != run_epoch {
        return Step::Done(None);
    }
    if guard.progress().phase != RunPhase::Running {
        return Step::Done(None);
    }
    match guard.tick() {
        Ok(progress) if progress.phase == RunPhase::Complete => Step::Done(Some(progress)),
        Ok(_) => Step::Continue,
        Err(err) => {
            warn!("analysis run stopped: {}", err);
            Step::Done(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::build_clip;
    use varcore::PipelineConfig;

    fn loaded_session() -> AnalysisSession {
        let mut session = AnalysisSession::new(PipelineConfig {
            stages: vec!["Initializing".into(), "Analyzing".into()],
            ticks_per_stage: 3,
        })
        .unwrap();
        session
            .upload("demo.avi", &build_clip(750, 25).unwrap())
            .unwrap();
        session
    }

    #[test]
    fn driver_runs_session_to_completion() {
        let mut session = loaded_session();
        let driver = AnalysisDriver::new(Duration::ZERO);
        let mut percents = Vec::new();

        let last = driver
            .run_blocking(&mut session, |progress| percents.push(progress.percent))
            .unwrap();

        assert_eq!(last.phase, RunPhase::Complete);
        assert_eq!(percents.first(), Some(&0.0));
        assert_eq!(percents.last(), Some(&100.0));
        assert_eq!(percents.len(), 7);
        assert_eq!(session.incidents().len(), 3);
    }

    #[test]
    fn driver_without_video_surfaces_invalid_state() {
        let mut session = AnalysisSession::new(PipelineConfig::default()).unwrap();
        let driver = AnalysisDriver::new(Duration::ZERO);
        assert!(driver.run_blocking(&mut session, |_| {}).is_err());
    }

    #[tokio::test]
    async fn drive_stops_when_epoch_moves() {
        let mut session = loaded_session();
        session.run_analysis().unwrap();
        let shared: SharedSession = Arc::new(Mutex::new(session));
        let epoch = Arc::new(AtomicU64::new(2));

        let driver = AnalysisDriver::new(Duration::ZERO);
        assert!(driver.drive(shared.clone(), epoch, 1).await.is_none());
        assert_eq!(lock_session(&shared).progress().tick, 0);
    }

    #[tokio::test]
    async fn drive_completes_current_run() {
        let mut session = loaded_session();
        session.run_analysis().unwrap();
        let shared: SharedSession = Arc::new(Mutex::new(session));
        let epoch = Arc::new(AtomicU64::new(1));

        let driver = AnalysisDriver::new(Duration::from_millis(1));
        let done = driver.drive(shared.clone(), epoch, 1).await.unwrap();
        assert_eq!(done.percent, 100.0);
        assert!(lock_session(&shared).results().is_some());
    }

    #[tokio::test]
    async fn stale_driver_leaves_restarted_run_alone() {
        let mut session = loaded_session();
        session.run_analysis().unwrap();
        let shared: SharedSession = Arc::new(Mutex::new(session));
        let epoch = Arc::new(AtomicU64::new(1));
        {
            let mut guard = lock_session(&shared);
            assert!(guard.cancel());
            guard.run_analysis().unwrap();
            epoch.fetch_add(1, Ordering::SeqCst);
        }

        let driver = AnalysisDriver::new(Duration::ZERO);
        assert!(driver.drive(shared.clone(), epoch.clone(), 1).await.is_none());
        assert_eq!(lock_session(&shared).progress().tick, 0);

        let done = driver.drive(shared.clone(), epoch, 2).await.unwrap();
        assert_eq!(done.phase, RunPhase::Complete);
    }
}
