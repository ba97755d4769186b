use crate::incident::{Incident, ResultSummary};
use crate::prelude::{VarError, VarResult};
use crate::video::VideoInfo;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// Immutable view of the session; every write publishes a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u64,
    pub video_generation: u64,
    pub video_info: Option<VideoInfo>,
    pub incidents: Vec<Incident>,
    pub results: Option<ResultSummary>,
}

/// Versioned holder of the single session aggregate.
///
/// Readers clone an `Arc` and never see a half-applied write: uploads and
/// run completions replace the whole snapshot under the write lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Arc<SessionSnapshot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.snapshot().video_info
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.snapshot().incidents.clone()
    }

    pub fn results(&self) -> Option<ResultSummary> {
        self.snapshot().results
    }

    /// Installs metadata for a new upload and drops the previous analysis.
    pub fn replace_video(&self, info: VideoInfo) -> Arc<SessionSnapshot> {
        self.replace(|current| SessionSnapshot {
            version: current.version + 1,
            video_generation: current.video_generation + 1,
            video_info: Some(info),
            incidents: Vec::new(),
            results: None,
        })
    }

    pub fn clear_analysis(&self) -> Arc<SessionSnapshot> {
        self.replace(|current| SessionSnapshot {
            version: current.version + 1,
            incidents: Vec::new(),
            results: None,
            ..current.clone()
        })
    }

    /// Publishes incidents and results together for the upload identified by
    /// `video_generation`.
    pub fn commit_analysis(
        &self,
        video_generation: u64,
        mut incidents: Vec<Incident>,
        results: ResultSummary,
    ) -> VarResult<Arc<SessionSnapshot>> {
        incidents.sort_by(|a, b| a.timestamp_seconds().total_cmp(&b.timestamp_seconds()));
        self.publish(|current| {
            if current.video_generation != video_generation {
                return Err(VarError::InvalidState(format!(
                    "analysis targets upload {} but session holds upload {}",
                    video_generation, current.video_generation
                )));
            }
            let video = current.video_info.ok_or_else(|| {
                VarError::InvalidState("no video present to attribute incidents to".into())
            })?;
            if let Some(stray) = incidents.iter().find(|incident| {
                let at = incident.timestamp_seconds();
                !(0.0..=video.duration_seconds).contains(&at)
            }) {
                return Err(VarError::InvalidState(format!(
                    "{} incident at {:.2}s lies outside the {:.2}s clip",
                    stray.kind(),
                    stray.timestamp_seconds(),
                    video.duration_seconds
                )));
            }
            Ok(SessionSnapshot {
                version: current.version + 1,
                incidents,
                results: Some(results),
                ..current.clone()
            })
        })
    }

    /// Returns the session to its initial empty state.
    pub fn reset(&self) -> Arc<SessionSnapshot> {
        self.replace(|current| SessionSnapshot {
            version: current.version + 1,
            video_generation: current.video_generation + 1,
            ..SessionSnapshot::default()
        })
    }

    fn publish(
        &self,
        next: impl FnOnce(&SessionSnapshot) -> VarResult<SessionSnapshot>,
    ) -> VarResult<Arc<SessionSnapshot>> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(next(&guard)?);
        *guard = snapshot.clone();
        Ok(snapshot)
    }

    fn replace(
        &self,
        next: impl FnOnce(&SessionSnapshot) -> SessionSnapshot,
    ) -> Arc<SessionSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(next(&guard));
        *guard = snapshot.clone();
        snapshot
    }
}
