use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Session counters surfaced to the presentation layer.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uploads_accepted: usize,
    pub uploads_rejected: usize,
    pub runs_started: usize,
    pub runs_completed: usize,
    pub runs_cancelled: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_upload(&self, accepted: bool) {
        self.update(|metrics| {
            if accepted {
                metrics.uploads_accepted += 1;
            } else {
                metrics.uploads_rejected += 1;
            }
        });
    }

    pub fn record_run_started(&self) {
        self.update(|metrics| metrics.runs_started += 1);
    }

    pub fn record_run_completed(&self) {
        self.update(|metrics| metrics.runs_completed += 1);
    }

    pub fn record_run_cancelled(&self) {
        self.update(|metrics| metrics.runs_cancelled += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_each_event_kind() {
        let metrics = MetricsRecorder::new();
        metrics.record_upload(true);
        metrics.record_upload(false);
        metrics.record_upload(false);
        metrics.record_run_started();
        metrics.record_run_completed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.uploads_accepted, 1);
        assert_eq!(snapshot.uploads_rejected, 2);
        assert_eq!(snapshot.runs_started, 1);
        assert_eq!(snapshot.runs_completed, 1);
        assert_eq!(snapshot.runs_cancelled, 0);
    }
}
