use serde::{Deserialize, Serialize};
use varcore::incident::{Incident, ResultSummary};
use varcore::pipeline::RunProgress;
use varcore::telemetry::MetricsSnapshot;
use varcore::video::VideoInfo;

/// Everything the presentation layer renders, in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub version: u64,
    pub video_info: Option<VideoInfo>,
    pub incidents: Vec<Incident>,
    pub results: Option<ResultSummary>,
    pub progress: RunProgress,
    pub metrics: MetricsSnapshot,
}
