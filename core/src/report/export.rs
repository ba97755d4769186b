use crate::incident::Incident;
use crate::prelude::VarResult;
use crate::session::SessionSnapshot;
use crate::video::VideoInfo;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_MIME_TYPE: &str = "application/json";

/// Serialized form of a session export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    /// Capture time, RFC 3339.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoSummary>,
    #[serde(default)]
    pub total_incidents: usize,
    pub incidents: Vec<Incident>,
}

impl IncidentReport {
    pub fn captured_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub resolution: String,
    pub duration: f64,
    pub frames: u64,
    pub fps: f64,
}

impl From<&VideoInfo> for VideoSummary {
    fn from(info: &VideoInfo) -> Self {
        Self {
            resolution: info.resolution(),
            duration: info.duration_seconds,
            frames: info.frame_count,
            fps: info.frame_rate,
        }
    }
}

/// A downloadable report: file name, MIME type and JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub filename: String,
    pub mime_type: &'static str,
    pub body: String,
}

impl ReportDocument {
    pub fn write_to(&self, dir: &Path) -> VarResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        fs::write(&path, &self.body)?;
        Ok(path)
    }
}

pub fn export(snapshot: &SessionSnapshot) -> VarResult<ReportDocument> {
    export_at(snapshot, Utc::now())
}

/// Renders `snapshot` as captured at `captured_at`. Empty sessions export an
/// empty incident list.
pub fn export_at(
    snapshot: &SessionSnapshot,
    captured_at: DateTime<Utc>,
) -> VarResult<ReportDocument> {
    let report = IncidentReport {
        timestamp: captured_at.to_rfc3339(),
        video: snapshot.video_info.as_ref().map(VideoSummary::from),
        total_incidents: snapshot.incidents.len(),
        incidents: snapshot.incidents.clone(),
    };
    Ok(ReportDocument {
        filename: format!("var_report_{}.json", captured_at.format("%Y%m%d_%H%M%S")),
        mime_type: REPORT_MIME_TYPE,
        body: serde_json::to_string_pretty(&report)?,
    })
}

pub fn parse(body: &str) -> VarResult<IncidentReport> {
    Ok(serde_json::from_str(body)?)
}
