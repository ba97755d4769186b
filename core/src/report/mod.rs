pub mod export;

pub use export::{
    export, export_at, parse, IncidentReport, ReportDocument, VideoSummary, REPORT_MIME_TYPE,
};
