//! Session-driven incident pipeline for the VAR analysis dashboard.
//!
//! An upload is turned into container metadata, a simulated staged analysis
//! run materializes timestamped incidents, and the session can be exported
//! as a JSON report. Rendering is left to an external presentation layer that
//! only reads the session state.

pub mod incident;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod session;
pub mod telemetry;
pub mod video;

pub use prelude::{IncidentDeriver, PipelineConfig, VarError, VarResult};
pub use session::{AnalysisSession, SessionSnapshot, SessionStore};
