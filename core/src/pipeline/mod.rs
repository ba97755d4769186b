pub mod progress;
pub mod runner;

pub use progress::{ProgressCurve, RunPhase, RunProgress};
pub use runner::PipelineRunner;
