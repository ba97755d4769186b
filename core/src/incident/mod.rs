pub mod derive;
pub mod model;

pub use derive::FixedOffsetDeriver;
pub use model::{Declaration, Incident, IncidentType, ResultSummary};
