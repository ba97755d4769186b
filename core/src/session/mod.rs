pub mod controller;
pub mod store;

pub use controller::AnalysisSession;
pub use store::{SessionSnapshot, SessionStore};
