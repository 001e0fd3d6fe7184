//! Generation sessions: one snapshot, trigger, re-snapshot, resolve sequence each.

pub mod controller;
pub mod registry;
pub mod state;

pub use controller::GenerationController;
pub use registry::SessionRegistry;
pub use state::{Attribution, NoProgress, ProgressSink, SessionOutcome, SessionState};
