//! Working out which bucket objects a generation job produced.
//!
//! The workflow does not reliably report what it wrote, so the bucket is
//! listed before and after the job and the two listings are compared.

pub mod resolve;
pub mod snapshot;

pub use resolve::{AttributionUncertain, Resolution, ResultSet, resolve};
pub use snapshot::{SnapshotSet, diff};
