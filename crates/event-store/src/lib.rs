//! Append-only records of runs, their step logs and artifacts.

pub mod api;
pub mod errors;
pub mod model;

pub use api::{InMemoryRunStore, RunStore, StoreResult};
pub use errors::{StoreError, StoreErrorKind};
pub use model::{ArtifactRecord, RunLog, RunRecord, StepRecord};

#[cfg(test)]
mod tests;
