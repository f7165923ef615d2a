//! Orchestration of goals into executed, validated steps.
//!
//! [`Orchestrator`] owns the plan/execute/validate/replan control loop for a
//! single run; [`RunManager`] runs many of them on background tasks, each with
//! its own cancellation token.

pub mod error;
pub mod model;
pub mod orchestrator;
pub mod runtime;
pub mod validator;

pub use error::RunError;
pub use model::{OrchestratorConfig, RunOutcome, RunResult, RunState};
pub use orchestrator::Orchestrator;
pub use runtime::{RunHandle, RunManager};
pub use validator::{KeywordValidator, ObservationValidator, ValidationResult};
