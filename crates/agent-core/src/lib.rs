//! Planner collaborator boundary and step helpers.
//!
//! The [`Planner`] trait is what the orchestrator talks to; [`build_planner`]
//! picks the HTTP-backed or mock implementation once at startup. Step text is
//! routed to a [`Role`] by keyword, and [`interpret_loose`] offers a best-effort
//! reading of free-text steps for the single-agent path.

pub mod errors;
pub mod http;
pub mod loose;
pub mod mock;
pub mod plan_text;
pub mod planner;
pub mod roles;

pub use errors::PlannerError;
pub use http::HttpPlanner;
pub use loose::{interpret_loose, LooseStep};
pub use mock::MockPlanner;
pub use plan_text::{parse_plan_text, DEFAULT_PLAN};
pub use planner::{build_planner, Planner, PlannerConfig, SharedPlanner};
pub use roles::Role;
