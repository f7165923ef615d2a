//! Single-action execution.
//!
//! [`ActionExecutor`] consults the security gate before navigation and input,
//! resolves click/type targets through a [`action_locator::TargetResolver`],
//! retries transient primitive faults, and reports each outcome as an
//! observation string such as `navigated:<url>` or `extract:<sel>:<text>`.

pub mod errors;
pub mod executor;
pub mod types;

pub use errors::ExecError;
pub use executor::ActionExecutor;
pub use types::{ExecutorConfig, ResolverKind};
