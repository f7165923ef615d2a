//! Target resolution for click and type actions.
//!
//! [`FallbackChain`] walks five stages in order and stops at the first hit:
//! cached descriptors for the page origin, the literal CSS selector, role or
//! placeholder/label lookups, a semantic ranking of live candidates, and
//! finally a visible-text match. Fresh hits are written back to the selector
//! memory. [`DirectResolver`] is the plain single-stage variant.

pub mod errors;
pub mod resolver;
pub mod types;

pub use errors::LocatorError;
pub use resolver::{DirectResolver, FallbackChain, TargetResolver, MEMORY_CANDIDATES, SEMANTIC_CANDIDATES};
pub use types::{Resolution, Stage, TargetOp};
