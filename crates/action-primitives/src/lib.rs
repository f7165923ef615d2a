//! Action primitives: timed navigate/click/fill/upload against a page surface,
//! bounded exponential-backoff retry, and the transient-fault taxonomy.

pub mod errors;
mod primitives;
mod retry;
pub mod types;

pub use errors::ActionError;
pub use primitives::{pause, Primitives};
pub use retry::retry_async;
pub use types::{ActionReport, RetryPolicy, Timeouts};

#[cfg(test)]
mod tests;
