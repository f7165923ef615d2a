//! Resource pool leasing pre-warmed page surfaces to concurrent runs.

pub mod errors;
pub mod model;
pub mod pool;

pub use errors::PoolError;
pub use model::{PoolConfig, PoolStats};
pub use pool::{Lease, ResourcePool};
