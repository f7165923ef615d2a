//! Security gate consulted before every navigation and input action.

pub mod errors;
pub mod gate;
pub mod model;
pub mod rate;

pub use errors::GateError;
pub use gate::SecurityGate;
pub use model::{CookieRecord, SecurityPolicy};
pub use rate::RateBucket;
