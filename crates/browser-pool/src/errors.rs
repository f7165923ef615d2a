use cdp_adapter::SurfaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    Config(String),
    #[error("browser launch failed: {0}")]
    Launch(SurfaceError),
    #[error("resource exhausted: {0}")]
    Exhausted(String),
}

