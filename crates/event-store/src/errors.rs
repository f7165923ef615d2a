use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreErrorKind {
    #[error("unknown run: {0}")]
    UnknownRun(String),
    #[error("persist failed: {0}")]
    Persist(String),
    #[error("load failed: {0}")]
    Load(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(transparent)]
pub struct StoreError(pub StoreErrorKind);

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StoreErrorKind {
        &self.0
    }

    pub fn unknown_run(id: impl Into<String>) -> Self {
        Self(StoreErrorKind::UnknownRun(id.into()))
    }
}
