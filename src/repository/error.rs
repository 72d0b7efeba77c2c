//! Repository error types

use crate::timeline::PlanId;

/// Failure while listing plans
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed plan payload: {0}")]
    Parse(String),
}

/// Failure while applying a patch to one plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("plan {0} not found")]
    NotFound(PlanId),

    #[error("invalid update: {0}")]
    Validation(String),

    #[error("transport failure: {0}")]
    Transport(String),
}
