#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    #[error("taxonomy declares no tiers")]
    Empty,
    #[error("invalid id {0:?}")]
    InvalidId(String),
    #[error("duplicate tier id: {0}")]
    DuplicateTier(String),
    #[error("duplicate dimension id: {0}")]
    DuplicateDimension(String),
    #[error("unknown tier: {0}")]
    UnknownTier(String),
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),
    #[error("dimension {dim} does not belong to tier {tier}")]
    TierMismatch { tier: String, dim: String },
}

/// Failure of an asynchronous collaborator. Callers keep their prior state and may retry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("persistence: {0}")]
pub struct PersistError(pub String);
