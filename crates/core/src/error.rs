use crate::types::UserId;
use thiserror::Error;

pub type RecoResult<T> = Result<T, RecoError>;

#[derive(Error, Debug)]
pub enum RecoError {
    /// Fatal at startup: an artifact is missing, unparseable, or fails a
    /// shape/invariant check. A process that hits this must not serve queries.
    #[error("Artifact load error: {0}")]
    ArtifactLoad(String),

    /// Per-query lookup miss (unknown id in a codec or catalog table).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The queried user has no embedding. Distinct from "user exists but has
    /// zero recommendations", which is an empty result.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RecoError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
