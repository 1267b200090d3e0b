//! Error types surfaced by the drill engine.
//!
//! Malformed submissions and oracle failures are recovered inside grading and
//! never appear here.

use thiserror::Error;

use crate::model::ExerciseDirection;

/// Errors returned by [`DrillEngine`](crate::engine::DrillEngine) operations.
#[derive(Debug, Error)]
pub enum DrillError {
    /// The request carried no authenticated identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// No verb exists with the requested id.
    #[error("verb not found: {id}")]
    VerbNotFound { id: String },

    /// No user exists with the requested id.
    #[error("user not found: {id}")]
    UserNotFound { id: String },

    /// There is nothing to select from.
    #[error("no verbs available for {direction} exercises")]
    EmptyCorpus { direction: ExerciseDirection },

    /// The record store failed.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl DrillError {
    /// Returns `true` if the caller should be shown an access-denied response.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, DrillError::NotAuthenticated)
    }

    /// Returns `true` if the request named something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DrillError::VerbNotFound { .. } | DrillError::UserNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DrillError>;
