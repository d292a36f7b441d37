// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors produced by the fanout, its branches, and the upstream pipe.

use crate::fanout::BranchId;

/// Boxed error produced by an upstream source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by fanout operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Pulling from the upstream source failed; the read loop stopped.
    #[error("upstream source failed: {source}")]
    Upstream {
        /// Error reported by the source.
        source: BoxError,
    },
    /// The read loop was started a second time; the source is consumed once.
    #[error("fanout read loop already started")]
    AlreadyStarted,
    /// The branch was closed by the fanout and every buffered chunk was read.
    #[error("branch `{branch}` is closed")]
    BranchClosed {
        /// Identity of the closed branch.
        branch: BranchId,
    },
    /// The branch was cancelled by its own consumer.
    #[error("branch `{branch}` was cancelled")]
    BranchCancelled {
        /// Identity of the cancelled branch.
        branch: BranchId,
    },
    /// The reading half of an upstream pipe is gone.
    #[error("upstream pipe reader dropped")]
    PipeClosed,
    /// Fanout policies were rejected.
    #[error("invalid fanout configuration: {reason}")]
    InvalidConfig {
        /// Validation error details.
        reason: String,
    },
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Upstream { .. } => "fanout_upstream_failed",
            Error::AlreadyStarted => "fanout_already_started",
            Error::BranchClosed { .. } => "fanout_branch_closed",
            Error::BranchCancelled { .. } => "fanout_branch_cancelled",
            Error::PipeClosed => "fanout_pipe_closed",
            Error::InvalidConfig { .. } => "fanout_invalid_config",
        }
    }

    /// Returns `true` for the terminal read results of a branch.
    #[must_use]
    pub fn is_end_of_branch(&self) -> bool {
        matches!(
            self,
            Error::BranchClosed { .. } | Error::BranchCancelled { .. }
        )
    }
}
