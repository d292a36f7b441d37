// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Value types shared by the coordinator and its branches.
//!
//! Nothing here holds a lock or signals demand.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BRANCH_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide unique identity of a branch.
///
/// Assigned monotonically at creation; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(u64);

impl BranchId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BRANCH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identity.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "branch-{}", self.0)
    }
}

/// Lifecycle of a branch. Only `Active` ever transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// Receives every broadcast chunk.
    Active,
    /// Abandoned by its consumer; pruned on the next broadcast round.
    Cancelled,
    /// Closed through the fanout; buffered chunks remain readable.
    Closed,
}

impl BranchState {
    /// Returns `true` while the branch still receives chunks.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, BranchState::Active)
    }
}

/// Options provided when adding a branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchOptions {
    /// Buffered-chunk count at which the branch stops asking for more.
    /// `None` uses the fanout's `branch_high_water_mark` policy.
    pub high_water_mark: Option<usize>,
}

/// Point-in-time view of one entry of the branch map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSnapshot {
    /// Branch identity.
    pub id: BranchId,
    /// Current lifecycle state.
    pub state: BranchState,
    /// Chunks delivered but not yet read.
    pub buffered: usize,
    /// High-water mark minus buffered chunks; 0 once inactive.
    pub desired_capacity: isize,
}

/// Lifetime counters of a fanout.
///
/// Outside the window between a consumer cancel and the next broadcast,
/// `size == branches_added - branches_closed - branches_pruned`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutStats {
    /// Chunks pulled from upstream and broadcast.
    pub chunks_pulled: u64,
    /// Branches created through `add`.
    pub branches_added: u64,
    /// Branches removed through `close` or `close_all`.
    pub branches_closed: u64,
    /// Cancelled branches removed by a broadcast round.
    pub branches_pruned: u64,
}

#[derive(Default)]
pub(super) struct StatCounters {
    pub(super) chunks_pulled: AtomicU64,
    pub(super) branches_added: AtomicU64,
    pub(super) branches_closed: AtomicU64,
    pub(super) branches_pruned: AtomicU64,
}

impl StatCounters {
    pub(super) fn bump(counter: &AtomicU64, by: u64) {
        _ = counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(super) fn load(&self) -> FanoutStats {
        FanoutStats {
            chunks_pulled: self.chunks_pulled.load(Ordering::Relaxed),
            branches_added: self.branches_added.load(Ordering::Relaxed),
            branches_closed: self.branches_closed.load(Ordering::Relaxed),
            branches_pruned: self.branches_pruned.load(Ordering::Relaxed),
        }
    }
}
