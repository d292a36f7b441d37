// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The fanout coordinator: owns the source, the branch map, and the read loop.
//!
//! # Read loop
//!
//! ```text
//!   demand.wait() ──► source.try_next() ──► broadcast round ──┐
//!        ▲                                                    │
//!        │   any branch desired_capacity > 0 : Resolved       │
//!        └── otherwise                       : rearm() ◄──────┘
//! ```
//!
//! A broadcast round prunes branches observed as cancelled, enqueues the chunk
//! into every other branch, and ORs their desired capacities. One branch that
//! wants more is enough to keep pulling, so slow branches may buffer past
//! their high-water mark.
//!
//! # Locking
//!
//! Lock order is demand gate, then branch map, then branch buffer. `add()` and
//! `close()` release the map before touching a branch or signalling demand.

use crate::error::{BoxError, Error};
use crate::fanout::branch::{self, Branch, BranchController};
use crate::fanout::demand::{Demand, DemandGate};
use crate::fanout::types::{BranchId, BranchOptions, BranchSnapshot, FanoutStats, StatCounters};
use fanout_config::FanoutPolicies;
use futures::TryStreamExt;
use futures_core::TryStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Duplicates one upstream sequence to a dynamic set of branches.
///
/// All operations take `&self`; share the fanout in an `Arc` between the task
/// running [`start`](Self::start) and the tasks adding or closing branches.
pub struct Fanout<S: TryStream> {
    source: Mutex<Option<S>>,
    branches: Mutex<HashMap<BranchId, BranchController<S::Ok>>>,
    demand: Arc<DemandGate>,
    policies: FanoutPolicies,
    stats: StatCounters,
}

impl<S: TryStream> Fanout<S> {
    /// Creates a fanout over `source` with default policies.
    ///
    /// The source is not polled until [`start`](Self::start).
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::build(source, FanoutPolicies::default())
    }

    /// Creates a fanout over `source` with the given policies.
    ///
    /// Only `branch_high_water_mark` applies here, and every value of it is
    /// valid. The pipe capacity is checked by
    /// [`pipe_with_policies`](crate::pipe::pipe_with_policies).
    #[must_use]
    pub fn with_policies(source: S, policies: FanoutPolicies) -> Self {
        Self::build(source, policies)
    }

    fn build(source: S, policies: FanoutPolicies) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            branches: Mutex::new(HashMap::new()),
            demand: Arc::new(DemandGate::new()),
            policies,
            stats: StatCounters::default(),
        }
    }

    /// Policies this fanout was built with.
    #[must_use]
    pub fn policies(&self) -> &FanoutPolicies {
        &self.policies
    }

    /// Adds a branch using the fanout's default high-water mark.
    ///
    /// The branch receives every chunk broadcast after this call, never an
    /// earlier one.
    pub fn add(&self) -> Branch<S::Ok> {
        self.add_with_options(BranchOptions::default())
    }

    /// Adds a branch with per-branch options.
    pub fn add_with_options(&self, options: BranchOptions) -> Branch<S::Ok> {
        let high_water_mark = options
            .high_water_mark
            .unwrap_or(self.policies.branch_high_water_mark);
        let (branch, controller) = branch::create(high_water_mark, Arc::clone(&self.demand));
        let id = branch.id();
        // Ids are process-wide unique, so the slot is always vacant.
        _ = self.branches.lock().insert(id, controller);
        StatCounters::bump(&self.stats.branches_added, 1);
        tracing::debug!(branch = %id, high_water_mark, "branch added");

        // A fresh branch asks for data once, as a pull-based endpoint does after start.
        if high_water_mark > 0 {
            _ = self.demand.signal();
        }
        branch
    }

    /// Closes a branch and removes it from the fanout.
    ///
    /// Returns `false` when the branch is unknown or already removed, for
    /// example after a cancelled branch was pruned.
    pub fn close(&self, id: BranchId) -> bool {
        let removed = self.branches.lock().remove(&id);
        let Some(controller) = removed else {
            tracing::debug!(branch = %id, "close ignored for unknown branch");
            return false;
        };
        controller.close();
        StatCounters::bump(&self.stats.branches_closed, 1);
        tracing::debug!(branch = %id, "branch closed");
        true
    }

    /// Closes every branch. Returns the number of branches closed.
    ///
    /// Upstream exhaustion does not end branches; call this after
    /// [`start`](Self::start) returns to propagate completion.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.branches.lock().drain().map(|(_, c)| c).collect();
        for controller in &drained {
            controller.close();
            tracing::debug!(branch = %controller.id(), "branch closed");
        }
        let count = drained.len();
        StatCounters::bump(&self.stats.branches_closed, count as u64);
        count
    }

    /// Number of entries in the branch map.
    ///
    /// A branch cancelled by its consumer keeps counting until the next
    /// broadcast round prunes it.
    #[must_use]
    pub fn size(&self) -> usize {
        self.branches.lock().len()
    }

    /// Per-branch view of the branch map, ordered by branch id.
    ///
    /// Each entry is also logged at debug level.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BranchSnapshot> {
        let mut entries: Vec<_> = self
            .branches
            .lock()
            .values()
            .map(BranchController::snapshot)
            .collect();
        entries.sort_by_key(|entry| entry.id);
        for entry in &entries {
            tracing::debug!(
                branch = %entry.id,
                state = ?entry.state,
                buffered = entry.buffered,
                desired_capacity = entry.desired_capacity,
                "fanout branch"
            );
        }
        entries
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> FanoutStats {
        self.stats.load()
    }
}

impl<S> Fanout<S>
where
    S: TryStream + Unpin,
    S::Error: Into<BoxError>,
    S::Ok: Clone,
{
    /// Runs the read loop until the source is exhausted.
    ///
    /// Each iteration waits for demand, pulls one chunk, and broadcasts it.
    /// Exhaustion returns `Ok(())` and leaves every branch open. A source
    /// failure is returned as [`Error::Upstream`], also leaving branches open.
    pub async fn start(&self) -> Result<(), Error> {
        let source = self.source.lock().take();
        let Some(mut source) = source else {
            return Err(Error::AlreadyStarted);
        };

        let mut demand = Demand::Resolved;
        loop {
            demand.wait().await;
            let chunk = match source.try_next().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    tracing::debug!(branches = self.size(), "upstream exhausted");
                    return Ok(());
                }
                Err(err) => {
                    let cause: BoxError = err.into();
                    tracing::warn!(error = %cause, "upstream pull failed");
                    return Err(Error::Upstream { source: cause });
                }
            };
            StatCounters::bump(&self.stats.chunks_pulled, 1);
            demand = self.broadcast(chunk);
        }
    }

    fn broadcast(&self, chunk: S::Ok) -> Demand {
        let round = self.demand.begin_round();
        let mut branches = self.branches.lock();
        let mut wants_more = false;
        let mut pruned = 0u64;

        branches.retain(|id, controller| {
            if controller.is_cancelled() {
                tracing::debug!(branch = %id, "pruned cancelled branch");
                pruned += 1;
                return false;
            }
            if controller.enqueue(chunk.clone()) > 0 {
                wants_more = true;
            }
            true
        });
        let delivered = branches.len();
        drop(branches);

        StatCounters::bump(&self.stats.branches_pruned, pruned);
        let demand = if wants_more {
            round.keep_resolved()
        } else {
            round.rearm()
        };
        tracing::trace!(delivered, pruned, waiting = demand.is_pending(), "chunk broadcast");
        demand
    }
}
