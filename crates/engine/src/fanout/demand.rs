// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The single wait/resume primitive between branch demand and upstream pulls.
//!
//! The gate holds at most one armed `oneshot::Sender`. Branches call
//! [`DemandGate::signal`], which takes and fires it; with nothing armed the
//! signal is a no-op. The read loop owns the matching [`Demand`].
//!
//! A broadcast round runs inside a [`DemandRound`], which holds the gate lock
//! from the first capacity read until the loop either keeps demand resolved or
//! re-arms. A signal that races with the round therefore lands either before
//! the capacity read (and is seen by it) or after the re-arm (and resolves the
//! fresh sender). Every re-arm creates a new oneshot pair.

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::oneshot;

pub(super) struct DemandGate {
    armed: Mutex<Option<oneshot::Sender<()>>>,
}

impl DemandGate {
    pub(super) fn new() -> Self {
        Self {
            armed: Mutex::new(None),
        }
    }

    /// Resolves the armed wait, if any. Returns `true` when a wait was released.
    pub(super) fn signal(&self) -> bool {
        match self.armed.lock().take() {
            Some(tx) => {
                let _ignore_closed = tx.send(());
                true
            }
            None => false,
        }
    }

    pub(super) fn begin_round(&self) -> DemandRound<'_> {
        DemandRound {
            armed: self.armed.lock(),
        }
    }
}

/// Exclusive access to the gate for the duration of one broadcast round.
pub(super) struct DemandRound<'a> {
    armed: MutexGuard<'a, Option<oneshot::Sender<()>>>,
}

impl DemandRound<'_> {
    /// Ends the round with at least one branch still wanting data.
    pub(super) fn keep_resolved(self) -> Demand {
        Demand::Resolved
    }

    /// Ends the round with every branch satisfied.
    pub(super) fn rearm(mut self) -> Demand {
        let (tx, rx) = oneshot::channel();
        *self.armed = Some(tx);
        Demand::Pending(rx)
    }
}

/// The read loop's side of the gate.
pub(super) enum Demand {
    Resolved,
    Pending(oneshot::Receiver<()>),
}

impl Demand {
    pub(super) fn is_pending(&self) -> bool {
        matches!(self, Demand::Pending(_))
    }

    /// Suspends until some branch signals. Returns immediately when resolved.
    pub(super) async fn wait(self) {
        if let Demand::Pending(rx) = self {
            // A dropped sender only happens when the gate itself is gone.
            let _ignore_closed = rx.await;
        }
    }
}
