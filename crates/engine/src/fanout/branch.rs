// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! One downstream endpoint of a fanout.
//!
//! # Structure
//!
//! A branch is split in two halves sharing one `BranchShared<T>`:
//! - [`Branch<T>`] is the consumer-facing endpoint returned by `Fanout::add`.
//! - `BranchController<T>` lives in the fanout's branch map and is the only
//!   side that enqueues chunks or closes the branch.
//!
//! The endpoint never touches the branch map. Cancelling (or dropping) it only
//! flips the shared state to `Cancelled`; the fanout notices on its next
//! broadcast round.
//!
//! # Demand
//!
//! The endpoint signals the fanout's demand gate when:
//! - it is created with a positive high-water mark,
//! - its consumer polls an empty buffer,
//! - a read leaves positive desired capacity.
//!
//! Signals are always sent after the buffer lock is released.

use crate::error::Error;
use crate::fanout::demand::DemandGate;
use crate::fanout::types::{BranchId, BranchSnapshot, BranchState};
use futures_core::Stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct BranchShared<T> {
    id: BranchId,
    high_water_mark: usize,
    queue: Mutex<BranchQueue<T>>,
    demand: Arc<DemandGate>,
}

struct BranchQueue<T> {
    state: BranchState,
    buffer: VecDeque<T>,
    reader: Option<Waker>,
}

impl<T> BranchQueue<T> {
    fn desired_capacity(&self, high_water_mark: usize) -> isize {
        if !self.state.is_active() {
            return 0;
        }
        to_isize(high_water_mark).saturating_sub(to_isize(self.buffer.len()))
    }

    fn wake_reader(&mut self) -> Option<Waker> {
        self.reader.take()
    }
}

fn to_isize(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

/// Creates a new endpoint and its controller.
pub(super) fn create<T>(
    high_water_mark: usize,
    demand: Arc<DemandGate>,
) -> (Branch<T>, BranchController<T>) {
    let shared = Arc::new(BranchShared {
        id: BranchId::next(),
        high_water_mark,
        queue: Mutex::new(BranchQueue {
            state: BranchState::Active,
            buffer: VecDeque::new(),
            reader: None,
        }),
        demand,
    });
    (
        Branch {
            shared: Arc::clone(&shared),
        },
        BranchController { shared },
    )
}

/// Fanout-side handle of a branch.
pub(super) struct BranchController<T> {
    shared: Arc<BranchShared<T>>,
}

impl<T> BranchController<T> {
    pub(super) fn id(&self) -> BranchId {
        self.shared.id
    }

    pub(super) fn is_cancelled(&self) -> bool {
        self.shared.queue.lock().state == BranchState::Cancelled
    }

    /// Appends a chunk and returns the desired capacity after the append.
    ///
    /// A branch that is no longer active ignores the chunk.
    pub(super) fn enqueue(&self, chunk: T) -> isize {
        let mut queue = self.shared.queue.lock();
        if !queue.state.is_active() {
            return 0;
        }
        queue.buffer.push_back(chunk);
        let desired = queue.desired_capacity(self.shared.high_water_mark);
        let reader = queue.wake_reader();
        drop(queue);
        if let Some(reader) = reader {
            reader.wake();
        }
        desired
    }

    /// Signals end-of-sequence to the consumer once the buffer drains.
    pub(super) fn close(&self) {
        let mut queue = self.shared.queue.lock();
        if !queue.state.is_active() {
            return;
        }
        queue.state = BranchState::Closed;
        let reader = queue.wake_reader();
        drop(queue);
        if let Some(reader) = reader {
            reader.wake();
        }
    }

    pub(super) fn snapshot(&self) -> BranchSnapshot {
        self.shared.snapshot()
    }
}

impl<T> BranchShared<T> {
    fn snapshot(&self) -> BranchSnapshot {
        let queue = self.queue.lock();
        BranchSnapshot {
            id: self.id,
            state: queue.state,
            buffered: queue.buffer.len(),
            desired_capacity: queue.desired_capacity(self.high_water_mark),
        }
    }

    fn cancel(&self) -> bool {
        let mut queue = self.queue.lock();
        if !queue.state.is_active() {
            return false;
        }
        queue.state = BranchState::Cancelled;
        queue.buffer.clear();
        _ = queue.wake_reader();
        true
    }

    fn poll_recv(&self, cx: &mut Context<'_>) -> Poll<Result<T, Error>> {
        let mut queue = self.queue.lock();
        if let Some(chunk) = queue.buffer.pop_front() {
            let wants_more = queue.desired_capacity(self.high_water_mark) > 0;
            drop(queue);
            if wants_more {
                _ = self.demand.signal();
            }
            return Poll::Ready(Ok(chunk));
        }
        match queue.state {
            BranchState::Active => {
                queue.reader = Some(cx.waker().clone());
                drop(queue);
                _ = self.demand.signal();
                Poll::Pending
            }
            BranchState::Closed => Poll::Ready(Err(Error::BranchClosed { branch: self.id })),
            BranchState::Cancelled => Poll::Ready(Err(Error::BranchCancelled { branch: self.id })),
        }
    }
}

/// Consumer endpoint of a fanout branch.
///
/// Receives every chunk the fanout pulls while the branch is live, in
/// upstream order. Dropping the endpoint cancels the branch.
pub struct Branch<T> {
    shared: Arc<BranchShared<T>>,
}

impl<T> Branch<T> {
    /// Identity of this branch, as used by `Fanout::close`.
    #[must_use]
    pub fn id(&self) -> BranchId {
        self.shared.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BranchState {
        self.shared.queue.lock().state
    }

    /// High-water mark minus buffered chunks; 0 once the branch is inactive.
    ///
    /// Negative when the fanout delivered past the mark on behalf of faster
    /// branches.
    #[must_use]
    pub fn desired_capacity(&self) -> isize {
        let queue = self.shared.queue.lock();
        queue.desired_capacity(self.shared.high_water_mark)
    }

    /// Number of delivered chunks not yet read.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.shared.queue.lock().buffer.len()
    }

    /// Receives the next chunk.
    ///
    /// After `Fanout::close` the buffered chunks are still returned, followed
    /// by `Error::BranchClosed`. After [`cancel`](Self::cancel) every call
    /// returns `Error::BranchCancelled`.
    pub async fn recv(&mut self) -> Result<T, Error> {
        std::future::poll_fn(|cx| self.shared.poll_recv(cx)).await
    }

    /// Abandons the branch. Buffered chunks are discarded.
    ///
    /// The fanout removes the branch on its next broadcast round; until then it
    /// still counts toward `Fanout::size`.
    pub fn cancel(&mut self, reason: impl AsRef<str>) {
        if self.shared.cancel() {
            tracing::debug!(branch = %self.shared.id, reason = reason.as_ref(), "branch cancelled");
        }
    }
}

impl<T> Stream for Branch<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.shared.poll_recv(cx) {
            Poll::Ready(Ok(chunk)) => Poll::Ready(Some(chunk)),
            Poll::Ready(Err(_)) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for Branch<T> {
    fn drop(&mut self) {
        if self.shared.cancel() {
            tracing::debug!(branch = %self.shared.id, reason = "endpoint dropped", "branch cancelled");
        }
    }
}

impl<T> std::fmt::Debug for Branch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}
