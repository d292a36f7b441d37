// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Fanout module: coordinator, branches, and the demand gate between them.
//!
//! Design notes:
//! - One read loop pulls from the upstream source only while at least one live
//!   branch wants more data (OR across branches, not AND). A slow branch never
//!   stalls fast ones; it buffers past its high-water mark instead.
//! - Every live branch receives every chunk exactly once, in upstream order.
//!   A branch added mid-stream only sees chunks broadcast after `add()`.
//! - Consumers cancel by calling `Branch::cancel` or dropping the branch.
//!   Cancellation only flips the branch state; the coordinator prunes the
//!   branch lazily on its next broadcast round, so `size()` may lag behind.
//! - `Fanout::close` is synchronous: the branch leaves the map at once and its
//!   reader sees end-of-sequence after draining what was already delivered.
//! - Upstream exhaustion ends `start()` but leaves branches open; callers
//!   propagate completion with `close`/`close_all`.

mod branch;
mod coordinator;
mod demand;
mod types;

#[cfg(test)]
mod tests;

pub use branch::Branch;
pub use coordinator::Fanout;
pub use types::{BranchId, BranchOptions, BranchSnapshot, BranchState, FanoutStats};
