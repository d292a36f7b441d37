// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Pull-gated broadcast of one upstream stream to many independent branches.
//!
//! ```text
//!                        ┌──────────────── demand signal ───────────────┐
//!                        ▼                                              │
//!   upstream ──► Fanout read loop ──► broadcast round ──► Branch #1 ──► consumer
//!   (TryStream)  (wait, pull one)     (enqueue to all) ├─► Branch #2 ──► consumer
//!                                                      └─► Branch #N ──► consumer
//! ```
//!
//! - [`fanout::Fanout`] owns the source and the live branches.
//! - [`fanout::Branch`] is a consumer endpoint (`recv()` or `Stream`).
//! - [`pipe::pipe`] builds a writable upstream for producers that push.

pub mod error;
pub mod fanout;
pub mod pipe;

pub use error::Error;
pub use fanout::{Branch, BranchId, BranchOptions, BranchSnapshot, BranchState, Fanout, FanoutStats};
pub use pipe::{PipeReader, PipeWriter, pipe, pipe_with_policies};
