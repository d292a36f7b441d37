// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Declarations for stream fanout coordinators.
//!
//! A fanout is described by a [`FanoutSpec`]: an optional description plus the
//! [`FanoutPolicies`] that size per-branch buffers and the upstream pipe.
//! Specs are usually loaded from YAML and validated before a coordinator is
//! built from them.

pub mod error;
pub mod fanout;

pub use fanout::{FanoutPolicies, FanoutSpec};
