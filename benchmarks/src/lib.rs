// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the fanout benchmarks.

use std::sync::Arc;

/// Builds a shared payload of `size` bytes, cheap to clone per branch.
#[must_use]
pub fn make_payload(size: usize) -> Arc<Vec<u8>> {
    Arc::new(vec![42u8; size])
}
