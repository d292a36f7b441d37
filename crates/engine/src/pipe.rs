// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A bounded, writable upstream for a fanout.
//!
//! `pipe(capacity)` returns a writer half that producers push chunks into and
//! a reader half that a [`Fanout`](crate::fanout::Fanout) consumes. Writes
//! wait while `capacity` chunks are buffered, so the fanout's pull gating
//! propagates back to the producer.

use crate::error::Error;
use fanout_config::FanoutPolicies;
use futures_core::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Creates a pipe holding at most `capacity` unread chunks.
///
/// A zero capacity is raised to one.
#[must_use]
pub fn pipe<T>(capacity: usize) -> (PipeWriter<T>, PipeReader<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PipeWriter { tx }, PipeReader { rx })
}

/// Creates a pipe sized by `policies.upstream_pipe_capacity`.
///
/// Unlike [`pipe`], a zero capacity is rejected with [`Error::InvalidConfig`].
pub fn pipe_with_policies<T>(
    policies: &FanoutPolicies,
) -> Result<(PipeWriter<T>, PipeReader<T>), Error> {
    if policies.upstream_pipe_capacity == 0 {
        return Err(Error::InvalidConfig {
            reason: "fanout.policies.upstream_pipe_capacity must be greater than 0".to_owned(),
        });
    }
    Ok(pipe(policies.upstream_pipe_capacity))
}

/// Writing half of a pipe. Cloning adds another producer.
///
/// The sequence ends once every writer is dropped and the buffer is read.
#[derive(Debug)]
pub struct PipeWriter<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for PipeWriter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> PipeWriter<T> {
    /// Writes one chunk, waiting for buffer space.
    ///
    /// Fails with [`Error::PipeClosed`] once the reader is dropped.
    pub async fn write(&self, chunk: T) -> Result<(), Error> {
        self.tx.send(chunk).await.map_err(|_| Error::PipeClosed)
    }

    /// Returns `true` once the reader is dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reading half of a pipe; a fanout source that never fails.
#[derive(Debug)]
pub struct PipeReader<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Stream for PipeReader<T> {
    type Item = Result<T, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}
