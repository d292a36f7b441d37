// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

use super::{Branch, BranchOptions, BranchState, Fanout};
use crate::error::{BoxError, Error};
use crate::pipe::{PipeWriter, pipe};
use futures_core::TryStream;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub(super) const STEP: Duration = Duration::from_millis(500);

pub(super) fn spawn_loop<S>(fanout: &Arc<Fanout<S>>) -> JoinHandle<Result<(), Error>>
where
    S: TryStream + Unpin + Send + 'static,
    S::Ok: Clone + Send + 'static,
    S::Error: Into<BoxError>,
{
    let fanout = Arc::clone(fanout);
    tokio::spawn(async move { fanout.start().await })
}

pub(super) async fn join_loop(run: JoinHandle<Result<(), Error>>) -> Result<(), Error> {
    timeout(STEP, run)
        .await
        .expect("read loop should finish in time")
        .expect("read loop task should not panic")
}

pub(super) async fn write_in_time<T>(writer: &PipeWriter<T>, chunk: T) {
    timeout(STEP, writer.write(chunk))
        .await
        .expect("write should not block")
        .expect("write should succeed");
}

pub(super) async fn recv_in_time<T>(branch: &mut Branch<T>) -> Result<T, Error> {
    timeout(STEP, branch.recv())
        .await
        .expect("branch read should not hang")
}

pub(super) async fn eventually(mut condition: impl FnMut() -> bool) {
    timeout(STEP, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should hold in time");
}

mod errors;
