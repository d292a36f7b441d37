// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

use super::*;
use futures::stream;
use std::io;

/// Scenario:
/// 1. Given a source that yields one chunk and then fails.
/// 2. When a branch reads the chunk and asks for more.
/// 3. Then `start` returns the upstream error and the branch is left open.
#[tokio::test(flavor = "current_thread")]
async fn upstream_failure_ends_loop_and_leaves_branches_open() {
    let source = stream::iter(vec![Ok("a"), Err(io::Error::other("boom"))]);
    let fanout = Arc::new(Fanout::new(source));
    let mut branch = fanout.add();
    let run = spawn_loop(&fanout);

    assert_eq!(recv_in_time(&mut branch).await.expect("read"), "a");
    let err = join_loop(run)
        .await
        .expect_err("upstream failure should surface");
    assert!(matches!(err, Error::Upstream { .. }));
    assert_eq!(err.as_label(), "fanout_upstream_failed");
    assert!(err.to_string().contains("boom"));

    assert_eq!(fanout.size(), 1);
    assert_eq!(branch.state(), BranchState::Active);
    assert!(
        timeout(Duration::from_millis(50), branch.recv())
            .await
            .is_err(),
        "an open branch without data keeps waiting"
    );

    assert_eq!(fanout.close_all(), 1);
    let err = recv_in_time(&mut branch)
        .await
        .expect_err("closed branch should report closed");
    assert!(err.is_end_of_branch());
}

#[test]
fn end_of_branch_errors_are_classified() {
    let (_writer, reader) = pipe::<u32>(1);
    let fanout = Fanout::new(reader);
    let branch = fanout.add();
    let closed = Error::BranchClosed {
        branch: branch.id(),
    };
    let cancelled = Error::BranchCancelled {
        branch: branch.id(),
    };

    assert!(closed.is_end_of_branch());
    assert!(cancelled.is_end_of_branch());
    assert!(!Error::PipeClosed.is_end_of_branch());
    assert_eq!(closed.to_string(), format!("branch `{}` is closed", branch.id()));
}
