// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn startup_writes_pid_and_binds_socket() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::in_dir(dir.path());

    let mut daemon = startup(&config).await.unwrap();

    assert!(config.socket_path.exists());
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(daemon.service.status().is_empty());

    daemon.shutdown().unwrap();
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn second_daemon_is_refused_and_leaves_first_intact() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::in_dir(dir.path());

    let _first = startup(&config).await.unwrap();
    let second = startup(&config).await;

    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::in_dir(dir.path());
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let daemon = startup(&config).await;

    assert!(daemon.is_ok());
}

#[tokio::test]
async fn nested_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig::in_dir(&dir.path().join("a/b"));

    let daemon = startup(&config).await;

    assert!(daemon.is_ok());
    assert!(config.socket_path.exists());
}
