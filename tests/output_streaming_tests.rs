//! Integration tests for subprocess output streaming
//!
//! These run real child processes (sh), so they exercise the whole path from
//! spawned tool to classified terminal messages.

use tokio::sync::mpsc;
use webuiflasher::models::{MessageKind, TerminalMessage};
use webuiflasher::services::flash_service::run_streaming;

async fn run_and_collect(script: &str) -> (bool, Vec<TerminalMessage>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let args = vec!["-c".to_string(), script.to_string()];
    let success = run_streaming("sh", &args, None, &tx).await.unwrap();
    drop(tx);

    let mut messages = Vec::new();
    while let Some(msg) = rx.recv().await {
        messages.push(msg);
    }
    (success, messages)
}

#[tokio::test]
async fn test_streaming_classifies_stdout_lines() {
    let (success, messages) =
        run_and_collect("echo 'Chip is ESP32-D0WD-V3'; echo 'Wrote 1024 bytes'").await;

    assert!(success);
    // First message announces the command being executed
    assert_eq!(messages[0].kind, MessageKind::Command);
    assert!(messages[0].message.starts_with("Executing: sh"));

    assert!(
        messages
            .iter()
            .any(|m| m.kind == MessageKind::Info && m.message.contains("Chip is"))
    );
    assert!(
        messages
            .iter()
            .any(|m| m.kind == MessageKind::Success && m.message.contains("Wrote 1024 bytes"))
    );
}

#[tokio::test]
async fn test_streaming_carriage_return_progress() {
    let (success, messages) =
        run_and_collect("printf 'Writing at 0x10000 (50 %%)\\rWriting at 0x20000 (100 %%)\\r\\n'")
            .await;

    assert!(success);
    let progress: Vec<_> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Progress)
        .collect();
    assert!(!progress.is_empty());
    assert!(progress[0].message.contains("Writing at 0x10000"));
}

#[tokio::test]
async fn test_streaming_stderr_is_classified_too() {
    let (success, messages) = run_and_collect("echo 'A fatal error occurred' >&2").await;

    assert!(success);
    assert!(
        messages
            .iter()
            .any(|m| m.kind == MessageKind::Error && m.message.contains("fatal error"))
    );
}

#[tokio::test]
async fn test_streaming_nonzero_exit_reports_error() {
    let (success, messages) = run_and_collect("exit 3").await;

    assert!(!success);
    let last = messages.last().unwrap();
    assert_eq!(last.kind, MessageKind::Error);
    assert!(last.message.contains("code 3"));
}

#[tokio::test]
async fn test_streaming_missing_program_is_an_error() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let result = run_streaming("definitely-not-a-real-tool", &[], None, &tx).await;
    assert!(result.is_err());
}
