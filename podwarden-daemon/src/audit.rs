//! Audit logging for executed remediations.
//!
//! The responder emits one [`ActionEvent`] per dispatch (success or
//! failure). This task drains that channel and writes a structured log
//! line per action, so every administrative mutation against the cluster
//! leaves a trace linked (via trace_id) to the alert that caused it.
//!
//! Logging here must never block the response path — the channel is
//! bounded and this task only consumes.

use tokio::sync::mpsc;
use tracing::{info, warn};

use podwarden_core::event::ActionEvent;

/// Spawn the audit logging task.
///
/// Consumes `ActionEvent`s until the channel closes (all senders
/// dropped), then exits. Returns the task handle so the caller can
/// await it during shutdown.
pub fn spawn_audit_task(mut action_rx: mpsc::Receiver<ActionEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(action) = action_rx.recv().await {
            if action.success {
                info!(
                    action_id = %action.id,
                    action_type = %action.action_type,
                    target = %action.target,
                    trace_id = %action.metadata.trace_id,
                    "remediation executed"
                );
            } else {
                warn!(
                    action_id = %action.id,
                    action_type = %action.action_type,
                    target = %action.target,
                    trace_id = %action.metadata.trace_id,
                    "remediation failed"
                );
            }
        }
        info!("action channel closed, audit task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn audit_task_exits_when_channel_closes() {
        let (action_tx, action_rx) = mpsc::channel(16);
        let handle = spawn_audit_task(action_rx);

        action_tx
            .send(ActionEvent::new("pod_delete", "prod/nginx-7f", true))
            .await
            .unwrap();
        action_tx
            .send(ActionEvent::new("pod_delete", "prod/nginx-7f", false))
            .await
            .unwrap();

        // 채널을 닫으면 태스크가 종료되어야 함
        drop(action_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("audit task should exit")
            .expect("audit task should not panic");
    }

    #[tokio::test]
    async fn audit_task_consumes_backlog() {
        let (action_tx, action_rx) = mpsc::channel(4);

        // 채널 용량만큼 미리 채워도 태스크가 소비함
        for i in 0..4 {
            action_tx
                .send(ActionEvent::new("pod_delete", format!("prod/pod-{i}"), true))
                .await
                .unwrap();
        }

        let handle = spawn_audit_task(action_rx);
        action_tx
            .send(ActionEvent::new("pod_delete", "prod/pod-4", true))
            .await
            .unwrap();

        drop(action_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("audit task should exit")
            .expect("audit task should not panic");
    }
}
