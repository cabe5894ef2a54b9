//! 대응 실행 -- 파드 삭제 디스패치
//!
//! [`RemediationDispatcher`]는 클러스터 API를 통해 파드 삭제를 수행하고
//! [`ActionEvent`]를 생성합니다. 디스패치 한 번당 클러스터 변경은
//! 정확히 한 번 시도되며, 일시적 실패만 제한된 횟수로 재시도합니다.
//!
//! 핵심 계약은 **ignore-not-found**입니다: 대응은 파드 생명주기 및 중복
//! 웹훅 전달과 경합하므로, 이미 사라진 파드에 대한 삭제는 실패가 아니라
//! 성공([`DispatchOutcome::AlreadyGone`])입니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use podwarden_core::event::ActionEvent;
use podwarden_core::metrics::RESPONDER_DISPATCH_DURATION_SECONDS;
use podwarden_core::types::PodTarget;

use crate::cluster::{ClusterClient, DeleteOutcome};
use crate::error::ResponderError;

/// 파드 삭제 액션 타입명 (ActionEvent 및 메트릭 레이블)
pub const ACTION_TYPE_POD_DELETE: &str = "pod_delete";

/// 디스패치 결과
///
/// 두 경우 모두 "파드가 더 이상 존재하지 않음"이라는 동일한 최종 상태를
/// 의미하며, 호출자에게는 동일하게 성공으로 보고됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 삭제 요청이 수락됨
    Deleted,
    /// 파드가 이미 사라진 상태였음 (멱등 성공)
    AlreadyGone,
}

/// 대응 디스패처 -- 클러스터 API를 통해 파드 삭제를 수행합니다.
///
/// 삭제를 실행하고, 결과를 `ActionEvent`로 변환하여 감사 채널로
/// 전송합니다.
pub struct RemediationDispatcher<C: ClusterClient> {
    /// 클러스터 클라이언트
    cluster: Arc<C>,
    /// 액션 결과 전송 채널
    action_tx: mpsc::Sender<ActionEvent>,
    /// 클러스터 호출 타임아웃
    action_timeout: Duration,
    /// 일시적 실패 재시도 최대 횟수
    max_retries: u32,
    /// 재시도 백오프 기본 간격
    retry_backoff_base: Duration,
}

impl<C: ClusterClient> RemediationDispatcher<C> {
    /// 새 디스패처를 생성합니다.
    pub fn new(
        cluster: Arc<C>,
        action_tx: mpsc::Sender<ActionEvent>,
        action_timeout: Duration,
        max_retries: u32,
        retry_backoff_base: Duration,
    ) -> Self {
        Self {
            cluster,
            action_tx,
            action_timeout,
            max_retries,
            retry_backoff_base,
        }
    }

    /// 대상 파드에 대해 삭제를 디스패치합니다.
    ///
    /// 일시적 실패 시 설정된 횟수만큼 재시도하며, 성공/실패와 무관하게
    /// 결과를 `ActionEvent`로 전송합니다.
    ///
    /// # Arguments
    /// - `target`: 삭제 대상 파드
    /// - `rule_name`: 트리거한 규칙 이름 (로깅용)
    /// - `trace_id`: 원본 알림의 trace_id (이벤트 연결용)
    pub async fn dispatch(
        &self,
        target: &PodTarget,
        rule_name: &str,
        trace_id: &str,
    ) -> Result<DispatchOutcome, ResponderError> {
        info!(
            target = %target,
            rule = rule_name,
            trace_id = trace_id,
            "dispatching pod delete"
        );

        let started = Instant::now();
        let result = self.dispatch_with_retry(target).await;
        histogram!(RESPONDER_DISPATCH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let success = result.is_ok();
        let action_event =
            ActionEvent::with_trace(ACTION_TYPE_POD_DELETE, target.to_string(), success, trace_id);

        match &result {
            Ok(DispatchOutcome::Deleted) => {
                info!(target = %target, "pod delete dispatched");
            }
            Ok(DispatchOutcome::AlreadyGone) => {
                info!(target = %target, "pod already gone, treating delete as success");
            }
            Err(e) => {
                error!(target = %target, error = %e, "pod delete dispatch failed");
            }
        }

        // Send action event regardless of success/failure
        if let Err(e) = self.action_tx.send(action_event).await {
            error!(error = %e, "failed to send action event");
        }

        result
    }

    /// 재시도 로직을 포함한 삭제 실행
    ///
    /// `NotFound`는 성공으로 확정되므로 재시도 대상이 아니며,
    /// 일시적이지 않은 에러(권한 거부 등)는 즉시 실패로 확정합니다.
    async fn dispatch_with_retry(
        &self,
        target: &PodTarget,
    ) -> Result<DispatchOutcome, ResponderError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_base * attempt;
                warn!(
                    target = %target,
                    attempt = attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "retrying pod delete"
                );
                tokio::time::sleep(backoff).await;
            }

            match tokio::time::timeout(
                self.action_timeout,
                self.cluster
                    .delete_pod(&target.name, &target.namespace, true),
            )
            .await
            {
                Ok(Ok(DeleteOutcome::Deleted)) => return Ok(DispatchOutcome::Deleted),
                Ok(Ok(DeleteOutcome::NotFound)) => return Ok(DispatchOutcome::AlreadyGone),
                Ok(Err(e)) => {
                    if !e.is_transient() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
                Err(_elapsed) => {
                    last_error = Some(ResponderError::DispatchTimeout {
                        target: target.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ResponderError::ClusterApi {
            code: 0,
            reason: "unknown dispatch failure".to_owned(),
        }))
    }
}
