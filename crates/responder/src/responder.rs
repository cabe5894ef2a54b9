//! 파드 대응기 -- 알림 수신/규칙 평가/삭제 디스패치 전체 흐름 관리
//!
//! [`PodResponder`]는 웹훅 게이트웨이가 알림 하나를 동기적으로 처리할 때
//! 사용하는 오케스트레이터입니다. 요청-응답 경로 안에서 평가와 디스패치를
//! 수행하므로 HTTP 응답이 실제 결과를 반영합니다.
//!
//! # 내부 아키텍처
//! ```text
//! AlertEvent ──> PodResponder.handle_alert()
//!                    |
//!               RuleEngine.evaluate()
//!                    |
//!               RemediationDispatcher.dispatch()
//!                    |
//!               ActionEvent ──mpsc──> audit
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use podwarden_core::event::{ActionEvent, AlertEvent};
use podwarden_core::metrics::{
    LABEL_DECISION, RESPONDER_DECISIONS_TOTAL, RESPONDER_EVENTS_EVALUATED_TOTAL,
    RESPONDER_REMEDIATION_FAILURES_TOTAL, RESPONDER_REMEDIATIONS_TOTAL, RESPONDER_RULES_LOADED,
};
use podwarden_core::types::PodTarget;

use crate::cluster::ClusterClient;
use crate::config::ResponderConfig;
use crate::dispatch::RemediationDispatcher;
use crate::error::ResponderError;
use crate::rules::{IgnoreReason, RemediationDecision, ResponseRule, RuleEngine, default_rules};

/// 알림 처리 결과
///
/// 웹훅 게이트웨이가 HTTP 응답으로 변환합니다.
#[derive(Debug, Clone)]
pub enum RemediationOutcome {
    /// 대상 파드 삭제가 디스패치됨 (이미 사라진 경우 포함)
    Remediated {
        /// 삭제된 파드
        target: PodTarget,
        /// 트리거한 규칙 이름
        rule_name: String,
    },
    /// 대응하지 않음
    Ignored {
        /// 무시 사유
        reason: IgnoreReason,
    },
}

/// 파드 대응기 -- 규칙 평가와 삭제 디스패치의 전체 흐름을 관리합니다.
///
/// 요청마다 공유되는 상태는 규칙 엔진(읽기 위주)과 카운터뿐이므로
/// `Arc<PodResponder>`로 여러 동시 요청에서 안전하게 사용할 수 있습니다.
pub struct PodResponder<C: ClusterClient> {
    /// 대응 설정
    config: ResponderConfig,
    /// 클러스터 클라이언트 (공유)
    cluster: Arc<C>,
    /// 규칙 엔진 (공유, 런타임 변경 반영)
    rules: Arc<Mutex<RuleEngine>>,
    /// 삭제 디스패처
    dispatcher: RemediationDispatcher<C>,
    /// 평가된 알림 카운터
    events_evaluated: AtomicU64,
    /// 실행된 삭제 카운터
    remediations_executed: AtomicU64,
    /// 삭제 실패 카운터
    remediation_failures: AtomicU64,
}

impl<C: ClusterClient> PodResponder<C> {
    /// 알림 이벤트 하나를 처리합니다.
    ///
    /// 규칙을 평가하고, 매칭 시 파드 삭제를 디스패치합니다.
    /// 디스패치 실패는 에러로 전파되어 호출자가 실패 응답을 반환할 수
    /// 있습니다 — 실패한 삭제가 성공으로 보고되는 일은 없습니다.
    pub async fn handle_alert(
        &self,
        event: &AlertEvent,
    ) -> Result<RemediationOutcome, ResponderError> {
        self.events_evaluated.fetch_add(1, Ordering::Relaxed);
        counter!(RESPONDER_EVENTS_EVALUATED_TOTAL).increment(1);
        debug!(event = %event, "evaluating alert event");

        let decision = self.rules.lock().await.evaluate(event);

        match decision {
            RemediationDecision::Ignore { reason } => {
                counter!(RESPONDER_DECISIONS_TOTAL, LABEL_DECISION => "ignore").increment(1);
                info!(
                    alert_rule = %event.alert.rule,
                    reason = %reason,
                    trace_id = %event.metadata.trace_id,
                    "alert ignored"
                );
                Ok(RemediationOutcome::Ignored { reason })
            }
            RemediationDecision::Act {
                rule_id,
                rule_name,
                target,
            } => {
                counter!(RESPONDER_DECISIONS_TOTAL, LABEL_DECISION => "act").increment(1);

                if !self.config.auto_remediate {
                    info!(
                        rule_id = %rule_id,
                        target = %target,
                        "rule matched but auto remediation is disabled"
                    );
                    return Ok(RemediationOutcome::Ignored {
                        reason: IgnoreReason::RemediationDisabled,
                    });
                }

                info!(
                    rule_id = %rule_id,
                    rule = %rule_name,
                    target = %target,
                    trace_id = %event.metadata.trace_id,
                    "rule matched, dispatching remediation"
                );

                match self
                    .dispatcher
                    .dispatch(&target, &rule_name, &event.metadata.trace_id)
                    .await
                {
                    Ok(_outcome) => {
                        self.remediations_executed.fetch_add(1, Ordering::Relaxed);
                        counter!(RESPONDER_REMEDIATIONS_TOTAL).increment(1);
                        Ok(RemediationOutcome::Remediated { target, rule_name })
                    }
                    Err(e) => {
                        self.remediation_failures.fetch_add(1, Ordering::Relaxed);
                        counter!(RESPONDER_REMEDIATION_FAILURES_TOTAL).increment(1);
                        error!(
                            target = %target,
                            error = %e,
                            "remediation dispatch failed"
                        );
                        Err(e)
                    }
                }
            }
        }
    }

    /// 클러스터 연결 상태를 확인합니다.
    pub async fn ping_cluster(&self) -> Result<(), ResponderError> {
        self.cluster.ping().await
    }

    /// 평가된 알림 수를 반환합니다.
    pub fn events_evaluated(&self) -> u64 {
        self.events_evaluated.load(Ordering::Relaxed)
    }

    /// 실행된 삭제 수를 반환합니다.
    pub fn remediations_executed(&self) -> u64 {
        self.remediations_executed.load(Ordering::Relaxed)
    }

    /// 삭제 실패 수를 반환합니다.
    pub fn remediation_failures(&self) -> u64 {
        self.remediation_failures.load(Ordering::Relaxed)
    }

    /// 등록된 규칙 수를 반환합니다.
    pub async fn rule_count(&self) -> usize {
        self.rules.lock().await.rule_count()
    }

    /// 규칙 엔진에 대한 Arc 참조를 반환합니다.
    ///
    /// 규칙을 동적으로 추가/제거할 때 사용합니다.
    /// 런타임 중 규칙 변경이 이후 요청에 바로 반영됩니다.
    pub fn rule_engine_arc(&self) -> Arc<Mutex<RuleEngine>> {
        Arc::clone(&self.rules)
    }

    /// 설정의 auto_remediate 여부를 반환합니다.
    pub fn auto_remediate_enabled(&self) -> bool {
        self.config.auto_remediate
    }
}

/// 파드 대응기 빌더
///
/// 대응기를 구성하고 필요한 채널을 생성합니다.
pub struct PodResponderBuilder<C: ClusterClient> {
    config: ResponderConfig,
    cluster: Option<Arc<C>>,
    action_tx: Option<mpsc::Sender<ActionEvent>>,
    action_channel_capacity: usize,
    rules: Vec<ResponseRule>,
}

impl<C: ClusterClient> PodResponderBuilder<C> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ResponderConfig::default(),
            cluster: None,
            action_tx: None,
            action_channel_capacity: 256,
            rules: Vec::new(),
        }
    }

    /// 대응 설정을 지정합니다.
    pub fn config(mut self, config: ResponderConfig) -> Self {
        self.config = config;
        self
    }

    /// 클러스터 클라이언트를 설정합니다.
    pub fn cluster_client(mut self, cluster: Arc<C>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// 외부 액션 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn action_sender(mut self, tx: mpsc::Sender<ActionEvent>) -> Self {
        self.action_tx = Some(tx);
        self
    }

    /// 액션 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn action_channel_capacity(mut self, capacity: usize) -> Self {
        self.action_channel_capacity = capacity;
        self
    }

    /// 대응 규칙을 추가합니다.
    ///
    /// 규칙을 하나도 추가하지 않으면 내장 기본 규칙이 사용됩니다.
    pub fn add_rule(mut self, rule: ResponseRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// 대응 규칙 목록을 한 번에 추가합니다.
    pub fn rules(mut self, rules: Vec<ResponseRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// 대응기를 빌드합니다.
    ///
    /// # Returns
    /// - `PodResponder`: 대응기 인스턴스
    /// - `Option<mpsc::Receiver<ActionEvent>>`: 액션 수신 채널
    ///   (외부 action_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(PodResponder<C>, Option<mpsc::Receiver<ActionEvent>>), ResponderError> {
        self.config.validate()?;

        let cluster = self.cluster.ok_or_else(|| ResponderError::Config {
            field: "cluster_client".to_owned(),
            reason: "cluster client must be provided".to_owned(),
        })?;

        let (action_tx, action_rx) = if let Some(tx) = self.action_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.action_channel_capacity);
            (tx, Some(rx))
        };

        let mut engine = RuleEngine::new();
        let rules = if self.rules.is_empty() {
            default_rules()
        } else {
            self.rules
        };
        for rule in rules {
            engine.add_rule(rule)?;
        }

        let rule_count = engine.rule_count();
        gauge!(RESPONDER_RULES_LOADED).set(rule_count as f64);
        info!(rules = rule_count, "rule engine initialized");

        let dispatcher = RemediationDispatcher::new(
            Arc::clone(&cluster),
            action_tx,
            Duration::from_secs(self.config.action_timeout_secs),
            self.config.retry_max_attempts,
            Duration::from_millis(self.config.retry_backoff_base_ms),
        );

        let responder = PodResponder {
            config: self.config,
            cluster,
            rules: Arc::new(Mutex::new(engine)),
            dispatcher,
            events_evaluated: AtomicU64::new(0),
            remediations_executed: AtomicU64::new(0),
            remediation_failures: AtomicU64::new(0),
        };

        Ok((responder, action_rx))
    }
}

impl<C: ClusterClient> Default for PodResponderBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
