//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `podwarden_`
//! - 모듈명: `webhook_`, `responder_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

use metrics::{describe_counter, describe_gauge, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결정 레이블 키 (act, ignore)
pub const LABEL_DECISION: &str = "decision";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Webhook 메트릭 ────────────────────────────────────────────────

/// Webhook: 수신한 전체 이벤트 수 (counter)
pub const WEBHOOK_EVENTS_RECEIVED_TOTAL: &str = "podwarden_webhook_events_received_total";

/// Webhook: 파싱 불가 페이로드 수 (counter)
pub const WEBHOOK_MALFORMED_PAYLOADS_TOTAL: &str = "podwarden_webhook_malformed_payloads_total";

// ─── Responder 메트릭 ──────────────────────────────────────────────

/// Responder: 평가된 알림 수 (counter)
pub const RESPONDER_EVENTS_EVALUATED_TOTAL: &str = "podwarden_responder_events_evaluated_total";

/// Responder: 결정 수 (counter, label: decision)
pub const RESPONDER_DECISIONS_TOTAL: &str = "podwarden_responder_decisions_total";

/// Responder: 실행된 파드 삭제 수 (counter)
pub const RESPONDER_REMEDIATIONS_TOTAL: &str = "podwarden_responder_remediations_total";

/// Responder: 파드 삭제 실패 수 (counter)
pub const RESPONDER_REMEDIATION_FAILURES_TOTAL: &str =
    "podwarden_responder_remediation_failures_total";

/// Responder: 로드된 규칙 수 (gauge)
pub const RESPONDER_RULES_LOADED: &str = "podwarden_responder_rules_loaded";

/// Responder: 클러스터 디스패치 지연 시간 (histogram, 초)
pub const RESPONDER_DISPATCH_DURATION_SECONDS: &str =
    "podwarden_responder_dispatch_duration_seconds";

/// 모든 메트릭의 설명을 Prometheus recorder에 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    describe_counter!(
        WEBHOOK_EVENTS_RECEIVED_TOTAL,
        "Total number of webhook events received"
    );
    describe_counter!(
        WEBHOOK_MALFORMED_PAYLOADS_TOTAL,
        "Total number of payloads rejected as malformed"
    );
    describe_counter!(
        RESPONDER_EVENTS_EVALUATED_TOTAL,
        "Total number of alert events evaluated against the rule set"
    );
    describe_counter!(
        RESPONDER_DECISIONS_TOTAL,
        "Total number of remediation decisions, labeled by decision"
    );
    describe_counter!(
        RESPONDER_REMEDIATIONS_TOTAL,
        "Total number of pod deletions dispatched successfully"
    );
    describe_counter!(
        RESPONDER_REMEDIATION_FAILURES_TOTAL,
        "Total number of pod deletions that failed after retries"
    );
    describe_gauge!(RESPONDER_RULES_LOADED, "Number of response rules loaded");
    describe_histogram!(
        RESPONDER_DISPATCH_DURATION_SECONDS,
        "Latency of cluster delete dispatches in seconds"
    );
}
