//! 웹훅 HTTP 서버 -- axum 라우터 및 생명주기 관리
//!
//! [`WebhookServer`]는 core의 [`Pipeline`] trait을 구현하여
//! `podwarden-daemon`에서 다른 모듈과 동일한 생명주기로 관리됩니다.
//!
//! 핸들러는 요청-응답 경로 안에서 평가와 디스패치를 수행하므로
//! HTTP 응답이 실제 대응 결과를 반영합니다. 알림 하나당 파싱 →
//! 평가 → (매칭 시) 디스패치 → 응답 순서로 흐릅니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use metrics::counter;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use podwarden_core::config::WebhookConfig;
use podwarden_core::error::{PipelineError, PodwardenError};
use podwarden_core::event::AlertEvent;
use podwarden_core::metrics::{WEBHOOK_EVENTS_RECEIVED_TOTAL, WEBHOOK_MALFORMED_PAYLOADS_TOTAL};
use podwarden_core::pipeline::{HealthStatus, Pipeline};
use podwarden_responder::{ClusterClient, PodResponder, RemediationOutcome};

use crate::payload::parse_alert;

/// 서버 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ServerState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 핸들러 간 공유 상태
///
/// 대응기는 `Arc` 뒤에 있으므로 복제 비용이 없습니다.
pub struct AppState<C: ClusterClient> {
    /// 파드 대응기 (주입된 의존성)
    responder: Arc<PodResponder<C>>,
    /// 수신 이벤트 카운터
    events_received: Arc<AtomicU64>,
    /// 파싱 불가 페이로드 카운터
    malformed_payloads: Arc<AtomicU64>,
}

// derive(Clone)은 C: Clone을 요구하므로 수동 구현
impl<C: ClusterClient> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            responder: Arc::clone(&self.responder),
            events_received: Arc::clone(&self.events_received),
            malformed_payloads: Arc::clone(&self.malformed_payloads),
        }
    }
}

/// 알림 처리 응답 본문
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// "deleted", "ignored", "error" 중 하나
    status: &'static str,
    /// 에러 상세 (에러 응답에만 포함)
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AlertResponse {
    fn deleted() -> Self {
        Self {
            status: "deleted",
            detail: None,
        }
    }

    fn ignored() -> Self {
        Self {
            status: "ignored",
            detail: None,
        }
    }

    fn error(detail: String) -> Self {
        Self {
            status: "error",
            detail: Some(detail),
        }
    }
}

/// 애플리케이션 라우터를 빌드합니다.
///
/// - `POST /`: 알림 수신 및 대응
/// - `GET /healthz`: 클러스터 연결 상태 기반 헬스 체크
pub fn build_router<C: ClusterClient>(state: AppState<C>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", post(handle_alert::<C>))
        .route("/healthz", get(healthz::<C>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// 알림 웹훅 핸들러
///
/// 파싱 불가 본문은 400으로 결정적으로 거부하며, 디스패치 실패는
/// 502로 보고합니다 — 실패한 삭제가 `"deleted"`로 보고되는 일은
/// 없습니다. 요청마다 반드시 응답을 반환하고, 프로세스는 요청 단위
/// 에러로 종료되지 않습니다.
async fn handle_alert<C: ClusterClient>(
    State(state): State<AppState<C>>,
    body: Bytes,
) -> (StatusCode, Json<AlertResponse>) {
    state.events_received.fetch_add(1, Ordering::Relaxed);
    counter!(WEBHOOK_EVENTS_RECEIVED_TOTAL).increment(1);

    let alert = match parse_alert(&body) {
        Ok(alert) => alert,
        Err(e) => {
            state.malformed_payloads.fetch_add(1, Ordering::Relaxed);
            counter!(WEBHOOK_MALFORMED_PAYLOADS_TOTAL).increment(1);
            warn!(error = %e, "rejecting malformed webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(AlertResponse::error(e.to_string())),
            );
        }
    };

    let event = AlertEvent::new(alert);
    debug!(
        event = %event,
        raw = %String::from_utf8_lossy(&body),
        "received alert payload"
    );

    match state.responder.handle_alert(&event).await {
        Ok(RemediationOutcome::Remediated { target, rule_name }) => {
            info!(target = %target, rule = %rule_name, "alert remediated");
            (StatusCode::OK, Json(AlertResponse::deleted()))
        }
        Ok(RemediationOutcome::Ignored { reason: _ }) => {
            (StatusCode::OK, Json(AlertResponse::ignored()))
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(AlertResponse::error(e.to_string())),
        ),
    }
}

/// 헬스 체크 핸들러
///
/// 클러스터 도달 불가 시 503을 반환하여 로드밸런서/프로브가
/// 게이트웨이를 트래픽에서 제외할 수 있게 합니다.
async fn healthz<C: ClusterClient>(
    State(state): State<AppState<C>>,
) -> (StatusCode, Json<HealthStatus>) {
    match state.responder.ping_cluster().await {
        Ok(()) => (StatusCode::OK, Json(HealthStatus::Healthy)),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus::Degraded(format!("cluster unreachable: {e}"))),
        ),
    }
}

/// 웹훅 게이트웨이 서버
///
/// 명시적으로 생성된 서버 인스턴스에 의존성(대응기)을 주입받습니다.
/// 전역 상태가 없으므로 테스트에서 실제 클러스터 없이 구동할 수
/// 있습니다.
///
/// # 사용 예시
/// ```ignore
/// use podwarden_webhook::WebhookServer;
///
/// let mut server = WebhookServer::new(config.webhook.clone(), Arc::new(responder));
///
/// // Pipeline trait으로 시작
/// server.start().await?;
/// ```
pub struct WebhookServer<C: ClusterClient> {
    /// 게이트웨이 설정
    config: WebhookConfig,
    /// 현재 상태
    state: ServerState,
    /// 핸들러 공유 상태
    app_state: AppState<C>,
    /// Graceful shutdown 토큰
    cancel_token: CancellationToken,
    /// 서버 태스크 핸들
    task: Option<tokio::task::JoinHandle<()>>,
    /// 실제 바인드된 주소 (start 이후)
    local_addr: Option<SocketAddr>,
}

impl<C: ClusterClient> WebhookServer<C> {
    /// 새 웹훅 서버를 생성합니다.
    pub fn new(config: WebhookConfig, responder: Arc<PodResponder<C>>) -> Self {
        Self {
            config,
            state: ServerState::Initialized,
            app_state: AppState {
                responder,
                events_received: Arc::new(AtomicU64::new(0)),
                malformed_payloads: Arc::new(AtomicU64::new(0)),
            },
            cancel_token: CancellationToken::new(),
            task: None,
            local_addr: None,
        }
    }

    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ServerState::Initialized => "initialized",
            ServerState::Running => "running",
            ServerState::Stopped => "stopped",
        }
    }

    /// 실제 바인드된 주소를 반환합니다 (start 이후에만 Some).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// 수신한 이벤트 수를 반환합니다.
    pub fn events_received(&self) -> u64 {
        self.app_state.events_received.load(Ordering::Relaxed)
    }

    /// 거부한 파싱 불가 페이로드 수를 반환합니다.
    pub fn malformed_payloads(&self) -> u64 {
        self.app_state.malformed_payloads.load(Ordering::Relaxed)
    }
}

impl<C: ClusterClient> Pipeline for WebhookServer<C> {
    async fn start(&mut self) -> Result<(), PodwardenError> {
        if self.state == ServerState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        // cancel_token은 stop()에서 소비되므로 재시작하려면 새 인스턴스가 필요
        if self.state == ServerState::Stopped {
            return Err(PodwardenError::Pipeline(PipelineError::InitFailed(
                "server cannot be restarted after stop; build a new instance".to_owned(),
            )));
        }

        let addr = format!("{}:{}", self.config.listen_addr, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            PodwardenError::Pipeline(PipelineError::InitFailed(format!(
                "failed to bind to {addr}: {e}"
            )))
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            PodwardenError::Pipeline(PipelineError::InitFailed(format!(
                "failed to read local addr: {e}"
            )))
        })?;
        self.local_addr = Some(local_addr);

        let router = build_router(self.app_state.clone(), self.config.max_body_bytes);
        let cancel = self.cancel_token.clone();

        let task = tokio::spawn(async move {
            let shutdown = async move { cancel.cancelled().await };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "webhook server terminated unexpectedly");
            }
        });

        self.task = Some(task);
        self.state = ServerState::Running;
        info!(addr = %local_addr, "webhook gateway listening");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PodwardenError> {
        if self.state != ServerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping webhook gateway");
        self.cancel_token.cancel();

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }

        self.state = ServerState::Stopped;
        info!("webhook gateway stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ServerState::Running => match self.app_state.responder.ping_cluster().await {
                Ok(()) => HealthStatus::Healthy,
                Err(e) => HealthStatus::Degraded(format!("cluster unreachable: {e}")),
            },
            ServerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ServerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}
