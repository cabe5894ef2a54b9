//! 대응 엔진 에러 타입
//!
//! [`ResponderError`]는 대응 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<ResponderError> for PodwardenError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use podwarden_core::error::{ClusterError, ConfigError, PipelineError, PodwardenError};

/// 대응 엔진 도메인 에러
///
/// 클러스터 API 호출, 디스패치 실행, 규칙 로딩/검증, 설정 에러 등
/// 대응 엔진 내부의 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    /// 클러스터 API가 에러 응답을 반환함 (HTTP 상태 코드 포함)
    #[error("cluster api error (code {code}): {reason}")]
    ClusterApi {
        /// HTTP 상태 코드 (알 수 없으면 0)
        code: u16,
        /// 에러 사유
        reason: String,
    },

    /// API 서버에 도달할 수 없음
    #[error("cluster connection error: {0}")]
    ClusterConnection(String),

    /// 권한 거부 (HTTP 403) — 재시도해도 성공할 수 없음
    #[error("permission denied for '{target}': {reason}")]
    PermissionDenied {
        /// 대상 파드 ("namespace/name")
        target: String,
        /// 거부 사유
        reason: String,
    },

    /// 대상 파드가 존재하지 않음 (ignore_not_found 미사용 시에만 발생)
    #[error("pod not found: {0}")]
    PodNotFound(String),

    /// 디스패치 타임아웃
    #[error("dispatch timed out for '{target}'")]
    DispatchTimeout {
        /// 대상 파드 ("namespace/name")
        target: String,
    },

    /// 유효하지 않은 대상 이름 (파드/네임스페이스)
    #[error("invalid target {field}: {reason}")]
    InvalidTarget {
        /// 문제가 된 필드 (pod name / namespace)
        field: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl ResponderError {
    /// 재시도로 해소될 가능성이 있는 에러인지 판별합니다.
    ///
    /// 타임아웃, 연결 실패, API 서버 측(5xx) 에러만 일시적으로 취급합니다.
    /// `PermissionDenied`와 4xx 응답은 재시도해도 결과가 같으므로
    /// 즉시 실패로 확정합니다.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ClusterConnection(_) | Self::DispatchTimeout { .. } => true,
            Self::ClusterApi { code, .. } => *code >= 500 || *code == 0,
            _ => false,
        }
    }
}

impl From<ResponderError> for PodwardenError {
    fn from(err: ResponderError) -> Self {
        match &err {
            ResponderError::ClusterApi { reason, .. } => {
                PodwardenError::Cluster(ClusterError::Api(reason.clone()))
            }
            ResponderError::ClusterConnection(msg) => {
                PodwardenError::Cluster(ClusterError::Connection(msg.clone()))
            }
            ResponderError::PermissionDenied { .. } => {
                PodwardenError::Cluster(ClusterError::PermissionDenied(err.to_string()))
            }
            ResponderError::PodNotFound(target) => {
                PodwardenError::Cluster(ClusterError::NotFound(target.clone()))
            }
            ResponderError::DispatchTimeout { .. } => {
                PodwardenError::Cluster(ClusterError::Timeout(err.to_string()))
            }
            ResponderError::InvalidTarget { .. } => {
                PodwardenError::Cluster(ClusterError::Api(err.to_string()))
            }
            ResponderError::RuleLoad { .. }
            | ResponderError::RuleValidation { .. }
            | ResponderError::Config { .. } => {
                PodwardenError::Config(ConfigError::InvalidValue {
                    field: "response".to_owned(),
                    reason: err.to_string(),
                })
            }
            ResponderError::Channel(msg) => {
                PodwardenError::Pipeline(PipelineError::ChannelSend(msg.clone()))
            }
        }
    }
}
