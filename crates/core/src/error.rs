//! 에러 타입 — 도메인별 에러 정의

/// Podwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PodwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 클러스터 API 에러
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// 인바운드 페이로드 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중인 모듈을 다시 시작하려 함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 모듈을 정지하려 함
    #[error("pipeline not running")]
    NotRunning,

    /// 모듈 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),
}

/// 클러스터 API 에러
///
/// 원격 Kubernetes API 호출 결과를 분류합니다.
/// [`ClusterError::NotFound`]는 디스패처 경계에서 에러가 아닌
/// 성공(이미 삭제됨)으로 흡수됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// 대상 리소스가 존재하지 않음 (HTTP 404)
    #[error("resource not found: {0}")]
    NotFound(String),

    /// 권한 거부 (HTTP 403) — 재시도 불가
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// 호출 타임아웃
    #[error("cluster call timed out: {0}")]
    Timeout(String),

    /// 그 외 API 에러
    #[error("cluster api error: {0}")]
    Api(String),

    /// 연결 실패 (API 서버 도달 불가)
    #[error("cluster connection error: {0}")]
    Connection(String),
}

/// 인바운드 페이로드 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 본문을 JSON 오브젝트로 해석할 수 없음
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}
