//! 설정 관리 — podwarden.toml 파싱 및 런타임 설정
//!
//! [`PodwardenConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PODWARDEN_WEBHOOK_PORT=8080` 형식)
//! 3. 설정 파일 (`podwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), podwarden_core::error::PodwardenError> {
//! use podwarden_core::config::PodwardenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PodwardenConfig::load("podwarden.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PodwardenConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PodwardenError};

/// Podwarden 통합 설정
///
/// `podwarden.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 웹훅 게이트웨이 설정
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// 대응(remediation) 설정
    #[serde(default)]
    pub response: ResponseConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PodwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PodwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PodwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PodwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PodwardenError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PodwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            PodwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PODWARDEN_{SECTION}_{FIELD}`
    /// 예: `PODWARDEN_WEBHOOK_PORT=8080`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PODWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PODWARDEN_GENERAL_LOG_FORMAT");

        // Webhook
        override_string(
            &mut self.webhook.listen_addr,
            "PODWARDEN_WEBHOOK_LISTEN_ADDR",
        );
        override_u16(&mut self.webhook.port, "PODWARDEN_WEBHOOK_PORT");
        override_usize(
            &mut self.webhook.max_body_bytes,
            "PODWARDEN_WEBHOOK_MAX_BODY_BYTES",
        );

        // Response
        override_bool(
            &mut self.response.auto_remediate,
            "PODWARDEN_RESPONSE_AUTO_REMEDIATE",
        );
        override_string(&mut self.response.rules_path, "PODWARDEN_RESPONSE_RULES_PATH");
        override_u64(
            &mut self.response.action_timeout_secs,
            "PODWARDEN_RESPONSE_ACTION_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.response.retry_max_attempts,
            "PODWARDEN_RESPONSE_RETRY_MAX_ATTEMPTS",
        );
        override_u64(
            &mut self.response.retry_backoff_base_ms,
            "PODWARDEN_RESPONSE_RETRY_BACKOFF_BASE_MS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "PODWARDEN_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "PODWARDEN_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "PODWARDEN_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "PODWARDEN_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PodwardenError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // webhook 검증
        if self.webhook.listen_addr.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "webhook.listen_addr".to_owned(),
                reason: format!("'{}' is not a valid IP address", self.webhook.listen_addr),
            }
            .into());
        }

        if self.webhook.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "webhook.port".to_owned(),
                reason: "must not be 0".to_owned(),
            }
            .into());
        }

        if self.webhook.max_body_bytes == 0
            || self.webhook.max_body_bytes > MAX_WEBHOOK_BODY_BYTES
        {
            return Err(ConfigError::InvalidValue {
                field: "webhook.max_body_bytes".to_owned(),
                reason: format!("must be 1-{MAX_WEBHOOK_BODY_BYTES}"),
            }
            .into());
        }

        // response 검증
        if self.response.action_timeout_secs == 0
            || self.response.action_timeout_secs > MAX_ACTION_TIMEOUT_SECS
        {
            return Err(ConfigError::InvalidValue {
                field: "response.action_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_ACTION_TIMEOUT_SECS}"),
            }
            .into());
        }

        if self.response.retry_max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::InvalidValue {
                field: "response.retry_max_attempts".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_ATTEMPTS}"),
            }
            .into());
        }

        if self.response.retry_backoff_base_ms > MAX_RETRY_BACKOFF_BASE_MS {
            return Err(ConfigError::InvalidValue {
                field: "response.retry_backoff_base_ms".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_BACKOFF_BASE_MS}"),
            }
            .into());
        }

        // metrics 검증 (활성화된 경우에만)
        if self.metrics.enabled {
            if self.metrics.listen_addr.parse::<IpAddr>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.listen_addr".to_owned(),
                    reason: format!("'{}' is not a valid IP address", self.metrics.listen_addr),
                }
                .into());
            }

            if self.metrics.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.port".to_owned(),
                    reason: "must not be 0".to_owned(),
                }
                .into());
            }

            if !self.metrics.endpoint.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.endpoint".to_owned(),
                    reason: "must start with '/'".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 설정 상한값 상수
const MAX_WEBHOOK_BODY_BYTES: usize = 16 * 1024 * 1024;
const MAX_ACTION_TIMEOUT_SECS: u64 = 300;
const MAX_RETRY_ATTEMPTS: u32 = 10;
const MAX_RETRY_BACKOFF_BASE_MS: u64 = 30_000;

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 웹훅 게이트웨이 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 요청 본문 최대 크기 (바이트)
    pub max_body_bytes: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_owned(),
            port: 5000,
            max_body_bytes: 256 * 1024, // 256KB
        }
    }
}

/// 대응(remediation) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// 자동 대응 활성화 (비활성화 시 매칭된 알림도 무시)
    pub auto_remediate: bool,
    /// 대응 규칙 TOML 디렉토리 (비어있으면 내장 기본 규칙 사용)
    pub rules_path: String,
    /// 클러스터 호출 타임아웃 (초)
    pub action_timeout_secs: u64,
    /// 일시적 실패 재시도 최대 횟수
    pub retry_max_attempts: u32,
    /// 재시도 백오프 기본 간격 (밀리초)
    pub retry_backoff_base_ms: u64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            auto_remediate: true,
            rules_path: String::new(),
            action_timeout_secs: 10,
            retry_max_attempts: 2,
            retry_backoff_base_ms: 500,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// Prometheus 수신 주소
    pub listen_addr: String,
    /// Prometheus 수신 포트
    pub port: u16,
    /// 스크레이프 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9184,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
