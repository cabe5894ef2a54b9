//! 대응 엔진 설정
//!
//! [`ResponderConfig`]는 core의 [`ResponseConfig`](podwarden_core::config::ResponseConfig)를
//! 기반으로 대응 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use podwarden_core::config::PodwardenConfig;
//! use podwarden_responder::config::ResponderConfig;
//!
//! let core_config = PodwardenConfig::default();
//! let config = ResponderConfig::from_core(&core_config.response);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ResponderError;

/// 설정 상한값 상수
const MAX_ACTION_TIMEOUT_SECS: u64 = 300;
const MAX_RETRY_ATTEMPTS: u32 = 10;
const MAX_RETRY_BACKOFF_BASE_MS: u64 = 30_000;

/// 대응 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// 자동 대응 활성화 (비활성화 시 매칭된 알림도 기록만 하고 무시)
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

impl Default for ResponderConfig {
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

impl ResponderConfig {
    /// core의 `ResponseConfig`에서 대응 엔진 설정을 생성합니다.
    pub fn from_core(core: &podwarden_core::config::ResponseConfig) -> Self {
        Self {
            auto_remediate: core.auto_remediate,
            rules_path: core.rules_path.clone(),
            action_timeout_secs: core.action_timeout_secs,
            retry_max_attempts: core.retry_max_attempts,
            retry_backoff_base_ms: core.retry_backoff_base_ms,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ResponderError> {
        if self.action_timeout_secs == 0 || self.action_timeout_secs > MAX_ACTION_TIMEOUT_SECS {
            return Err(ResponderError::Config {
                field: "action_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_ACTION_TIMEOUT_SECS}"),
            });
        }

        if self.retry_max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ResponderError::Config {
                field: "retry_max_attempts".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_ATTEMPTS}"),
            });
        }

        if self.retry_backoff_base_ms > MAX_RETRY_BACKOFF_BASE_MS {
            return Err(ResponderError::Config {
                field: "retry_backoff_base_ms".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_BACKOFF_BASE_MS}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ResponderConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = podwarden_core::config::ResponseConfig {
            auto_remediate: false,
            rules_path: "/etc/podwarden/rules".to_owned(),
            action_timeout_secs: 30,
            retry_max_attempts: 5,
            retry_backoff_base_ms: 250,
        };
        let config = ResponderConfig::from_core(&core);
        assert!(!config.auto_remediate);
        assert_eq!(config.rules_path, "/etc/podwarden/rules");
        assert_eq!(config.action_timeout_secs, 30);
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.retry_backoff_base_ms, 250);
    }

    #[test]
    fn validate_rejects_zero_action_timeout() {
        let config = ResponderConfig {
            action_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_action_timeout() {
        let config = ResponderConfig {
            action_timeout_secs: 301,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_retry_attempts() {
        let config = ResponderConfig {
            retry_max_attempts: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_boundary_values() {
        let config = ResponderConfig {
            action_timeout_secs: 300,
            retry_max_attempts: 10,
            retry_backoff_base_ms: 30_000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = ResponderConfig {
            action_timeout_secs: 1,
            retry_max_attempts: 0,
            retry_backoff_base_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = ResponderConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ResponderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.auto_remediate, deserialized.auto_remediate);
        assert_eq!(config.action_timeout_secs, deserialized.action_timeout_secs);
    }
}
