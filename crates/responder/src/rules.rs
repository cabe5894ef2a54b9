//! 대응 규칙 -- 규칙 정의 및 알림 평가
//!
//! [`ResponseRule`]은 어떤 알림에 대해 파드 삭제를 수행할지 정의합니다.
//! [`RuleEngine`]은 여러 규칙을 관리하고, 알림에 대해 매칭되는 규칙을
//! 평가하여 [`RemediationDecision`]을 생성합니다.
//!
//! 규칙 매칭은 의도적으로 넓습니다: 탐지 규칙 이름은 도구와 버전에 따라
//! 달라지므로 대소문자 구분 없는 부분 문자열 매칭을 사용합니다. 파드 하나를
//! 삭제하는 비용은 실제 침해 이벤트를 놓치는 비용보다 훨씬 작습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use podwarden_core::event::AlertEvent;
use podwarden_core::types::PodTarget;

use crate::error::ResponderError;

/// Maximum rule file size (1 MB) to prevent OOM via malicious TOML
const MAX_RULE_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum number of rules to prevent unbounded Vec growth
const MAX_RULES: usize = 1000;

/// 대응 규칙
///
/// 알림의 규칙 텍스트에 `pattern`이 부분 문자열로 포함되면 (대소문자 무시)
/// 대상 파드 삭제를 트리거합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRule {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙 이름
    pub name: String,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
    /// 활성화 여부
    pub enabled: bool,
    /// 매칭할 부분 문자열 (대소문자 구분 없음)
    pub pattern: String,
    /// 규칙 우선순위 (낮을수록 먼저 평가)
    pub priority: u32,
}

impl ResponseRule {
    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ResponderError> {
        if self.id.is_empty() {
            return Err(ResponderError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id cannot be empty".to_owned(),
            });
        }

        if self.id.len() > 256 {
            return Err(ResponderError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule id must not exceed 256 characters".to_owned(),
            });
        }

        if self.name.is_empty() {
            return Err(ResponderError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule name cannot be empty".to_owned(),
            });
        }

        // 빈 패턴은 모든 알림에 매칭되므로 명시적으로 거부
        if self.pattern.is_empty() {
            return Err(ResponderError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "pattern cannot be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// 알림의 규칙 텍스트가 이 규칙의 패턴에 매칭되는지 확인합니다.
    ///
    /// 대소문자 구분 없는 부분 문자열 매칭입니다.
    pub fn matches(&self, rule_text: &str) -> bool {
        rule_text
            .to_lowercase()
            .contains(&self.pattern.to_lowercase())
    }
}

/// 내장 기본 규칙 목록
///
/// 설정에서 규칙 디렉토리를 지정하지 않으면 이 규칙들이 사용됩니다.
/// 컨테이너 내 셸 실행을 설명하는 모든 탐지 규칙에 매칭됩니다.
pub fn default_rules() -> Vec<ResponseRule> {
    vec![ResponseRule {
        id: "shell-spawn".to_owned(),
        name: "Shell spawned in container".to_owned(),
        description: "Deletes the offending pod when any detection rule describing \
                      shell activity fires"
            .to_owned(),
        enabled: true,
        pattern: "shell".to_owned(),
        priority: 10,
    }]
}

/// 무시 사유
///
/// 알림이 대응으로 이어지지 않은 이유를 나타냅니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// 알림에 규칙 텍스트가 없음
    EmptyRule,
    /// 어떤 규칙에도 매칭되지 않음
    NoRuleMatched,
    /// 규칙은 매칭되었지만 대상 파드 이름이 없음
    NoPodName,
    /// 자동 대응이 설정에서 비활성화됨
    RemediationDisabled,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRule => write!(f, "alert has no rule text"),
            Self::NoRuleMatched => write!(f, "no response rule matched"),
            Self::NoPodName => write!(f, "no pod name in alert fields"),
            Self::RemediationDisabled => write!(f, "auto remediation disabled"),
        }
    }
}

/// 규칙 평가 결과
///
/// 알림 하나당 한 번 생성되며, 디스패처가 소비하거나 폐기됩니다.
#[derive(Debug, Clone)]
pub enum RemediationDecision {
    /// 매칭된 규칙에 따라 대상 파드를 삭제
    Act {
        /// 매칭된 규칙 ID
        rule_id: String,
        /// 매칭된 규칙 이름
        rule_name: String,
        /// 삭제 대상 파드
        target: PodTarget,
    },
    /// 대응하지 않음
    Ignore {
        /// 무시 사유
        reason: IgnoreReason,
    },
}

impl RemediationDecision {
    /// 대응 결정인지 확인합니다.
    pub fn is_act(&self) -> bool {
        matches!(self, Self::Act { .. })
    }
}

/// 규칙 엔진 -- 여러 규칙을 관리하고 알림에 대해 평가합니다.
///
/// 규칙은 우선순위 순으로 평가되며, 첫 번째로 매칭되는 규칙이 결정을
/// 만듭니다.
pub struct RuleEngine {
    /// 등록된 규칙 목록 (우선순위 순으로 정렬)
    rules: Vec<ResponseRule>,
}

impl RuleEngine {
    /// 빈 규칙 엔진을 생성합니다.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 규칙을 추가합니다.
    ///
    /// 추가 후 우선순위 순으로 자동 정렬됩니다.
    pub fn add_rule(&mut self, rule: ResponseRule) -> Result<(), ResponderError> {
        if self.rules.len() >= MAX_RULES {
            return Err(ResponderError::RuleValidation {
                rule_id: rule.id.clone(),
                reason: format!("maximum rule count ({MAX_RULES}) reached"),
            });
        }

        rule.validate()?;
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.priority);
        Ok(())
    }

    /// 규칙을 ID로 제거합니다.
    ///
    /// 존재하지 않는 ID를 지정하면 아무 일도 하지 않습니다.
    pub fn remove_rule(&mut self, rule_id: &str) {
        self.rules.retain(|r| r.id != rule_id);
    }

    /// 등록된 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 모든 규칙을 제거합니다.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// 등록된 규칙 목록을 반환합니다 (읽기 전용).
    pub fn rules(&self) -> &[ResponseRule] {
        &self.rules
    }

    /// 알림 이벤트에 대해 규칙을 평가합니다.
    ///
    /// 우선순위가 가장 높은(priority 값이 가장 낮은) 매칭 규칙이 결정을
    /// 만듭니다. 두 조건이 모두 성립해야 `Act`가 됩니다:
    /// 규칙 패턴 매칭 AND 대상 파드 이름 존재.
    /// 네임스페이스는 항상 해석되며(기본값 `"default"`) 결정을 막지
    /// 않습니다.
    pub fn evaluate(&self, event: &AlertEvent) -> RemediationDecision {
        let alert = &event.alert;

        if alert.rule.is_empty() {
            return RemediationDecision::Ignore {
                reason: IgnoreReason::EmptyRule,
            };
        }

        for rule in &self.rules {
            if !rule.enabled {
                continue;
            }

            if !rule.matches(&alert.rule) {
                continue;
            }

            // 모든 규칙은 같은 필드에서 대상을 읽으므로 첫 매칭에서 확정
            return match alert.pod_name() {
                Some(pod) => RemediationDecision::Act {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    target: PodTarget::new(pod, alert.namespace()),
                },
                None => RemediationDecision::Ignore {
                    reason: IgnoreReason::NoPodName,
                },
            };
        }

        RemediationDecision::Ignore {
            reason: IgnoreReason::NoRuleMatched,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// TOML 파일에서 규칙을 로드합니다.
///
/// # Arguments
/// - `path`: TOML 파일 경로
///
/// # Errors
/// - 파일 읽기 실패
/// - TOML 파싱 실패
/// - 규칙 유효성 검증 실패
pub fn load_rule_from_file(path: &std::path::Path) -> Result<ResponseRule, ResponderError> {
    // Check file size before reading to prevent OOM
    let metadata = std::fs::metadata(path).map_err(|e| ResponderError::RuleLoad {
        path: path.display().to_string(),
        reason: format!("failed to read metadata: {e}"),
    })?;

    if metadata.len() > MAX_RULE_FILE_SIZE {
        return Err(ResponderError::RuleLoad {
            path: path.display().to_string(),
            reason: format!(
                "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                metadata.len()
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ResponderError::RuleLoad {
        path: path.display().to_string(),
        reason: format!("failed to read file: {e}"),
    })?;

    let rule: ResponseRule = toml::from_str(&content).map_err(|e| ResponderError::RuleLoad {
        path: path.display().to_string(),
        reason: format!("failed to parse TOML: {e}"),
    })?;

    rule.validate()?;
    Ok(rule)
}

/// 디렉토리의 모든 TOML 파일에서 규칙을 로드합니다.
///
/// # Arguments
/// - `dir_path`: 규칙 파일 디렉토리 경로
///
/// # Returns
/// - 로드된 규칙 목록 (파싱 실패한 파일은 스킵됨)
pub fn load_rules_from_dir(
    dir_path: &std::path::Path,
) -> Result<Vec<ResponseRule>, ResponderError> {
    let mut rules = Vec::new();
    let entries = std::fs::read_dir(dir_path).map_err(|e| ResponderError::RuleLoad {
        path: dir_path.display().to_string(),
        reason: format!("failed to read directory: {e}"),
    })?;

    // Canonicalize the directory path ONCE before the loop to prevent TOCTOU races
    let canonical_dir = dir_path
        .canonicalize()
        .map_err(|e| ResponderError::RuleLoad {
            path: dir_path.display().to_string(),
            reason: format!("failed to canonicalize directory: {e}"),
        })?;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry");
                continue;
            }
        };

        let path = entry.path();

        // Validate path to prevent symlink traversal attacks
        let canonical_path = match path.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to canonicalize path, skipping");
                continue;
            }
        };

        // Verify canonical path is still within the rule directory
        if !canonical_path.starts_with(&canonical_dir) {
            tracing::warn!(
                path = %path.display(),
                canonical = %canonical_path.display(),
                "path traversal detected, skipping"
            );
            continue;
        }

        if !canonical_path.is_file() {
            continue;
        }

        if let Some(ext) = canonical_path.extension() {
            if ext != "toml" {
                continue;
            }
        } else {
            continue;
        }

        match load_rule_from_file(&canonical_path) {
            Ok(rule) => {
                tracing::debug!(rule_id = %rule.id, path = %canonical_path.display(), "loaded rule");
                rules.push(rule);
            }
            Err(e) => {
                tracing::warn!(path = %canonical_path.display(), error = %e, "failed to load rule file");
            }
        }
    }

    Ok(rules)
}
