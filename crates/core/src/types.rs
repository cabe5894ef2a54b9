//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 탐지 도구가 보내는 파드 이름 필드 키
pub const FIELD_POD_NAME: &str = "k8s.pod.name";
/// 탐지 도구가 보내는 네임스페이스 필드 키
pub const FIELD_NAMESPACE: &str = "k8s.ns.name";
/// 네임스페이스 필드가 없을 때 사용하는 기본값
pub const DEFAULT_NAMESPACE: &str = "default";

/// 보안 알림
///
/// 런타임 위협 탐지 도구가 웹훅으로 전달한 알림 하나를 나타냅니다.
/// 생성 이후 읽기 전용이며, 어떤 컴포넌트도 내용을 변경하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 트리거된 탐지 규칙의 자유 텍스트 설명 (비어있을 수 있음)
    pub rule: String,
    /// 임의의 key/value 메타데이터
    pub fields: Vec<(String, String)>,
    /// 수신 시각
    pub received_at: SystemTime,
}

impl Alert {
    /// 새 알림을 생성합니다.
    pub fn new(rule: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            rule: rule.into(),
            fields,
            received_at: SystemTime::now(),
        }
    }

    /// 메타데이터 필드 값을 키로 조회합니다.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 대상 파드 이름을 반환합니다.
    ///
    /// `k8s.pod.name` 필드가 없거나 빈 문자열이면 `None`을 반환합니다.
    pub fn pod_name(&self) -> Option<&str> {
        self.field(FIELD_POD_NAME).filter(|name| !name.is_empty())
    }

    /// 대상 네임스페이스를 반환합니다.
    ///
    /// `k8s.ns.name` 필드가 없거나 빈 문자열이면 `"default"`를 반환합니다.
    /// 네임스페이스 해석은 항상 성공하며, 결정을 막지 않습니다.
    pub fn namespace(&self) -> &str {
        self.field(FIELD_NAMESPACE)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alert[rule={:?} pod={:?} ns={}]",
            self.rule,
            self.pod_name().unwrap_or(""),
            self.namespace(),
        )
    }
}

/// 완전히 해석된 대응 대상 파드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTarget {
    /// 파드 이름
    pub name: String,
    /// 네임스페이스
    pub namespace: String,
}

impl PodTarget {
    /// 새 대상을 생성합니다.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for PodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert() -> Alert {
        Alert::new(
            "Terminal shell in container",
            vec![
                (FIELD_POD_NAME.to_owned(), "nginx-7f".to_owned()),
                (FIELD_NAMESPACE.to_owned(), "prod".to_owned()),
                ("proc.name".to_owned(), "bash".to_owned()),
            ],
        )
    }

    #[test]
    fn field_lookup_returns_value() {
        let alert = sample_alert();
        assert_eq!(alert.field("proc.name"), Some("bash"));
        assert_eq!(alert.field("nonexistent"), None);
    }

    #[test]
    fn pod_name_from_fields() {
        let alert = sample_alert();
        assert_eq!(alert.pod_name(), Some("nginx-7f"));
    }

    #[test]
    fn pod_name_absent_is_none() {
        let alert = Alert::new("Terminal shell", Vec::new());
        assert_eq!(alert.pod_name(), None);
    }

    #[test]
    fn pod_name_empty_is_none() {
        let alert = Alert::new(
            "Terminal shell",
            vec![(FIELD_POD_NAME.to_owned(), String::new())],
        );
        assert_eq!(alert.pod_name(), None);
    }

    #[test]
    fn namespace_from_fields() {
        let alert = sample_alert();
        assert_eq!(alert.namespace(), "prod");
    }

    #[test]
    fn namespace_absent_defaults() {
        let alert = Alert::new(
            "Terminal shell",
            vec![(FIELD_POD_NAME.to_owned(), "nginx-7f".to_owned())],
        );
        assert_eq!(alert.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn namespace_empty_defaults() {
        let alert = Alert::new(
            "Terminal shell",
            vec![(FIELD_NAMESPACE.to_owned(), String::new())],
        );
        assert_eq!(alert.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn alert_display_contains_target() {
        let display = sample_alert().to_string();
        assert!(display.contains("nginx-7f"));
        assert!(display.contains("prod"));
    }

    #[test]
    fn pod_target_display() {
        let target = PodTarget::new("nginx-7f", "prod");
        assert_eq!(target.to_string(), "prod/nginx-7f");
    }

    #[test]
    fn alert_serialize_roundtrip() {
        let alert = sample_alert();
        let json = serde_json::to_string(&alert).unwrap();
        let deserialized: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(alert.rule, deserialized.rule);
        assert_eq!(alert.fields, deserialized.fields);
    }
}
