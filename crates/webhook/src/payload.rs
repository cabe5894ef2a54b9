//! 인바운드 페이로드 파싱
//!
//! 탐지 도구의 웹훅 본문을 [`Alert`]로 변환합니다. 파싱은 의도적으로
//! 관대합니다: 필드 누락은 에러가 아니며(누락 → 빈 값 / 기본
//! 네임스페이스), 본문이 JSON 오브젝트가 아닐 때만 거부합니다.
//!
//! # 기대하는 본문 형태
//! ```json
//! {
//!   "rule": "Terminal shell in container",
//!   "output_fields": {
//!     "k8s.pod.name": "nginx-7f",
//!     "k8s.ns.name": "prod"
//!   }
//! }
//! ```
//! 그 외 최상위 키는 무시됩니다.

use serde_json::Value;

use podwarden_core::types::Alert;

use crate::error::WebhookError;

/// JSON 본문을 [`Alert`]로 파싱합니다.
///
/// # 관대한 해석 규칙
/// - `rule` 누락 또는 문자열이 아님 → 빈 문자열
/// - `output_fields` 누락 또는 오브젝트가 아님 → 빈 필드 목록
/// - 필드 값이 문자열이면 그대로, 숫자/불리언이면 문자열화,
///   중첩 오브젝트/배열/null은 건너뜀 (대상 추출에 쓰이지 않음)
///
/// # Errors
///
/// 본문이 유효한 JSON이 아니거나 최상위가 오브젝트가 아니면
/// [`WebhookError::MalformedPayload`]를 반환합니다.
pub fn parse_alert(body: &[u8]) -> Result<Alert, WebhookError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| WebhookError::MalformedPayload(format!("invalid JSON: {e}")))?;

    let Value::Object(obj) = value else {
        return Err(WebhookError::MalformedPayload(format!(
            "expected JSON object, got {}",
            json_type_name(&value)
        )));
    };

    let rule = obj
        .get("rule")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let mut fields = Vec::new();
    if let Some(Value::Object(map)) = obj.get("output_fields") {
        for (key, val) in map {
            match val {
                Value::String(s) => fields.push((key.clone(), s.clone())),
                Value::Number(n) => fields.push((key.clone(), n.to_string())),
                Value::Bool(b) => fields.push((key.clone(), b.to_string())),
                // 중첩 값과 null은 대상 추출에 쓰이지 않으므로 건너뜀
                Value::Null | Value::Array(_) | Value::Object(_) => {}
            }
        }
    }

    Ok(Alert::new(rule, fields))
}

/// 에러 메시지용 JSON 값 타입명
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podwarden_core::types::{DEFAULT_NAMESPACE, FIELD_NAMESPACE, FIELD_POD_NAME};

    #[test]
    fn parse_full_payload() {
        let body = br#"{
            "rule": "Terminal shell spawned",
            "output_fields": {
                "k8s.pod.name": "nginx-7f",
                "k8s.ns.name": "prod",
                "proc.name": "bash"
            }
        }"#;
        let alert = parse_alert(body).unwrap();
        assert_eq!(alert.rule, "Terminal shell spawned");
        assert_eq!(alert.pod_name(), Some("nginx-7f"));
        assert_eq!(alert.namespace(), "prod");
        assert_eq!(alert.field("proc.name"), Some("bash"));
    }

    #[test]
    fn parse_missing_rule_becomes_empty() {
        let body = br#"{"output_fields": {"k8s.pod.name": "nginx-7f"}}"#;
        let alert = parse_alert(body).unwrap();
        assert!(alert.rule.is_empty());
        assert_eq!(alert.pod_name(), Some("nginx-7f"));
    }

    #[test]
    fn parse_missing_output_fields_becomes_empty() {
        let body = br#"{"rule": "Terminal shell spawned"}"#;
        let alert = parse_alert(body).unwrap();
        assert_eq!(alert.rule, "Terminal shell spawned");
        assert!(alert.fields.is_empty());
        assert_eq!(alert.pod_name(), None);
        assert_eq!(alert.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn parse_empty_object_is_valid() {
        let alert = parse_alert(b"{}").unwrap();
        assert!(alert.rule.is_empty());
        assert!(alert.fields.is_empty());
    }

    #[test]
    fn parse_ignores_unknown_top_level_keys() {
        let body = br#"{
            "rule": "Terminal shell spawned",
            "priority": "Notice",
            "time": "2026-08-07T12:00:00Z",
            "hostname": "node-1"
        }"#;
        let alert = parse_alert(body).unwrap();
        assert_eq!(alert.rule, "Terminal shell spawned");
    }

    #[test]
    fn parse_stringifies_scalar_field_values() {
        let body = br#"{
            "rule": "shell",
            "output_fields": {
                "proc.pid": 4242,
                "proc.is_exe_writable": false,
                "k8s.pod.name": "nginx-7f"
            }
        }"#;
        let alert = parse_alert(body).unwrap();
        assert_eq!(alert.field("proc.pid"), Some("4242"));
        assert_eq!(alert.field("proc.is_exe_writable"), Some("false"));
        assert_eq!(alert.pod_name(), Some("nginx-7f"));
    }

    #[test]
    fn parse_skips_nested_field_values() {
        let body = br#"{
            "rule": "shell",
            "output_fields": {
                "k8s.pod.labels": {"app": "web"},
                "fd.types": ["file", "socket"],
                "empty": null,
                "k8s.pod.name": "nginx-7f"
            }
        }"#;
        let alert = parse_alert(body).unwrap();
        assert_eq!(alert.field("k8s.pod.labels"), None);
        assert_eq!(alert.field("fd.types"), None);
        assert_eq!(alert.field("empty"), None);
        assert_eq!(alert.pod_name(), Some("nginx-7f"));
    }

    #[test]
    fn parse_non_string_rule_becomes_empty() {
        let body = br#"{"rule": 42}"#;
        let alert = parse_alert(body).unwrap();
        assert!(alert.rule.is_empty());
    }

    #[test]
    fn parse_non_object_output_fields_becomes_empty() {
        let body = br#"{"rule": "shell", "output_fields": "not-a-map"}"#;
        let alert = parse_alert(body).unwrap();
        assert!(alert.fields.is_empty());
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let result = parse_alert(b"{not json");
        assert!(matches!(result, Err(WebhookError::MalformedPayload(_))));
    }

    #[test]
    fn parse_rejects_non_object_bodies() {
        for (body, type_name) in [
            (&b"[1, 2, 3]"[..], "array"),
            (&b"\"just a string\""[..], "string"),
            (&b"42"[..], "number"),
            (&b"null"[..], "null"),
            (&b"true"[..], "boolean"),
        ] {
            let err = parse_alert(body).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains(type_name), "body {body:?} → {msg}");
        }
    }

    #[test]
    fn parse_rejects_empty_body() {
        assert!(parse_alert(b"").is_err());
    }

    #[test]
    fn parse_extracts_target_fields_exactly() {
        let body = br#"{
            "rule": "shell",
            "output_fields": {"k8s.pod.name": "a", "k8s.ns.name": "b"}
        }"#;
        let alert = parse_alert(body).unwrap();
        assert_eq!(alert.field(FIELD_POD_NAME), Some("a"));
        assert_eq!(alert.field(FIELD_NAMESPACE), Some("b"));
    }
}
