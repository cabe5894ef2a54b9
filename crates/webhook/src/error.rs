//! 웹훅 게이트웨이 에러 타입

use podwarden_core::error::{ParseError, PodwardenError};

/// 웹훅 게이트웨이 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// 본문을 JSON 오브젝트로 해석할 수 없음
    ///
    /// 필드 누락은 에러가 아닙니다 — 누락된 필드는 기본값으로
    /// 대체됩니다. 이 에러는 본문 전체가 오브젝트가 아닐 때만
    /// 발생합니다.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<WebhookError> for PodwardenError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::MalformedPayload(reason) => {
                PodwardenError::Parse(ParseError::Malformed(reason))
            }
        }
    }
}
