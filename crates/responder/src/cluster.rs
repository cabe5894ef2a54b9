//! Kubernetes API abstraction for testability.
//!
//! The [`ClusterClient`] trait abstracts the kube API, allowing production
//! code to use [`KubeClusterClient`] while tests use `MockClusterClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   PodResponder   │
//! └────────┬─────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ClusterClient│ (trait)
//!   └─────────────┘
//!        │     │
//!        ▼     ▼
//!   ┌─────┐ ┌──────┐
//!   │Kube │ │Mock  │
//!   └───┬─┘ └──────┘
//!       │
//!       ▼
//!   API Server
//! ```
//!
//! # Target Name Validation
//!
//! All methods that accept pod/namespace names perform RFC 1123 validation
//! before issuing the API call:
//! - Pod names: DNS subdomains, 1-253 chars, lowercase alphanumerics plus
//!   `-` and `.`, starting and ending with an alphanumeric
//! - Namespaces: DNS labels, 1-63 chars, no `.`
//!
//! Empty names and names with other characters are rejected; nothing
//! user-controlled reaches the API path unvalidated.
//!
//! # Error Handling
//!
//! - **404 responses**: `DeleteOutcome::NotFound` when `ignore_not_found`
//!   is set, `ResponderError::PodNotFound` otherwise
//! - **403 responses**: `ResponderError::PermissionDenied`
//! - **Other API errors**: `ResponderError::ClusterApi` with the status code
//! - **Transport errors**: `ResponderError::ClusterConnection`

use std::future::Future;

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::DeleteParams;

use crate::error::ResponderError;

/// 파드 이름 최대 길이 (DNS subdomain)
const MAX_POD_NAME_LEN: usize = 253;
/// 네임스페이스 최대 길이 (DNS label)
const MAX_NAMESPACE_LEN: usize = 63;

/// 삭제 호출 결과
///
/// 대상이 실제로 존재해서 삭제되었는지, 이미 사라진 상태였는지를
/// 구분합니다. 디스패처는 두 경우 모두 성공으로 취급합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 삭제 요청이 수락됨
    Deleted,
    /// 대상이 이미 존재하지 않음 (ignore_not_found로 흡수됨)
    NotFound,
}

/// RFC 1123 DNS subdomain 검증 (파드 이름)
pub(crate) fn validate_pod_name(name: &str) -> Result<(), ResponderError> {
    validate_dns_name(name, "pod name", MAX_POD_NAME_LEN, true)
}

/// RFC 1123 DNS label 검증 (네임스페이스)
pub(crate) fn validate_namespace(namespace: &str) -> Result<(), ResponderError> {
    validate_dns_name(namespace, "namespace", MAX_NAMESPACE_LEN, false)
}

fn validate_dns_name(
    value: &str,
    field: &'static str,
    max_len: usize,
    allow_dots: bool,
) -> Result<(), ResponderError> {
    if value.is_empty() || value.len() > max_len {
        return Err(ResponderError::InvalidTarget {
            field: field.to_owned(),
            reason: format!("length {} (must be 1-{max_len})", value.len()),
        });
    }

    let valid_char = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || (allow_dots && c == '.')
    };
    if !value.chars().all(valid_char) {
        return Err(ResponderError::InvalidTarget {
            field: field.to_owned(),
            reason: "contains characters outside [a-z0-9-.]".to_owned(),
        });
    }

    // 시작/끝은 영숫자여야 함 (RFC 1123)
    let first = value.chars().next().unwrap_or('-');
    let last = value.chars().last().unwrap_or('-');
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(ResponderError::InvalidTarget {
            field: field.to_owned(),
            reason: "must start and end with an alphanumeric character".to_owned(),
        });
    }

    Ok(())
}

/// Trait abstracting Kubernetes API operations.
///
/// All cluster calls go through this trait, enabling testability via
/// mocking. The trait is `Send + Sync + 'static`, allowing safe sharing
/// across async contexts.
///
/// # Implementations
///
/// - [`KubeClusterClient`]: Production implementation using the `kube` library
/// - `MockClusterClient`: Test implementation with configurable responses
///   (available in tests only)
pub trait ClusterClient: Send + Sync + 'static {
    /// Deletes a pod by name and namespace.
    ///
    /// With `ignore_not_found`, deleting a pod that no longer exists
    /// returns `DeleteOutcome::NotFound` instead of an error. Remediation
    /// races pod lifecycle and duplicate webhook deliveries, so callers
    /// almost always want this set.
    ///
    /// # Errors
    ///
    /// - `ResponderError::InvalidTarget`: name or namespace fails RFC 1123
    ///   validation
    /// - `ResponderError::PodNotFound`: pod absent and `ignore_not_found`
    ///   is false
    /// - `ResponderError::PermissionDenied`: API returned 403
    /// - `ResponderError::ClusterApi` / `ClusterConnection`: other failures
    fn delete_pod(
        &self,
        name: &str,
        namespace: &str,
        ignore_not_found: bool,
    ) -> impl Future<Output = Result<DeleteOutcome, ResponderError>> + Send;

    /// Checks API server connectivity.
    ///
    /// Used by the webhook gateway's `Pipeline::health_check()`
    /// implementation to report health status.
    fn ping(&self) -> impl Future<Output = Result<(), ResponderError>> + Send;
}

/// Production cluster client implementation using `kube`.
///
/// Resolves credentials the standard way: in-cluster service account when
/// running inside Kubernetes, otherwise the local kubeconfig.
pub struct KubeClusterClient {
    client: kube::Client,
}

impl KubeClusterClient {
    /// Connects using the default credential chain
    /// (in-cluster config, then kubeconfig).
    ///
    /// # Errors
    ///
    /// Returns `ResponderError::ClusterConnection` if no usable
    /// configuration is found.
    pub async fn connect() -> Result<Self, ResponderError> {
        let client = kube::Client::try_default().await.map_err(|e| {
            ResponderError::ClusterConnection(format!("failed to create kubernetes client: {e}"))
        })?;
        Ok(Self { client })
    }

    /// Wraps an existing `kube::Client`.
    pub fn from_client(client: kube::Client) -> Self {
        Self { client }
    }
}

impl ClusterClient for KubeClusterClient {
    async fn delete_pod(
        &self,
        name: &str,
        namespace: &str,
        ignore_not_found: bool,
    ) -> Result<DeleteOutcome, ResponderError> {
        validate_pod_name(name)?;
        validate_namespace(namespace)?;

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        match pods.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                if ignore_not_found {
                    Ok(DeleteOutcome::NotFound)
                } else {
                    Err(ResponderError::PodNotFound(format!("{namespace}/{name}")))
                }
            }
            Err(kube::Error::Api(err)) if err.code == 403 => {
                Err(ResponderError::PermissionDenied {
                    target: format!("{namespace}/{name}"),
                    reason: err.message,
                })
            }
            Err(kube::Error::Api(err)) => Err(ResponderError::ClusterApi {
                code: err.code,
                reason: err.message,
            }),
            Err(e) => Err(ResponderError::ClusterConnection(format!(
                "pod delete request failed: {e}"
            ))),
        }
    }

    async fn ping(&self) -> Result<(), ResponderError> {
        self.client
            .apiserver_version()
            .await
            .map(|_| ())
            .map_err(|e| ResponderError::ClusterConnection(format!("ping failed: {e}")))
    }
}

/// 테스트용 Mock 클러스터 클라이언트
///
/// 가짜 파드 목록을 상태로 들고 있어 삭제가 실제로 반영됩니다.
/// 동일 파드에 대한 중복 삭제의 멱등성을 검증할 수 있습니다.
#[cfg(test)]
pub struct MockClusterClient {
    /// 클러스터에 존재하는 파드 목록
    pub pods: std::sync::Mutex<Vec<podwarden_core::types::PodTarget>>,
    /// 삭제 호출 시 API 에러(500)를 시뮬레이션할지 여부
    pub fail_deletes: bool,
    /// 삭제 호출 시 권한 거부(403)를 시뮬레이션할지 여부
    pub deny_deletes: bool,
    /// 삭제 호출 전 지연 (타임아웃 테스트용)
    pub delete_delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl MockClusterClient {
    /// 빈 클러스터로 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self {
            pods: std::sync::Mutex::new(Vec::new()),
            fail_deletes: false,
            deny_deletes: false,
            delete_delay: None,
        }
    }

    /// 테스트용 파드를 추가합니다.
    pub fn with_pods(self, pods: Vec<podwarden_core::types::PodTarget>) -> Self {
        *self.pods.lock().unwrap() = pods;
        self
    }

    /// 삭제 호출 시 실패하도록 설정합니다.
    pub fn with_failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    /// 삭제 호출 시 권한 거부를 반환하도록 설정합니다.
    pub fn with_permission_denied(mut self) -> Self {
        self.deny_deletes = true;
        self
    }

    /// 삭제 호출 전 지연을 설정합니다.
    pub fn with_delete_delay(mut self, delay: std::time::Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    /// 해당 파드가 아직 존재하는지 확인합니다.
    pub fn has_pod(&self, name: &str, namespace: &str) -> bool {
        self.pods
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.name == name && p.namespace == namespace)
    }
}

#[cfg(test)]
impl ClusterClient for MockClusterClient {
    async fn delete_pod(
        &self,
        name: &str,
        namespace: &str,
        ignore_not_found: bool,
    ) -> Result<DeleteOutcome, ResponderError> {
        validate_pod_name(name)?;
        validate_namespace(namespace)?;

        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }

        if self.deny_deletes {
            return Err(ResponderError::PermissionDenied {
                target: format!("{namespace}/{name}"),
                reason: "mock forbidden".to_owned(),
            });
        }

        if self.fail_deletes {
            return Err(ResponderError::ClusterApi {
                code: 500,
                reason: "mock failure".to_owned(),
            });
        }

        let mut pods = self.pods.lock().unwrap();
        let position = pods
            .iter()
            .position(|p| p.name == name && p.namespace == namespace);

        match position {
            Some(idx) => {
                pods.remove(idx);
                Ok(DeleteOutcome::Deleted)
            }
            None if ignore_not_found => Ok(DeleteOutcome::NotFound),
            None => Err(ResponderError::PodNotFound(format!("{namespace}/{name}"))),
        }
    }

    async fn ping(&self) -> Result<(), ResponderError> {
        Ok(())
    }
}
