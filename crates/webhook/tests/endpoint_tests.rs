//! 엔드포인트 E2E 테스트
//!
//! 실제 TCP 포트에 바인드된 서버에 HTTP 요청을 보내
//! 요청 → 파싱 → 평가 → 디스패치 → 응답 전체 경로를 검증합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use podwarden_core::config::WebhookConfig;
use podwarden_core::pipeline::Pipeline;
use podwarden_core::types::PodTarget;
use podwarden_responder::{
    ClusterClient, DeleteOutcome, PodResponderBuilder, ResponderConfig, ResponderError,
};
use podwarden_webhook::WebhookServer;

/// 삭제 호출을 기록하는 테스트 클러스터
struct TestClusterClient {
    pods: std::sync::Mutex<Vec<PodTarget>>,
    delete_calls: AtomicU64,
    fail_deletes: std::sync::atomic::AtomicBool,
}

impl TestClusterClient {
    fn new(pods: Vec<PodTarget>) -> Self {
        Self {
            pods: std::sync::Mutex::new(pods),
            delete_calls: AtomicU64::new(0),
            fail_deletes: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn delete_calls(&self) -> u64 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn has_pod(&self, name: &str, namespace: &str) -> bool {
        self.pods
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.name == name && p.namespace == namespace)
    }

    fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl ClusterClient for TestClusterClient {
    async fn delete_pod(
        &self,
        name: &str,
        namespace: &str,
        ignore_not_found: bool,
    ) -> Result<DeleteOutcome, ResponderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        // 호출자는 항상 멱등 삭제를 요청해야 함
        assert!(ignore_not_found, "delete must use ignore_not_found");

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ResponderError::ClusterApi {
                code: 500,
                reason: "injected failure".to_owned(),
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
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn ping(&self) -> Result<(), ResponderError> {
        Ok(())
    }
}

/// 테스트 서버를 구동하고 (클라이언트 핸들, base URL, 서버)를 반환합니다.
async fn spawn_server(
    pods: Vec<PodTarget>,
) -> (Arc<TestClusterClient>, String, WebhookServer<TestClusterClient>) {
    let cluster = Arc::new(TestClusterClient::new(pods));
    let (responder, _action_rx) = PodResponderBuilder::new()
        .cluster_client(Arc::clone(&cluster))
        .config(ResponderConfig {
            retry_max_attempts: 0,
            ..Default::default()
        })
        .build()
        .expect("build responder");

    let config = WebhookConfig {
        listen_addr: "127.0.0.1".to_owned(),
        port: 0, // ephemeral port
        ..Default::default()
    };
    let mut server = WebhookServer::new(config, Arc::new(responder));
    server.start().await.expect("start server");

    let addr = server.local_addr().expect("local addr");
    (cluster, format!("http://{addr}"), server)
}

#[tokio::test]
async fn post_matching_alert_deletes_pod_and_reports_deleted() {
    let (cluster, base, mut server) =
        spawn_server(vec![PodTarget::new("nginx-7f", "prod")]).await;

    let response = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({
            "rule": "Terminal shell spawned",
            "output_fields": {"k8s.pod.name": "nginx-7f", "k8s.ns.name": "prod"}
        }))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({"status": "deleted"}));

    assert_eq!(cluster.delete_calls(), 1);
    assert!(!cluster.has_pod("nginx-7f", "prod"));

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn post_non_matching_alert_is_ignored_without_cluster_call() {
    let (cluster, base, mut server) =
        spawn_server(vec![PodTarget::new("nginx-7f", "prod")]).await;

    let response = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({"rule": "File written below /etc"}))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({"status": "ignored"}));

    // 클러스터 호출 없음
    assert_eq!(cluster.delete_calls(), 0);
    assert!(cluster.has_pod("nginx-7f", "prod"));

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn post_matching_alert_without_pod_is_ignored() {
    let (cluster, base, mut server) = spawn_server(Vec::new()).await;

    let response = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({"rule": "shell_exec", "output_fields": {}}))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["status"], "ignored");
    assert_eq!(cluster.delete_calls(), 0);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn post_alert_without_namespace_targets_default() {
    let (cluster, base, mut server) =
        spawn_server(vec![PodTarget::new("nginx-7f", "default")]).await;

    let response = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({
            "rule": "Terminal shell spawned",
            "output_fields": {"k8s.pod.name": "nginx-7f"}
        }))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 200);
    // "default" 네임스페이스의 파드가 삭제됨
    assert!(!cluster.has_pod("nginx-7f", "default"));

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn post_malformed_body_is_rejected_with_400() {
    let (cluster, base, mut server) = spawn_server(Vec::new()).await;
    let client = reqwest::Client::new();

    for body in ["{not json", "[1,2,3]", "\"text\"", "42"] {
        let response = client
            .post(&base)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("send request");

        assert_eq!(response.status(), 400, "body {body:?}");
        let json: serde_json::Value = response.json().await.expect("json body");
        assert_eq!(json["status"], "error");
        assert!(json["detail"].is_string());
    }

    // 파싱 실패는 평가/디스패치 전에 멈춤
    assert_eq!(cluster.delete_calls(), 0);
    assert_eq!(server.malformed_payloads(), 4);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn post_dispatch_failure_reports_error_not_deleted() {
    let (cluster, base, mut server) =
        spawn_server(vec![PodTarget::new("nginx-7f", "prod")]).await;
    cluster.set_fail_deletes(true);

    let response = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({
            "rule": "Terminal shell spawned",
            "output_fields": {"k8s.pod.name": "nginx-7f", "k8s.ns.name": "prod"}
        }))
        .send()
        .await
        .expect("send request");

    // 실패한 삭제는 절대 "deleted"로 보고되지 않음
    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["status"], "error");

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn post_already_gone_pod_still_reports_deleted() {
    // 클러스터에 파드가 없어도 멱등 성공
    let (cluster, base, mut server) = spawn_server(Vec::new()).await;

    let response = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({
            "rule": "Terminal shell spawned",
            "output_fields": {"k8s.pod.name": "nginx-7f", "k8s.ns.name": "prod"}
        }))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["status"], "deleted");
    assert_eq!(cluster.delete_calls(), 1);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_all_succeed() {
    let (cluster, base, mut server) =
        spawn_server(vec![PodTarget::new("nginx-7f", "prod")]).await;
    let client = reqwest::Client::new();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let base = base.clone();
            tokio::spawn(async move {
                client
                    .post(&base)
                    .json(&serde_json::json!({
                        "rule": "Terminal shell spawned",
                        "output_fields": {"k8s.pod.name": "nginx-7f", "k8s.ns.name": "prod"}
                    }))
                    .send()
                    .await
                    .expect("send request")
            })
        })
        .collect();

    for handle in handles {
        let response = handle.await.expect("join");
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.expect("json body");
        assert_eq!(body["status"], "deleted");
    }

    // 중복 전달 이후 파드는 사라져 있고 에러는 없음
    assert!(!cluster.has_pod("nginx-7f", "prod"));
    assert_eq!(cluster.delete_calls(), 4);
    assert_eq!(server.events_received(), 4);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn healthz_reports_healthy() {
    let (_cluster, base, mut server) = spawn_server(Vec::new()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/healthz"))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 200);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let cluster = Arc::new(TestClusterClient::new(Vec::new()));
    let (responder, _action_rx) = PodResponderBuilder::new()
        .cluster_client(Arc::clone(&cluster))
        .build()
        .expect("build responder");

    let config = WebhookConfig {
        listen_addr: "127.0.0.1".to_owned(),
        port: 0,
        max_body_bytes: 64,
    };
    let mut server = WebhookServer::new(config, Arc::new(responder));
    server.start().await.expect("start server");
    let base = format!("http://{}", server.local_addr().expect("local addr"));

    let oversized = format!(
        r#"{{"rule": "{}"}}"#,
        "shell ".repeat(64) // 64바이트 제한 초과
    );
    let response = reqwest::Client::new()
        .post(&base)
        .header("content-type", "application/json")
        .body(oversized)
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), 413);
    assert_eq!(cluster.delete_calls(), 0);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn stopped_server_refuses_connections() {
    let (_cluster, base, mut server) = spawn_server(Vec::new()).await;
    server.stop().await.expect("stop server");

    let result = reqwest::Client::new()
        .post(&base)
        .json(&serde_json::json!({"rule": "shell"}))
        .send()
        .await;
    assert!(result.is_err());
}
