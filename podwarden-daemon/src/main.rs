use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use podwarden_core::config::PodwardenConfig;
use podwarden_core::error::{ConfigError, PodwardenError};
use podwarden_core::pipeline::Pipeline;
use podwarden_responder::{
    KubeClusterClient, PodResponderBuilder, ResponderConfig, load_rules_from_dir,
};
use podwarden_webhook::WebhookServer;

use podwarden_daemon::{audit, cli, logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::DaemonCli::parse();

    // 설정 로드 — 기본 경로에 파일이 없으면 기본값 + 환경변수로 동작
    let mut config = match PodwardenConfig::load(&cli.config).await {
        Ok(config) => config,
        Err(PodwardenError::Config(ConfigError::FileNotFound { path })) => {
            eprintln!("config file not found at {path}, using defaults");
            let mut config = PodwardenConfig::default();
            config.apply_env_overrides();
            config
        }
        Err(e) => return Err(anyhow::anyhow!("failed to load config: {}", e)),
    };

    // CLI 오버라이드 (최고 우선순위)
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(port) = cli.port {
        config.webhook.port = port;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK");
        return Ok(());
    }

    // 로깅 초기화
    logging::init_tracing(&config.general)?;
    tracing::info!("podwarden-daemon starting");

    // 메트릭 recorder 설치
    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
    }

    // 클러스터 클라이언트 생성
    let cluster = Arc::new(
        KubeClusterClient::connect()
            .await
            .map_err(|e| anyhow::anyhow!("failed to create cluster client: {}", e))?,
    );

    // 대응기 빌드 (규칙 디렉토리가 지정되면 파일 규칙, 아니면 내장 규칙)
    let responder_config = ResponderConfig::from_core(&config.response);
    let mut builder = PodResponderBuilder::new()
        .cluster_client(cluster)
        .config(responder_config.clone());

    if !responder_config.rules_path.is_empty() {
        let rules_dir = std::path::Path::new(&responder_config.rules_path);
        let rules = load_rules_from_dir(rules_dir)
            .map_err(|e| anyhow::anyhow!("failed to load rules: {}", e))?;
        if rules.is_empty() {
            return Err(anyhow::anyhow!(
                "no valid rules found in '{}'",
                responder_config.rules_path
            ));
        }
        tracing::info!(
            count = rules.len(),
            path = %responder_config.rules_path,
            "loaded response rules"
        );
        builder = builder.rules(rules);
    }

    let (responder, action_rx) = builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build pod responder: {}", e))?;
    tracing::info!("pod responder initialized");

    // 감사 로깅 태스크
    let action_rx = action_rx.ok_or_else(|| anyhow::anyhow!("action receiver missing"))?;
    let audit_task = audit::spawn_audit_task(action_rx);

    // 웹훅 게이트웨이 시작
    let mut server = WebhookServer::new(config.webhook.clone(), Arc::new(responder));
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start webhook gateway: {}", e))?;

    // 종료 시그널 대기
    tracing::info!("podwarden-daemon running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // 우아한 종료
    if let Err(e) = server.stop().await {
        tracing::error!(error = %e, "failed to stop webhook gateway");
    }

    // 마지막 action 송신자를 해제하여 audit 태스크를 종료시킴
    drop(server);
    let _ = audit_task.await;

    tracing::info!("podwarden-daemon shut down");
    Ok(())
}
