//! TaskBee
//!
//! 入口：加载 .env 与配置、初始化日志、构建 Agent 流水线与 HTTP 路由，并运行到收到关闭信号。

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use taskbee::agent::DocumentPipeline;
use taskbee::config::load_config;
use taskbee::core::ShutdownManager;
use taskbee::observability;
use taskbee::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    observability::init();

    let config_path = std::env::var("TASKBEE_CONFIG").ok().map(Into::into);
    let cfg = load_config(config_path).context("Failed to load configuration")?;

    tokio::fs::create_dir_all(&cfg.app.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", cfg.app.upload_dir.display()))?;

    let state = AppState {
        pipeline: Arc::new(DocumentPipeline::from_config(&cfg)),
        upload_dir: cfg.app.upload_dir.clone(),
        degrade_on_pipeline_error: cfg.server.degrade_on_pipeline_error,
    };
    let app = build_router(state, &cfg.server);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("TaskBee listening on http://{}", addr);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let waiter = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { waiter.wait_for_shutdown().await })
        .await
        .context("Server error")?;

    tracing::info!("TaskBee stopped");
    Ok(())
}
