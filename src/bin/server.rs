//! Chhotu HTTP 服务
//!
//! 路由：GET / 、GET /health 、POST /chat 、GET /operations
//!
//! 环境变量:
//! - CHHOTU__*: 覆盖 config/default.toml 中的任意键
//! - OPENAI_API_KEY 或 DEEPSEEK_API_KEY: 云端 LLM API Key
//!
//! 启动: cargo run --bin chhotu-server --features server -- [--config <file>]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use chhotu::config::load_config;
use chhotu::gateway::{router, AppState};
use chhotu::OrchestratorBuilder;

#[derive(Parser, Debug)]
#[command(name = "chhotu-server")]
#[command(about = "Chhotu restaurant assistant (HTTP server)")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chhotu::observability::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config).context("Failed to load config")?;
    let addr = cfg.server.bind_addr();
    let cleanup_every = Duration::from_secs(cfg.session.cleanup_interval_secs.max(1));

    let orchestrator = OrchestratorBuilder::new(cfg)
        .build()
        .context("Failed to build orchestrator")?;
    let state = AppState::new(orchestrator);

    // 过期会话清理，随服务退出而终止
    let cleanup_state = Arc::clone(&state);
    let cleanup = tokio::spawn(async move {
        let mut tick = tokio::time::interval(cleanup_every);
        tick.tick().await;
        loop {
            tick.tick().await;
            let removed = cleanup_state.orchestrator.store().cleanup_expired().await;
            if removed > 0 {
                tracing::info!(removed, "expired sessions removed");
            }
        }
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Chhotu server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down...");
            }
        })
        .await?;

    cleanup.abort();
    Ok(())
}
