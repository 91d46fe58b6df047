//! HTTP 接入（axum）
//!
//! 单条消息的失败已由编排器降级为对话回复，所以 `/chat` 对合法请求总是 200。

use std::sync::Arc;

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde_json::{json, Value};

use super::message::{ChatRequest, ChatResponse};
use crate::core::Orchestrator;

/// 服务状态
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Arc<Self> {
        Arc::new(Self { orchestrator })
    }
}

/// 创建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/operations", get(operations))
        .with_state(state)
}

/// GET / - 服务信息
async fn index() -> Json<Value> {
    Json(json!({
        "service": "chhotu",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "chat": "POST /chat",
            "health": "GET /health",
            "operations": "GET /operations",
        }
    }))
}

/// GET /health - 存储可达性与注册操作数
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.orchestrator.store();
    let reachable = store.ping().await;
    Json(json!({
        "status": if reachable { "healthy" } else { "degraded" },
        "store": if reachable { "ok" } else { "unreachable" },
        "active_sessions": store.active_count().await,
        "registered_operations": state.orchestrator.registry().len(),
    }))
}

/// POST /chat - 处理一条消息
async fn chat(State(state): State<Arc<AppState>>, Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    Json(state.orchestrator.handle(request).await)
}

/// GET /operations - 已注册操作的参数 Schema
async fn operations(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.orchestrator.registry().to_schema_json())
}
