//! 网关层：会话存储、接地上下文、Oracle 适配与消息协议
//!
//! - **session_store**：按会话保存参数收集状态、对话历史与上下文缓存（滑动 TTL）
//! - **context**：为需要接地数据的操作拉取菜单分组
//! - **intent**：构建 Oracle 输入并把输出规范化为 AskUser / Execute
//! - **message**：入站请求与出站响应
//! - **http**：axum 路由（`server` feature）

pub mod context;
#[cfg(feature = "server")]
pub mod http;
pub mod intent;
pub mod message;
pub mod session_store;

pub use context::{BackendContextProvider, ContextProvider, GroundingContext, MenuGroupRef};
#[cfg(feature = "server")]
pub use http::{router, AppState};
pub use intent::{parse_outcome, IntentOracle, OracleOutcome, OracleRequest};
pub use message::{ChatRequest, ChatResponse, ResponseType};
pub use session_store::{MemorySessionStore, SessionStore, DEFAULT_SESSION_TTL_SECS};
