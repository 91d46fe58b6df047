//! 核心编排层：错误类型、会话状态模型、对话状态机与组件装配

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use builder::{create_llm_from_config, OrchestratorBuilder};
pub use error::ChatError;
pub use orchestrator::{is_cancellation, new_session_id, Orchestrator, CANCEL_PHRASES};
pub use state::{Arguments, ConversationSession, SessionStatus};
