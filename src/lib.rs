//! Chhotu - 餐厅管理对话前端
//!
//! 把餐厅老板的自然语言请求转换为经过校验的后端管理操作调用（菜单、分组、营业时间、订单、报表）。
//! 核心是多轮参数收集状态机：跨多条消息判断要执行哪个操作、哪些参数已知、哪些仍缺、何时执行。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话状态、对话编排器与组件装配
//! - **gateway**: 会话存储、接地上下文、Oracle 适配、消息协议与 HTTP 接入
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Ollama / DeepSeek / Mock）
//! - **memory**: 有界对话历史
//! - **tools**: 操作注册表、执行分发器、后端客户端与全部餐厅操作

pub mod config;
pub mod core;
pub mod gateway;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

pub use crate::core::{ChatError, Orchestrator, OrchestratorBuilder};
pub use crate::gateway::{ChatRequest, ChatResponse, ResponseType};
