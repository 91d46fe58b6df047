//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Ollama / DeepSeek / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, DEEPSEEK_BASE_URL, OLLAMA_BASE_URL};
pub use traits::LlmClient;
