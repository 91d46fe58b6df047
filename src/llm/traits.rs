//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Ollama / DeepSeek / Mock）实现 LlmClient：complete 返回完整文本。
//! 传输失败返回 Err（原因字符串），由上层映射为 OracleUnavailable。

use async_trait::async_trait;

use crate::memory::Message;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
