//! Mock LLM 客户端（无需 API）
//!
//! - MockLlmClient：取最后一条 User 消息，回显为 ask_user JSON，便于本地跑通对话流程
//! - ScriptedLlmClient：按顺序返回预置回复并记录每次收到的消息，供测试驱动状态机

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(serde_json::json!({
            "type": "ask_user",
            "message": format!("Echo from Mock: {last_user}"),
            "missing_fields": [],
            "current_function": null,
            "partial_arguments": {},
        })
        .to_string())
    }
}

/// 脚本化客户端：每次 complete 弹出队首回复；队列空时返回传输错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条成功回复
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    /// 追加一条传输失败
    pub fn fail(self, cause: impl Into<String>) -> Self {
        self.push(Err(cause.into()));
        self
    }

    pub fn push(&self, reply: Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用收到的完整消息列表
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut received) = self.received.lock() {
            received.push(messages.to_vec());
        }
        self.replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply left".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let out = MockLlmClient
            .complete(&[Message::system("sys"), Message::user("hello")])
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["type"], "ask_user");
        assert_eq!(json["message"], "Echo from Mock: hello");
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order_then_errors() {
        let client = ScriptedLlmClient::new().reply("a").fail("down");
        assert_eq!(client.complete(&[]).await, Ok("a".to_string()));
        assert_eq!(client.complete(&[]).await, Err("down".to_string()));
        assert!(client.complete(&[]).await.is_err());
        assert_eq!(client.calls(), 3);
        assert_eq!(client.received().len(), 3);
    }
}
