//! 短期记忆：对话历史
//!
//! 保留最近 N 条消息（user / assistant），超出时丢弃最旧的，限制 Oracle 输入长度。

use serde::{Deserialize, Serialize};

/// 默认保留的历史条数，同时也是上限：Oracle 输入最多携带 20 条历史
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 有界对话历史：插入顺序有意义，超过 limit 时从最旧的开始淘汰
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    limit: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit: limit.clamp(1, DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.prune();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn prune(&mut self) {
        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            self.messages.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
