//! 会话状态模型
//!
//! 每个 session id 一条 ConversationSession：当前操作、已收集参数、缺失参数、状态。
//! 不变式：`status == Collecting` 当且仅当 `active_operation` 已设置；所有修改都经过本模块的方法以保持该不变式。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 参数集合（参数名 -> JSON 值）
pub type Arguments = Map<String, Value>;

/// 会话状态：空闲 / 正在收集某个操作的参数
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Collecting,
}

/// 单个会话的参数收集状态
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub active_operation: Option<String>,
    pub collected_arguments: Arguments,
    /// 仍需向用户索要的参数名（有序）
    pub missing_arguments: Vec<String>,
    pub status: SessionStatus,
    /// 最近一次向用户发出的追问
    pub last_prompt: Option<String>,
}

impl ConversationSession {
    /// 全新的空闲会话
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_collecting(&self) -> bool {
        self.status == SessionStatus::Collecting
    }

    /// 用 Oracle 给出的部分状态覆盖当前会话；没有操作名时回到 Idle
    pub fn collect(
        &mut self,
        operation: Option<String>,
        collected: Arguments,
        missing: Vec<String>,
        prompt: impl Into<String>,
    ) {
        match operation {
            Some(op) => {
                self.active_operation = Some(op);
                self.collected_arguments = collected;
                self.missing_arguments = missing;
                self.status = SessionStatus::Collecting;
            }
            None => {
                self.active_operation = None;
                self.collected_arguments = Arguments::new();
                self.missing_arguments = Vec::new();
                self.status = SessionStatus::Idle;
            }
        }
        self.last_prompt = Some(prompt.into());
    }

    /// 回到 Idle 并清空参数
    pub fn reset(&mut self) {
        *self = Self::idle();
    }

    /// 不变式检查（测试与调试日志使用）
    pub fn is_consistent(&self) -> bool {
        let collecting = self.status == SessionStatus::Collecting;
        if collecting != self.active_operation.is_some() {
            return false;
        }
        self.missing_arguments
            .iter()
            .all(|name| !self.collected_arguments.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_session_is_idle_and_consistent() {
        let session = ConversationSession::idle();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.active_operation.is_none());
        assert!(session.is_consistent());
    }

    #[test]
    fn test_collect_with_operation_enters_collecting() {
        let mut session = ConversationSession::idle();
        let mut args = Arguments::new();
        args.insert("name".into(), json!("Soup"));
        session.collect(
            Some("create_menu_item".into()),
            args,
            vec!["price".into()],
            "What price?",
        );
        assert!(session.is_collecting());
        assert_eq!(session.last_prompt.as_deref(), Some("What price?"));
        assert!(session.is_consistent());
    }

    #[test]
    fn test_collect_without_operation_stays_idle() {
        let mut session = ConversationSession::idle();
        session.collect(None, Arguments::new(), vec!["price".into()], "Rephrase?");
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.missing_arguments.is_empty());
        assert!(session.is_consistent());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = ConversationSession::idle();
        session.collect(Some("get_orders".into()), Arguments::new(), vec![], "ok");
        session.reset();
        assert_eq!(session, ConversationSession::idle());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(ConversationSession::idle()).unwrap();
        assert_eq!(json["status"], "idle");
    }
}
