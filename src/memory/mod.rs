//! 记忆层：有界对话历史

pub mod conversation;

pub use conversation::{ConversationHistory, Message, Role, DEFAULT_HISTORY_LIMIT};
