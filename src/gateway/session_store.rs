//! 会话存储抽象层
//!
//! 每个会话在逻辑上由三条独立过期的记录组成：参数收集状态、对话历史、接地上下文缓存。
//! 任何一条缺失或过期都按默认值返回（"读时创建"），从不报错。
//! 写入时刷新该记录的过期时间（滑动 TTL）；`clear` 在同一把写锁内移除三条记录。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::context::GroundingContext;
use crate::core::ConversationSession;
use crate::memory::{ConversationHistory, Message, DEFAULT_HISTORY_LIMIT};

/// 默认会话过期时间（秒）
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取会话状态；不存在或已过期时返回全新的 Idle 会话
    async fn get(&self, session_id: &str) -> ConversationSession;

    /// 写入会话状态并刷新过期时间
    async fn put(&self, session_id: &str, session: &ConversationSession);

    /// 读取对话历史；不存在时为空
    async fn history(&self, session_id: &str) -> ConversationHistory;

    /// 追加一条历史，超过上限时淘汰最旧的
    async fn append_history(&self, session_id: &str, message: Message);

    /// 读取缓存的接地上下文
    async fn get_context(&self, session_id: &str) -> Option<GroundingContext>;

    async fn set_context(&self, session_id: &str, context: GroundingContext);

    async fn invalidate_context(&self, session_id: &str);

    /// 移除状态、历史与上下文
    async fn clear(&self, session_id: &str);

    /// 清理过期会话，返回移除数量
    async fn cleanup_expired(&self) -> usize;

    /// 获取活跃会话数
    async fn active_count(&self) -> usize;

    /// 存储是否可用（健康检查）
    async fn ping(&self) -> bool {
        true
    }
}

/// 带过期时间的记录
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct SessionRecords {
    state: Option<Expiring<ConversationSession>>,
    history: Option<Expiring<ConversationHistory>>,
    context: Option<Expiring<GroundingContext>>,
}

impl SessionRecords {
    fn is_live(&self, now: Instant) -> bool {
        self.state.as_ref().is_some_and(|r| r.is_live(now))
            || self.history.as_ref().is_some_and(|r| r.is_live(now))
            || self.context.as_ref().is_some_and(|r| r.is_live(now))
    }
}

fn live<T: Clone>(record: &Option<Expiring<T>>) -> Option<T> {
    let now = Instant::now();
    record
        .as_ref()
        .filter(|r| r.is_live(now))
        .map(|r| r.value.clone())
}

/// 内存会话存储
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecords>>,
    ttl: Duration,
    history_limit: usize,
}

impl MemorySessionStore {
    pub fn new(history_limit: usize, ttl_secs: u64) -> Self {
        Self::with_ttl(history_limit, Duration::from_secs(ttl_secs))
    }

    /// history_limit 超过 20 时按 20 处理
    pub fn with_ttl(history_limit: usize, ttl: Duration) -> Self {
        if history_limit > DEFAULT_HISTORY_LIMIT {
            tracing::warn!(
                requested = history_limit,
                max = DEFAULT_HISTORY_LIMIT,
                "history limit clamped"
            );
        }
        let history_limit = history_limit.clamp(1, DEFAULT_HISTORY_LIMIT);
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            history_limit,
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, DEFAULT_SESSION_TTL_SECS)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> ConversationSession {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .and_then(|r| live(&r.state))
            .unwrap_or_else(ConversationSession::idle)
    }

    async fn put(&self, session_id: &str, session: &ConversationSession) {
        let mut sessions = self.sessions.write().await;
        let records = sessions.entry(session_id.to_string()).or_default();
        records.state = Some(Expiring::new(session.clone(), self.ttl));
    }

    async fn history(&self, session_id: &str) -> ConversationHistory {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .and_then(|r| live(&r.history))
            .unwrap_or_else(|| ConversationHistory::new(self.history_limit))
    }

    async fn append_history(&self, session_id: &str, message: Message) {
        let mut sessions = self.sessions.write().await;
        let records = sessions.entry(session_id.to_string()).or_default();
        let mut history =
            live(&records.history).unwrap_or_else(|| ConversationHistory::new(self.history_limit));
        history.push(message);
        records.history = Some(Expiring::new(history, self.ttl));
    }

    async fn get_context(&self, session_id: &str) -> Option<GroundingContext> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).and_then(|r| live(&r.context))
    }

    async fn set_context(&self, session_id: &str, context: GroundingContext) {
        let mut sessions = self.sessions.write().await;
        let records = sessions.entry(session_id.to_string()).or_default();
        records.context = Some(Expiring::new(context, self.ttl));
    }

    async fn invalidate_context(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(records) = sessions.get_mut(session_id) {
            records.context = None;
        }
    }

    async fn clear(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, records| records.is_live(now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "expired sessions cleaned up");
        }
        removed
    }

    async fn active_count(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|r| r.is_live(now))
            .count()
    }
}
