//! 对话编排器：参数收集状态机
//!
//! 每条消息按固定顺序处理：
//! 取消检查 → 读取会话与历史 → 按需获取/复用接地上下文 → 调用 Oracle →
//! 处理 AskUser / Execute → 持久化并返回响应。
//!
//! 状态只有 Idle 与 Collecting 两种，二者在会话生命周期内交替出现。
//! 所有单条消息的失败都降级为对话回复，不会中断进程。

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::Instrument;

use crate::core::{Arguments, ChatError, ConversationSession};
use crate::gateway::{
    ChatRequest, ChatResponse, ContextProvider, GroundingContext, IntentOracle, OracleOutcome,
    OracleRequest, SessionStore,
};
use crate::memory::Message;
use crate::tools::{ExecutionDispatcher, ExecutionScope, OperationRegistry, OperationSpec, TENANT_ARGUMENT};

/// 取消词表（去首尾空白、忽略大小写后整句匹配）
pub const CANCEL_PHRASES: [&str; 6] = [
    "cancel",
    "reset",
    "clear",
    "start over",
    "nevermind",
    "forget it",
];

pub const RESET_REPLY: &str = "Conversation cleared. What would you like to do?";

pub const ORACLE_UNAVAILABLE_REPLY: &str =
    "Sorry, I'm having trouble understanding right now. Please try again in a moment.";

pub const DEFAULT_CONTEXT_TIMEOUT_SECS: u64 = 10;

/// 消息是否属于取消词表
pub fn is_cancellation(message: &str) -> bool {
    let normalized = message.trim().to_lowercase();
    CANCEL_PHRASES.contains(&normalized.as_str())
}

/// 生成新的会话 ID：`session-<uuid>`
pub fn new_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4())
}

/// 对话编排器；所有协作者由构造函数注入
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    oracle: IntentOracle,
    dispatcher: ExecutionDispatcher,
    context_provider: Arc<dyn ContextProvider>,
    context_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        oracle: IntentOracle,
        dispatcher: ExecutionDispatcher,
        context_provider: Arc<dyn ContextProvider>,
    ) -> Self {
        Self {
            store,
            oracle,
            dispatcher,
            context_provider,
            context_timeout: Duration::from_secs(DEFAULT_CONTEXT_TIMEOUT_SECS),
        }
    }

    pub fn with_context_timeout(mut self, timeout: Duration) -> Self {
        self.context_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        self.dispatcher.registry()
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// 处理一条入站消息
    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_session_id);
        let scope = ExecutionScope {
            tenant_id: request.restaurant_id,
            owner_id: request.owner_id,
            access_token: request.access_token,
        };
        let span = tracing::info_span!("chat", session_id = %session_id, tenant_id = scope.tenant_id);
        self.process(session_id, scope, request.message)
            .instrument(span)
            .await
    }

    async fn process(&self, session_id: String, scope: ExecutionScope, message: String) -> ChatResponse {
        if is_cancellation(&message) {
            self.store.clear(&session_id).await;
            tracing::info!("conversation reset by user");
            return ChatResponse::reset(&session_id, RESET_REPLY);
        }

        let mut session = self.store.get(&session_id).await;
        let history = self.store.history(&session_id).await;
        let context = self.load_context(&session_id, &session, &scope).await;

        let outcome = self
            .oracle
            .interpret(&OracleRequest {
                message: &message,
                session: &session,
                history: history.messages(),
                context: context.as_ref(),
            })
            .await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "oracle call failed, session left untouched");
                return ChatResponse::error(&session_id, ORACLE_UNAVAILABLE_REPLY);
            }
        };

        self.store
            .append_history(&session_id, Message::user(message.as_str()))
            .await;

        let response = match outcome {
            OracleOutcome::AskUser {
                prompt,
                missing_fields,
                active_operation,
                partial_arguments,
            } => {
                self.on_ask_user(
                    &session_id,
                    &mut session,
                    &scope,
                    prompt,
                    missing_fields,
                    active_operation,
                    partial_arguments,
                )
                .await
            }
            OracleOutcome::Execute {
                operation,
                arguments,
            } => {
                self.on_execute(&session_id, &mut session, &scope, operation, arguments)
                    .await
            }
        };

        debug_assert!(session.is_consistent());
        self.store.put(&session_id, &session).await;
        tracing::debug!(status = ?session.status, operation = ?session.active_operation, "session persisted");
        response
    }

    /// 仅当已存储的当前操作需要接地数据时才获取；否则只复用已有缓存
    async fn load_context(
        &self,
        session_id: &str,
        session: &ConversationSession,
        scope: &ExecutionScope,
    ) -> Option<GroundingContext> {
        let cached = self
            .store
            .get_context(session_id)
            .await
            .filter(|ctx| ctx.restaurant_id == scope.tenant_id);

        let needs_grounding = session
            .active_operation
            .as_deref()
            .is_some_and(|op| self.registry().needs_grounding(op));
        if !needs_grounding || cached.is_some() {
            return cached;
        }

        match tokio::time::timeout(self.context_timeout, self.context_provider.fetch_context(scope)).await {
            Ok(Ok(ctx)) => {
                tracing::debug!(groups = ctx.groups.len(), "grounding context fetched");
                self.store.set_context(session_id, ctx.clone()).await;
                Some(ctx)
            }
            Ok(Err(cause)) => {
                tracing::warn!(%cause, "context fetch failed, continuing without context");
                None
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.context_timeout, "context fetch timed out, continuing without context");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn on_ask_user(
        &self,
        session_id: &str,
        session: &mut ConversationSession,
        scope: &ExecutionScope,
        prompt: String,
        missing_fields: Vec<String>,
        active_operation: Option<String>,
        mut partial_arguments: Arguments,
    ) -> ChatResponse {
        partial_arguments.retain(|_, v| !v.is_null());
        let missing = match active_operation.as_deref() {
            Some(op) => match self.registry().spec(op) {
                Some(spec) => {
                    inject_tenant(spec, &mut partial_arguments, scope);
                    sanitize_missing(spec, &partial_arguments, missing_fields)
                }
                None => {
                    return self
                        .unknown_operation(session_id, session, ChatError::UnknownOperation(op.to_string()))
                        .await
                }
            },
            None => Vec::new(),
        };

        self.note_switch(session_id, session, active_operation.as_deref())
            .await;
        session.collect(active_operation, partial_arguments, missing.clone(), prompt.as_str());
        self.store
            .append_history(session_id, Message::assistant(prompt.as_str()))
            .await;

        ChatResponse::ask_user(session_id, prompt, missing)
    }

    async fn on_execute(
        &self,
        session_id: &str,
        session: &mut ConversationSession,
        scope: &ExecutionScope,
        operation: String,
        arguments: Arguments,
    ) -> ChatResponse {
        let Some(spec) = self.registry().spec(&operation) else {
            return self
                .unknown_operation(session_id, session, ChatError::UnknownOperation(operation))
                .await;
        };

        let mut merged = if session.active_operation.as_deref() == Some(operation.as_str()) {
            session.collected_arguments.clone()
        } else {
            Arguments::new()
        };
        merged.extend(arguments.into_iter().filter(|(_, v)| !v.is_null()));
        merged.insert(TENANT_ARGUMENT.to_string(), json!(scope.tenant_id));

        let still_missing = spec.missing_from(&merged);
        if !still_missing.is_empty() {
            let prompt = format!(
                "I still need the following to continue: {}.",
                still_missing.join(", ")
            );
            tracing::info!(operation = %operation, missing = ?still_missing, "execute proposed with incomplete arguments");
            self.note_switch(session_id, session, Some(operation.as_str()))
                .await;
            session.collect(Some(operation), merged, still_missing.clone(), prompt.as_str());
            self.store
                .append_history(session_id, Message::assistant(prompt.as_str()))
                .await;
            return ChatResponse::ask_user(session_id, prompt, still_missing);
        }

        match self.dispatcher.execute(&operation, &merged, scope).await {
            Ok(result) => {
                tracing::info!(operation = %operation, "operation completed");
                session.reset();
                self.store.invalidate_context(session_id).await;
                self.store
                    .append_history(session_id, Message::assistant(result.as_str()))
                    .await;
                ChatResponse::result(session_id, result, &operation)
            }
            Err(err @ ChatError::UnknownOperation(_)) => {
                self.unknown_operation(session_id, session, err).await
            }
            Err(err) => {
                tracing::warn!(operation = %operation, error = %err, "operation failed");
                let reply = err.to_string();
                session.reset();
                self.store.invalidate_context(session_id).await;
                self.store
                    .append_history(session_id, Message::assistant(reply.as_str()))
                    .await;
                ChatResponse::error(session_id, reply)
            }
        }
    }

    /// Oracle 提到未注册的操作：已收集的状态失去意义，回到 Idle
    async fn unknown_operation(
        &self,
        session_id: &str,
        session: &mut ConversationSession,
        err: ChatError,
    ) -> ChatResponse {
        tracing::warn!(error = %err, "oracle named an unregistered operation");
        let reply = match &err {
            ChatError::UnknownOperation(op) => {
                format!("Sorry, I can't do \"{op}\". Please tell me what you'd like to do.")
            }
            other => other.to_string(),
        };
        session.reset();
        self.store.invalidate_context(session_id).await;
        self.store
            .append_history(session_id, Message::assistant(reply.as_str()))
            .await;
        ChatResponse::error(session_id, reply)
    }

    /// 当前操作被替换为另一个时丢弃缓存的上下文
    async fn note_switch(&self, session_id: &str, session: &ConversationSession, next: Option<&str>) {
        if let Some(previous) = session.active_operation.as_deref() {
            if Some(previous) != next {
                tracing::info!(from = previous, to = ?next, "context switch");
                self.store.invalidate_context(session_id).await;
            }
        }
    }
}

/// 会话已知的租户 ID 覆盖 Oracle 给出的值
fn inject_tenant(spec: &OperationSpec, arguments: &mut Arguments, scope: &ExecutionScope) {
    if spec.has_param(TENANT_ARGUMENT) {
        arguments.insert(TENANT_ARGUMENT.to_string(), Value::from(scope.tenant_id));
    }
}

/// 缺失参数 = 必填参数 − 已收集；Oracle 报告的顺序优先，未报告时用计算结果
fn sanitize_missing(spec: &OperationSpec, collected: &Arguments, reported: Vec<String>) -> Vec<String> {
    let required_missing = spec.missing_from(collected);
    let mut missing: Vec<String> = Vec::with_capacity(required_missing.len());
    for name in reported {
        if required_missing.contains(&name) && !missing.contains(&name) {
            missing.push(name);
        }
    }
    if missing.is_empty() {
        required_missing
    } else {
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSpec, ParamType};

    fn spec() -> OperationSpec {
        OperationSpec::new("create_menu_item", "Create a menu item")
            .param(ParamSpec::required("restaurant_id", ParamType::Integer, "Restaurant"))
            .param(ParamSpec::required("name", ParamType::String, "Name"))
            .param(ParamSpec::required("price", ParamType::Number, "Price"))
            .param(ParamSpec::optional("description", ParamType::String, "Description"))
    }

    #[test]
    fn test_cancellation_vocabulary() {
        for phrase in ["cancel", "  RESET ", "Clear", "start over", "Nevermind", "forget it\n"] {
            assert!(is_cancellation(phrase), "{phrase}");
        }
        for phrase in ["cancel order 5", "please reset the price", "", "forget"] {
            assert!(!is_cancellation(phrase), "{phrase}");
        }
    }

    #[test]
    fn test_new_session_id_format() {
        let id = new_session_id();
        assert!(id.starts_with("session-"));
        assert!(uuid::Uuid::parse_str(&id["session-".len()..]).is_ok());
    }

    #[test]
    fn test_sanitize_missing_drops_unknown_and_collected() {
        let mut collected = Arguments::new();
        collected.insert("restaurant_id".into(), json!(1));
        collected.insert("name".into(), json!("Soup"));

        let missing = sanitize_missing(
            &spec(),
            &collected,
            vec!["name".into(), "price".into(), "price".into(), "description".into()],
        );
        assert_eq!(missing, vec!["price"]);
    }

    #[test]
    fn test_sanitize_missing_computes_when_unreported() {
        let missing = sanitize_missing(&spec(), &Arguments::new(), vec![]);
        assert_eq!(missing, vec!["restaurant_id", "name", "price"]);
    }

    #[test]
    fn test_inject_tenant_overrides_proposal() {
        let mut args = Arguments::new();
        args.insert("restaurant_id".into(), json!(999));
        let scope = ExecutionScope {
            tenant_id: 7,
            owner_id: 1,
            access_token: None,
        };
        inject_tenant(&spec(), &mut args, &scope);
        assert_eq!(args["restaurant_id"], 7);
    }
}
