//! 意图识别（Oracle 适配层）
//!
//! 把当前消息、会话状态、操作目录、接地上下文与历史拼成 LLM 输入，
//! 再把 LLM 的 JSON 输出解析为两种规范结果之一：继续追问（AskUser）或执行（Execute）。
//!
//! LLM 输出不可信：无法解析、缺少类型标记或结构不符时，一律降级为"请换个说法"的追问，
//! 并保留会话原有进度；只有传输失败或超时才作为 `OracleUnavailable` 返回给编排器。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use super::context::GroundingContext;
use crate::core::{Arguments, ChatError, ConversationSession};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::{oracle_output_schema_json, OperationRegistry};

pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 120;

pub const FALLBACK_PROMPT: &str = "I didn't understand that clearly. Could you rephrase?";

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Chhotu, an assistant that helps restaurant owners manage their restaurant by chatting.
Your job is to map each message onto exactly one of the AVAILABLE FUNCTIONS and to collect its required parameters, one conversation turn at a time.

Rules:
- Reply with a single JSON object and nothing else.
- If a required parameter is unknown, ask for it: {"type": "ask_user", "message": "...", "missing_fields": [...], "current_function": "<function name or null>", "partial_arguments": {...}}
- When every required parameter is known, execute: {"type": "call_function", "name": "<function name>", "arguments": {...}}
- Keep every argument already listed in CURRENT SESSION STATE unless the user changes it.
- If the user switches to a different task, set current_function to the new function and start collecting its parameters.
- Use RESTAURANT CONTEXT to resolve names (for example a group name) into IDs. Never invent IDs.
- Prices are plain numbers without currency symbols. Times are HH:MM (24h). Dates are YYYY-MM-DD.
- Never call a function that is not listed."#;

/// Oracle 的规范化输出
#[derive(Debug, Clone, PartialEq)]
pub enum OracleOutcome {
    /// 还需要用户补充信息
    AskUser {
        prompt: String,
        missing_fields: Vec<String>,
        active_operation: Option<String>,
        partial_arguments: Arguments,
    },
    /// 参数已齐，可以执行
    Execute {
        operation: String,
        arguments: Arguments,
    },
}

impl OracleOutcome {
    /// 保留当前会话进度的降级追问
    pub fn fallback(session: &ConversationSession) -> Self {
        OracleOutcome::AskUser {
            prompt: FALLBACK_PROMPT.to_string(),
            missing_fields: session.missing_arguments.clone(),
            active_operation: session.active_operation.clone(),
            partial_arguments: session.collected_arguments.clone(),
        }
    }
}

/// LLM 线上格式；`type` 为判别字段
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireOutcome {
    AskUser {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        missing_fields: Option<Vec<String>>,
        #[serde(default)]
        current_function: Option<String>,
        #[serde(default)]
        partial_arguments: Option<Arguments>,
    },
    #[serde(alias = "execute")]
    CallFunction {
        name: String,
        #[serde(default)]
        arguments: Option<Arguments>,
    },
}

/// 一次 Oracle 调用的输入快照
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub message: &'a str,
    pub session: &'a ConversationSession,
    pub history: &'a [Message],
    pub context: Option<&'a GroundingContext>,
}

pub struct IntentOracle {
    llm: Arc<dyn LlmClient>,
    registry: Arc<OperationRegistry>,
    system_prompt: String,
    timeout: Duration,
}

impl IntentOracle {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            llm,
            registry,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECS),
        }
    }

    /// 替换内置 system prompt（Schema 仍会追加在后面）
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 按固定顺序构建消息：system prompt、操作目录、会话状态、上下文、历史、当前消息
    pub fn build_messages(&self, request: &OracleRequest<'_>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(request.history.len() + 5);

        messages.push(Message::system(format!(
            "{}\n\nOUTPUT JSON SCHEMA:\n{}",
            self.system_prompt,
            oracle_output_schema_json()
        )));
        messages.push(Message::system(format!(
            "AVAILABLE FUNCTIONS:\n\n{}",
            self.registry.catalogue_text()
        )));
        messages.push(Message::system(session_state_text(request.session)));

        if let Some(ctx) = request.context {
            let pretty = serde_json::to_string_pretty(&ctx.to_json()).unwrap_or_default();
            messages.push(Message::system(format!("RESTAURANT CONTEXT:\n{pretty}")));
        }

        messages.extend(request.history.iter().cloned());
        messages.push(Message::user(request.message));
        messages
    }

    /// 调用 LLM 并解析结果；仅传输失败/超时返回错误
    pub async fn interpret(&self, request: &OracleRequest<'_>) -> Result<OracleOutcome, ChatError> {
        let messages = self.build_messages(request);
        tracing::debug!(messages = messages.len(), "calling oracle");

        let raw = match tokio::time::timeout(self.timeout, self.llm.complete(&messages)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(cause)) => return Err(ChatError::OracleUnavailable(cause)),
            Err(_) => {
                return Err(ChatError::OracleUnavailable(format!(
                    "timed out after {:?}",
                    self.timeout
                )))
            }
        };

        Ok(parse_outcome(&raw, request.session))
    }
}

fn session_state_text(session: &ConversationSession) -> String {
    let collected = serde_json::to_string_pretty(&session.collected_arguments)
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "CURRENT SESSION STATE:\nCurrent Function: {}\nCollected Arguments: {}\nMissing Fields: {:?}\nStatus: {}",
        session.active_operation.as_deref().unwrap_or("None"),
        collected,
        session.missing_arguments,
        if session.is_collecting() { "collecting" } else { "idle" },
    )
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// 从 LLM 输出中取出 JSON 对象：优先 Markdown 代码块，其次第一个 `{` 到最后一个 `}`
pub fn extract_json(raw: &str) -> Option<&str> {
    let body = fence_regex()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// 解析 LLM 输出为规范结果；任何不合法输出都降级为保留进度的追问
pub fn parse_outcome(raw: &str, session: &ConversationSession) -> OracleOutcome {
    match try_parse(raw) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, raw = %truncate(raw, 200), "oracle output rejected, asking user to rephrase");
            OracleOutcome::fallback(session)
        }
    }
}

fn try_parse(raw: &str) -> Result<OracleOutcome, ChatError> {
    let json = extract_json(raw)
        .ok_or_else(|| ChatError::Validation("no JSON object in oracle output".to_string()))?;
    let wire: WireOutcome =
        serde_json::from_str(json).map_err(|e| ChatError::Validation(e.to_string()))?;

    match wire {
        WireOutcome::AskUser {
            message,
            missing_fields,
            current_function,
            partial_arguments,
        } => {
            let prompt = message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .ok_or_else(|| ChatError::Validation("ask_user without message".to_string()))?;
            Ok(OracleOutcome::AskUser {
                prompt,
                missing_fields: missing_fields.unwrap_or_default(),
                active_operation: current_function
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("none")),
                partial_arguments: partial_arguments.unwrap_or_default(),
            })
        }
        WireOutcome::CallFunction { name, arguments } => {
            let operation = name.trim().to_string();
            if operation.is_empty() {
                return Err(ChatError::Validation("call_function without name".to_string()));
            }
            Ok(OracleOutcome::Execute {
                operation,
                arguments: arguments.unwrap_or_default(),
            })
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::memory::Role;
    use serde_json::json;

    fn collecting_session() -> ConversationSession {
        let mut s = ConversationSession::idle();
        let mut args = Arguments::new();
        args.insert("name".into(), json!("Soup"));
        s.collect(
            Some("create_menu_item".into()),
            args,
            vec!["price".into()],
            "What price?",
        );
        s
    }

    #[test]
    fn test_parse_ask_user() {
        let out = parse_outcome(
            r#"{"type":"ask_user","message":"What price?","missing_fields":["price"],"current_function":"create_menu_item","partial_arguments":{"name":"Soup"}}"#,
            &ConversationSession::idle(),
        );
        match out {
            OracleOutcome::AskUser {
                prompt,
                missing_fields,
                active_operation,
                partial_arguments,
            } => {
                assert_eq!(prompt, "What price?");
                assert_eq!(missing_fields, vec!["price"]);
                assert_eq!(active_operation.as_deref(), Some("create_menu_item"));
                assert_eq!(partial_arguments["name"], "Soup");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_call_function_and_execute_alias() {
        for tag in ["call_function", "execute"] {
            let raw = format!(r#"{{"type":"{tag}","name":"get_orders","arguments":{{"restaurant_id":1}}}}"#);
            let out = parse_outcome(&raw, &ConversationSession::idle());
            assert_eq!(
                out,
                OracleOutcome::Execute {
                    operation: "get_orders".into(),
                    arguments: json!({"restaurant_id": 1}).as_object().unwrap().clone(),
                }
            );
        }
    }

    #[test]
    fn test_parse_strips_code_fence_and_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"type\":\"call_function\",\"name\":\"get_labels\"}\n```\nAnything else?";
        let out = parse_outcome(raw, &ConversationSession::idle());
        assert!(matches!(out, OracleOutcome::Execute { ref operation, .. } if operation == "get_labels"));

        let raw = "Result: {\"type\":\"call_function\",\"name\":\"get_extras\",\"arguments\":null}";
        let out = parse_outcome(raw, &ConversationSession::idle());
        assert!(matches!(out, OracleOutcome::Execute { ref arguments, .. } if arguments.is_empty()));
    }

    #[test]
    fn test_malformed_output_falls_back_preserving_progress() {
        let session = collecting_session();
        for raw in [
            "not json at all",
            r#"{"message":"no type"}"#,
            r#"{"type":"dance"}"#,
            r#"{"type":"call_function","name":"  "}"#,
            r#"{"type":"ask_user","message":""}"#,
            r#"{"type":"ask_user","message":"x","missing_fields":"price"}"#,
        ] {
            let out = parse_outcome(raw, &session);
            assert_eq!(out, OracleOutcome::fallback(&session), "raw: {raw}");
        }
        match OracleOutcome::fallback(&session) {
            OracleOutcome::AskUser {
                prompt,
                active_operation,
                ..
            } => {
                assert_eq!(prompt, FALLBACK_PROMPT);
                assert_eq!(active_operation.as_deref(), Some("create_menu_item"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_ask_user_with_none_function_is_unset() {
        let out = parse_outcome(
            r#"{"type":"ask_user","message":"What would you like to do?","current_function":"None","partial_arguments":null}"#,
            &ConversationSession::idle(),
        );
        assert!(matches!(out, OracleOutcome::AskUser { active_operation: None, .. }));
    }

    fn oracle(llm: Arc<ScriptedLlmClient>) -> IntentOracle {
        IntentOracle::new(llm, Arc::new(OperationRegistry::new()))
    }

    #[test]
    fn test_build_messages_order() {
        let o = oracle(Arc::new(ScriptedLlmClient::new()));
        let session = collecting_session();
        let history = vec![Message::user("create soup"), Message::assistant("What price?")];
        let ctx = GroundingContext::new(1, vec![]);
        let msgs = o.build_messages(&OracleRequest {
            message: "8.99",
            session: &session,
            history: &history,
            context: Some(&ctx),
        });

        assert_eq!(msgs.len(), 7);
        assert!(msgs[0].content.contains("OUTPUT JSON SCHEMA"));
        assert!(msgs[1].content.starts_with("AVAILABLE FUNCTIONS"));
        assert!(msgs[2].content.starts_with("CURRENT SESSION STATE"));
        assert!(msgs[2].content.contains("create_menu_item"));
        assert!(msgs[3].content.starts_with("RESTAURANT CONTEXT"));
        assert_eq!(msgs[4].content, "create soup");
        assert_eq!(msgs[5].role, Role::Assistant);
        assert_eq!(msgs[6].role, Role::User);
        assert_eq!(msgs[6].content, "8.99");
    }

    #[test]
    fn test_build_messages_without_context() {
        let o = oracle(Arc::new(ScriptedLlmClient::new()));
        let session = ConversationSession::idle();
        let msgs = o.build_messages(&OracleRequest {
            message: "hi",
            session: &session,
            history: &[],
            context: None,
        });
        assert_eq!(msgs.len(), 4);
        assert!(msgs[2].content.contains("Current Function: None"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let o = oracle(Arc::new(ScriptedLlmClient::new().fail("connection refused")));
        let session = ConversationSession::idle();
        let err = o
            .interpret(&OracleRequest {
                message: "hi",
                session: &session,
                history: &[],
                context: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ChatError::OracleUnavailable("connection refused".into()));
    }

    struct SlowLlm;

    #[async_trait::async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _: &[Message]) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let o = IntentOracle::new(Arc::new(SlowLlm), Arc::new(OperationRegistry::new()))
            .with_timeout(Duration::from_millis(50));
        let session = ConversationSession::idle();
        let err = o
            .interpret(&OracleRequest {
                message: "hi",
                session: &session,
                history: &[],
                context: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::OracleUnavailable(_)));
    }
}
