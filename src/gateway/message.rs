//! 网关消息协议定义
//!
//! 入站一种请求、出站一种响应；REPL 与 HTTP 共用。

use serde::{Deserialize, Serialize};

/// 入站聊天请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// 会话 ID；缺省时由服务端生成 `session-<uuid>`
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    /// 餐厅（租户）ID
    #[serde(alias = "tenantId", alias = "restaurantId")]
    pub restaurant_id: i64,
    #[serde(alias = "ownerId")]
    pub owner_id: i64,
    pub message: String,
    /// 可选的后端访问令牌，仅作用于本次请求
    #[serde(default, alias = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl ChatRequest {
    pub fn new(restaurant_id: i64, owner_id: i64, message: impl Into<String>) -> Self {
        Self {
            session_id: None,
            restaurant_id,
            owner_id,
            message: message.into(),
            access_token: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// 响应类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Reset,
    AskUser,
    Result,
    Error,
}

/// 显示名与序列化名同源（serde snake_case）
impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => f.write_str(&name),
            _ => Err(std::fmt::Error),
        }
    }
}

/// 出站聊天响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    pub reply: String,
    pub session_id: String,
    /// 已执行的操作名（仅 result）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// 仍缺的参数（仅 ask_user）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
}

impl ChatResponse {
    pub fn reset(session_id: &str, reply: impl Into<String>) -> Self {
        Self::plain(ResponseType::Reset, session_id, reply)
    }

    pub fn ask_user(session_id: &str, reply: impl Into<String>, missing: Vec<String>) -> Self {
        Self {
            missing_fields: Some(missing),
            ..Self::plain(ResponseType::AskUser, session_id, reply)
        }
    }

    pub fn result(session_id: &str, reply: impl Into<String>, operation: &str) -> Self {
        Self {
            operation: Some(operation.to_string()),
            ..Self::plain(ResponseType::Result, session_id, reply)
        }
    }

    pub fn error(session_id: &str, reply: impl Into<String>) -> Self {
        Self::plain(ResponseType::Error, session_id, reply)
    }

    fn plain(kind: ResponseType, session_id: &str, reply: impl Into<String>) -> Self {
        Self {
            kind,
            reply: reply.into(),
            session_id: session_id.to_string(),
            operation: None,
            missing_fields: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_accepts_camel_case_aliases() {
        let req: ChatRequest = serde_json::from_value(json!({
            "sessionId": "abc",
            "tenantId": 3,
            "ownerId": 4,
            "message": "hi"
        }))
        .unwrap();
        assert_eq!(req.session_id.as_deref(), Some("abc"));
        assert_eq!(req.restaurant_id, 3);
        assert_eq!(req.owner_id, 4);
        assert!(req.access_token.is_none());
    }

    #[test]
    fn test_request_snake_case_without_session() {
        let req: ChatRequest = serde_json::from_value(json!({
            "restaurant_id": 1,
            "owner_id": 2,
            "message": "hello",
            "access_token": "tok"
        }))
        .unwrap();
        assert!(req.session_id.is_none());
        assert_eq!(req.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_display_matches_wire_name() {
        for kind in [
            ResponseType::Reset,
            ResponseType::AskUser,
            ResponseType::Result,
            ResponseType::Error,
        ] {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire.as_str(), Some(kind.to_string().as_str()));
        }
        assert_eq!(ResponseType::AskUser.to_string(), "ask_user");
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let v = serde_json::to_value(ChatResponse::reset("s", "cleared")).unwrap();
        assert_eq!(v, json!({ "type": "reset", "reply": "cleared", "session_id": "s" }));

        let v = serde_json::to_value(ChatResponse::ask_user("s", "price?", vec!["price".into()])).unwrap();
        assert_eq!(v["type"], "ask_user");
        assert_eq!(v["missing_fields"], json!(["price"]));

        let v = serde_json::to_value(ChatResponse::result("s", "done", "create_menu_item")).unwrap();
        assert_eq!(v["operation"], "create_menu_item");
    }
}
