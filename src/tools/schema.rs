//! Oracle 输出 JSON Schema 生成（schemars 自动生成）
//!
//! 用于将两种合法输出（ask_user / call_function）的 JSON 结构注入 system prompt，减少 LLM 输出格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 追问格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct AskUserFormat {
    /// 固定为 "ask_user"
    #[serde(rename = "type")]
    kind: String,
    /// 发给用户的追问
    message: String,
    /// 仍缺失的必填参数名
    missing_fields: Vec<String>,
    /// 正在收集参数的操作名；未确定时为 null
    current_function: Option<String>,
    /// 目前已确定的参数
    partial_arguments: HashMap<String, Value>,
}

/// 执行格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct CallFunctionFormat {
    /// 固定为 "call_function"
    #[serde(rename = "type")]
    kind: String,
    /// 操作名，必须是目录中的名字
    name: String,
    /// 完整参数
    arguments: HashMap<String, Value>,
}

/// 返回两种输出格式的 JSON Schema 字符串，可拼入 system prompt
pub fn oracle_output_schema_json() -> String {
    let schemas = serde_json::json!({
        "ask_user": schema_for!(AskUserFormat),
        "call_function": schema_for!(CallFunctionFormat),
    });
    serde_json::to_string_pretty(&schemas).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mentions_both_shapes() {
        let schema = oracle_output_schema_json();
        assert!(schema.contains("missing_fields"));
        assert!(schema.contains("partial_arguments"));
        assert!(schema.contains("arguments"));
        assert!(schema.contains("\"type\""));
    }
}
