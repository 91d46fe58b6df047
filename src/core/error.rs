//! 对话错误类型
//!
//! 每条消息的失败都降级为对话回复（见 Orchestrator）；只有 DuplicateOperation 在启动注册阶段是致命的。

use thiserror::Error;

/// 对话处理过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// 输入或 Oracle 输出格式不合法（本地回退处理，不直接暴露给用户）
    #[error("Validation error: {0}")]
    Validation(String),

    /// Oracle 传输失败或超时
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Oracle 给出的操作名不在注册表中
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// 执行层拒绝或失败
    #[error("Error executing {operation}: {cause}")]
    Execution { operation: String, cause: String },

    /// 启动注册时发现重名操作
    #[error("Duplicate operation: {0}")]
    DuplicateOperation(String),

    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display_carries_cause() {
        let err = ChatError::Execution {
            operation: "create_menu_item".to_string(),
            cause: "group not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error executing create_menu_item: group not found"
        );
    }
}
