//! 执行分发器
//!
//! 持有 OperationRegistry 与统一超时，execute(name, args, scope) 在超时内调用操作，
//! 失败或超时转为 ChatError（UnknownOperation / Execution）；每次调用输出结构化审计日志（JSON）。
//! 不做参数完整性校验（由 Orchestrator 负责），也不重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{Arguments, ChatError};
use crate::tools::{ExecutionScope, OperationRegistry};

pub struct ExecutionDispatcher {
    registry: Arc<OperationRegistry>,
    timeout: Duration,
}

impl ExecutionDispatcher {
    pub fn new(registry: Arc<OperationRegistry>, timeout_secs: u64) -> Self {
        Self::with_timeout(registry, Duration::from_secs(timeout_secs))
    }

    pub fn with_timeout(registry: Arc<OperationRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// 执行指定操作，返回面向用户的结果文本
    pub async fn execute(
        &self,
        name: &str,
        args: &Arguments,
        scope: &ExecutionScope,
    ) -> Result<String, ChatError> {
        let start = Instant::now();
        let operation = match self.registry.lookup(name) {
            Ok(op) => op,
            Err(e) => {
                audit(name, "unknown", start, args);
                return Err(e);
            }
        };

        let result = timeout(self.timeout, operation.execute(args, scope)).await;
        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        audit(name, outcome, start, args);

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(cause)) => Err(ChatError::Execution {
                operation: name.to_string(),
                cause,
            }),
            Err(_) => Err(ChatError::Execution {
                operation: name.to_string(),
                cause: format!("timed out after {:?}", self.timeout),
            }),
        }
    }
}

fn audit(operation: &str, outcome: &str, start: Instant, args: &Arguments) {
    let audit = serde_json::json!({
        "event": "operation_audit",
        "operation": operation,
        "ok": outcome == "ok",
        "outcome": outcome,
        "duration_ms": start.elapsed().as_millis() as u64,
        "args_preview": args_preview(args),
    });
    tracing::info!(audit = %audit, "operation");
}

fn args_preview(args: &Arguments) -> String {
    let s = serde_json::Value::Object(args.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Operation, OperationSpec};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo(OperationSpec);

    #[async_trait]
    impl Operation for Echo {
        fn spec(&self) -> &OperationSpec {
            &self.0
        }

        async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
            match args.get("fail") {
                Some(v) => Err(v.as_str().unwrap_or("failed").to_string()),
                None => Ok(format!("tenant {}", scope.tenant_id)),
            }
        }
    }

    struct Slow(OperationSpec);

    #[async_trait]
    impl Operation for Slow {
        fn spec(&self) -> &OperationSpec {
            &self.0
        }

        async fn execute(&self, _args: &Arguments, _scope: &ExecutionScope) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn dispatcher(timeout_ms: u64) -> ExecutionDispatcher {
        let mut registry = OperationRegistry::new();
        registry.register(Echo(OperationSpec::new("echo", "echo"))).unwrap();
        registry.register(Slow(OperationSpec::new("slow", "slow"))).unwrap();
        ExecutionDispatcher::with_timeout(Arc::new(registry), Duration::from_millis(timeout_ms))
    }

    fn scope() -> ExecutionScope {
        ExecutionScope {
            tenant_id: 42,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_execute_success() {
        let out = dispatcher(5_000)
            .execute("echo", &Arguments::new(), &scope())
            .await
            .unwrap();
        assert_eq!(out, "tenant 42");
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let err = dispatcher(5_000)
            .execute("missing", &Arguments::new(), &scope())
            .await
            .unwrap_err();
        assert_eq!(err, ChatError::UnknownOperation("missing".into()));
    }

    #[tokio::test]
    async fn test_executor_failure_surfaces_cause() {
        let mut args = Arguments::new();
        args.insert("fail".into(), json!("backend said no"));
        let err = dispatcher(5_000).execute("echo", &args, &scope()).await.unwrap_err();
        assert_eq!(
            err,
            ChatError::Execution {
                operation: "echo".into(),
                cause: "backend said no".into()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_maps_to_execution_error() {
        let err = dispatcher(50)
            .execute("slow", &Arguments::new(), &scope())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Execution { cause, .. } if cause.contains("timed out")));
    }
}
