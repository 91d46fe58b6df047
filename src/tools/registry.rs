//! 操作注册表
//!
//! 所有后端操作实现 Operation trait（spec / execute），启动时按固定顺序注册进 OperationRegistry。
//! 注册完成后只读，可在多个请求间无锁共享（`Arc<OperationRegistry>`）。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::{Arguments, ChatError};

/// 参数类型（与 JSON Schema 的 type 对应）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
}

/// 单个参数的描述
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
    /// 枚举约束（为空表示不限）
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
            allowed: Vec::new(),
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind,
            "description": self.description,
        });
        if !self.allowed.is_empty() {
            schema["enum"] = Value::Array(self.allowed.clone());
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

/// 操作描述：名称、说明、有序参数表；注册后不可变
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// 是否需要 grounding 上下文（如菜单分组列表）来解释参数
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub needs_grounding: bool,
}

impl OperationSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
            needs_grounding: false,
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn grounded(mut self) -> Self {
        self.needs_grounding = true;
        self
    }

    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// 在 `args` 中缺失（或为 null）的必填参数，按声明顺序
    pub fn missing_from(&self, args: &Arguments) -> Vec<String> {
        self.required_names()
            .filter(|name| args.get(*name).map_or(true, Value::is_null))
            .map(String::from)
            .collect()
    }

    /// 参数的 JSON Schema（object / properties / required）
    pub fn parameters_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self.required_names().collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// 一次执行的环境：当前会话所属的餐厅 / 店主，以及透传给后端的访问令牌
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionScope {
    pub tenant_id: i64,
    pub owner_id: i64,
    pub access_token: Option<String>,
}

/// 操作 trait：描述 + 异步执行（失败时返回原始原因字符串）
#[async_trait]
pub trait Operation: Send + Sync {
    fn spec(&self) -> &OperationSpec;

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String>;
}

/// 操作注册表：保持注册顺序，按名查找，拒绝重名
#[derive(Default)]
pub struct OperationRegistry {
    operations: Vec<Arc<dyn Operation>>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册操作；重名返回 DuplicateOperation（启动阶段应视为致命错误）
    pub fn register(&mut self, operation: impl Operation + 'static) -> Result<(), ChatError> {
        let name = operation.spec().name.clone();
        if self.index.contains_key(&name) {
            return Err(ChatError::DuplicateOperation(name));
        }
        self.index.insert(name, self.operations.len());
        self.operations.push(Arc::new(operation));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Operation>, ChatError> {
        self.index
            .get(name)
            .map(|&i| self.operations[i].clone())
            .ok_or_else(|| ChatError::UnknownOperation(name.to_string()))
    }

    pub fn spec(&self, name: &str) -> Option<&OperationSpec> {
        self.index.get(name).map(|&i| self.operations[i].spec())
    }

    /// 按注册顺序返回所有操作描述
    pub fn list_specs(&self) -> Vec<&OperationSpec> {
        self.operations.iter().map(|op| op.spec()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| op.spec().name.clone())
            .collect()
    }

    pub fn needs_grounding(&self, name: &str) -> bool {
        self.spec(name).is_some_and(|s| s.needs_grounding)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Oracle prompt 中的操作目录（每个操作：名称、说明、参数 schema），以 `---` 分隔
    pub fn catalogue_text(&self) -> String {
        self.operations
            .iter()
            .map(|op| {
                let spec = op.spec();
                let params = serde_json::to_string_pretty(&spec.parameters_schema())
                    .unwrap_or_else(|_| "{}".to_string());
                format!(
                    "Function: {}\nDescription: {}\nParameters: {}\n",
                    spec.name, spec.description, params
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    /// 供 /operations 端点输出的 JSON
    pub fn to_schema_json(&self) -> Value {
        let operations: Vec<Value> = self
            .operations
            .iter()
            .map(|op| {
                let spec = op.spec();
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.parameters_schema(),
                    "needs_grounding": spec.needs_grounding,
                })
            })
            .collect();
        json!({ "count": operations.len(), "operations": operations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(OperationSpec);

    #[async_trait]
    impl Operation for Noop {
        fn spec(&self) -> &OperationSpec {
            &self.0
        }

        async fn execute(&self, _args: &Arguments, _scope: &ExecutionScope) -> Result<String, String> {
            Ok("noop".to_string())
        }
    }

    fn noop(name: &str) -> Noop {
        Noop(
            OperationSpec::new(name, "test op")
                .param(ParamSpec::required("restaurant_id", ParamType::Integer, "Restaurant ID"))
                .param(ParamSpec::required("name", ParamType::String, "Name"))
                .param(ParamSpec::optional("desc", ParamType::String, "Description")),
        )
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = OperationRegistry::new();
        registry.register(noop("create_label")).unwrap();
        let err = registry.register(noop("create_label")).unwrap_err();
        assert_eq!(err, ChatError::DuplicateOperation("create_label".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_specs_keeps_registration_order() {
        let mut registry = OperationRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(noop(name)).unwrap();
        }
        let names: Vec<&str> = registry
            .list_specs()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_lookup_unknown_is_error() {
        let registry = OperationRegistry::new();
        assert!(matches!(
            registry.lookup("nope"),
            Err(ChatError::UnknownOperation(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_missing_from_ignores_optional_and_null_counts_as_missing() {
        let spec = noop("x").0;
        let mut args = Arguments::new();
        args.insert("restaurant_id".into(), json!(7));
        args.insert("name".into(), Value::Null);
        assert_eq!(spec.missing_from(&args), vec!["name".to_string()]);
    }

    #[test]
    fn test_parameters_schema_shape() {
        let spec = OperationSpec::new("create_menu_group", "Create group")
            .param(ParamSpec::required("name", ParamType::String, "Group name"))
            .param(ParamSpec::optional("icon", ParamType::Integer, "Icon").with_default(json!(1)));
        let schema = spec.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["icon"]["default"], 1);
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn test_catalogue_text_lists_every_operation() {
        let mut registry = OperationRegistry::new();
        registry.register(noop("get_orders")).unwrap();
        registry.register(noop("get_labels")).unwrap();
        let text = registry.catalogue_text();
        assert!(text.contains("Function: get_orders"));
        assert!(text.contains("Function: get_labels"));
        assert!(text.contains("\n---\n"));
    }
}
