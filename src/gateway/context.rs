//! 接地上下文（Grounding Context）
//!
//! 部分操作（如 create_menu_item）需要餐厅当前的菜单分组才能把"汤类"之类的说法映射到 g_id。
//! 上下文按会话缓存，由编排器决定何时获取、何时失效。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::tools::{BackendClient, ExecutionScope};

/// 菜单分组的精简引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuGroupRef {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub icon: Option<i64>,
}

impl MenuGroupRef {
    /// 从后端分组记录（g_id / gname / g_icon）转换
    pub fn from_backend(group: &Value) -> Self {
        Self {
            id: group.get("g_id").and_then(Value::as_i64),
            name: group.get("gname").and_then(Value::as_str).map(String::from),
            icon: group.get("g_icon").and_then(Value::as_i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundingContext {
    pub restaurant_id: i64,
    #[serde(default)]
    pub groups: Vec<MenuGroupRef>,
    /// 其它查找表（保留未知字段，原样交给 Oracle）
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroundingContext {
    pub fn new(restaurant_id: i64, groups: Vec<MenuGroupRef>) -> Self {
        Self {
            restaurant_id,
            groups,
            extra: Map::new(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "restaurant_id": self.restaurant_id }))
    }
}

/// 上下文提供方：按租户拉取接地数据
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn fetch_context(&self, scope: &ExecutionScope) -> Result<GroundingContext, String>;
}

/// 通过后端 `POST /groups/` 获取菜单分组
pub struct BackendContextProvider {
    backend: Arc<BackendClient>,
}

impl BackendContextProvider {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ContextProvider for BackendContextProvider {
    async fn fetch_context(&self, scope: &ExecutionScope) -> Result<GroundingContext, String> {
        let resp = self
            .backend
            .post("/groups/", json!({ "r_id": scope.tenant_id }), scope)
            .await?
            .ensure_ok("Failed to fetch groups", "Unknown error")?;

        let groups = resp
            .data()
            .get("groups")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(MenuGroupRef::from_backend).collect())
            .unwrap_or_default();

        Ok(GroundingContext::new(scope.tenant_id, groups))
    }
}
