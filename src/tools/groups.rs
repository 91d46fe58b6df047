//! 菜单分组（类别）操作

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::Arguments;
use crate::tools::args::{opt_i64, req_i64, req_str};
use crate::tools::{
    restaurant_param, BackendClient, ExecutionScope, Operation, OperationSpec, ParamSpec, ParamType,
};

pub struct GetMenuGroups {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetMenuGroups {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_menu_groups", "Get all menu groups/categories for the restaurant")
            .param(restaurant_param());
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetMenuGroups {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let resp = self
            .backend
            .post("/groups/", json!({ "r_id": restaurant_id }), scope)
            .await?
            .ensure_ok("Failed to fetch groups", "Unknown error")?;

        let groups = resp
            .data()
            .get("groups")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if groups.is_empty() {
            return Ok("No menu groups found. Create one first!".to_string());
        }

        let list: Vec<String> = groups
            .iter()
            .map(|g| {
                format!(
                    "- {} (ID: {})",
                    g.get("gname").and_then(Value::as_str).unwrap_or("?"),
                    g.get("g_id").cloned().unwrap_or(Value::Null)
                )
            })
            .collect();
        Ok(format!("📋 Menu Groups:\n{}", list.join("\n")))
    }
}

pub struct CreateMenuGroup {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl CreateMenuGroup {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("create_menu_group", "Create a new menu group/category")
            .param(restaurant_param())
            .param(ParamSpec::required(
                "name",
                ParamType::String,
                "Group name (e.g., Appetizers, Main Course, Breads)",
            ))
            .param(ParamSpec::optional("icon", ParamType::Integer, "Icon ID (default: 1)").with_default(json!(1)));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for CreateMenuGroup {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let name = req_str(args, "name")?;
        let icon = opt_i64(args, "icon")?.unwrap_or(1);

        let resp = self
            .backend
            .post(
                "/groups/create",
                json!({ "r_id": restaurant_id, "name": name, "g_icon": icon }),
                scope,
            )
            .await?
            .ensure_ok("Failed to create group", "Unknown error")?;

        let group_id = resp.data().pointer("/group/g_id").cloned().unwrap_or(Value::Null);
        Ok(format!("✅ Created menu group '{name}' (ID: {group_id})"))
    }
}

pub struct DeleteMenuGroup {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl DeleteMenuGroup {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("delete_menu_group", "Delete a menu group/category")
            .param(ParamSpec::required("group_id", ParamType::Integer, "Group ID to delete"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for DeleteMenuGroup {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let group_id = req_i64(args, "group_id")?;
        self.backend
            .delete("/groups/delete", json!({ "g_id": group_id }), scope)
            .await?
            .ensure_ok("Failed to delete group", "Cannot delete if items exist")?;
        Ok(format!("✅ Successfully deleted group (ID: {group_id})"))
    }
}
