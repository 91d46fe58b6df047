//! 菜单条目操作：创建 / 修改 / 查询 / 删除

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::core::Arguments;
use crate::tools::args::{
    opt_bool, opt_f64, opt_i64, opt_id_list, opt_str, req_f64, req_i64, req_str,
};
use crate::tools::{
    restaurant_param, BackendClient, ExecutionScope, Operation, OperationSpec, ParamSpec, ParamType,
};

/// 每个分组最多列出的条目数
const ITEMS_PER_GROUP: usize = 10;

pub struct CreateMenuItem {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl CreateMenuItem {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("create_menu_item", "Create a new menu item with default price")
            .param(restaurant_param())
            .param(ParamSpec::required("group_id", ParamType::Integer, "Menu group ID (g_id)"))
            .param(ParamSpec::required("name", ParamType::String, "Item name"))
            .param(ParamSpec::required("price", ParamType::Number, "Price in rupees"))
            .param(ParamSpec::optional("desc", ParamType::String, "Description (optional)"))
            .param(ParamSpec::optional("image", ParamType::String, "Image URL (optional)"))
            .param(
                ParamSpec::optional(
                    "ordertype",
                    ParamType::Integer,
                    "Order type: 0=both, 1=dine-in only, 2=takeout only",
                )
                .with_allowed(vec![json!(0), json!(1), json!(2)])
                .with_default(json!(0)),
            )
            .param(ParamSpec::optional("labels", ParamType::Array, "Label IDs array (optional)"))
            .param(ParamSpec::optional("extras_list", ParamType::Array, "Extra IDs array (optional)"))
            .grounded();
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for CreateMenuItem {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let group_id = req_i64(args, "group_id")?;
        let name = req_str(args, "name")?;
        let price = req_f64(args, "price")?;
        let ordertype = opt_i64(args, "ordertype")?.unwrap_or(0);
        if !(0..=2).contains(&ordertype) {
            return Err(format!("Invalid order type {ordertype}, expected 0, 1 or 2"));
        }

        let body = json!({
            "r_id": restaurant_id,
            "g_id": group_id,
            "name": name,
            "def_price": price,
            "desc": opt_str(args, "desc")?.unwrap_or_default(),
            "image": opt_str(args, "image")?.unwrap_or_default(),
            "ordertype": ordertype,
            "is_avail": true,
            "labels": opt_id_list(args, "labels")?,
            "extras_list": opt_id_list(args, "extras_list")?,
        });
        let resp = self
            .backend
            .post("/menu/create/default", body, scope)
            .await?
            .ensure_ok("Failed to create item", "Unknown error")?;

        let item_id = resp.data().pointer("/item/item_id").cloned().unwrap_or(Value::Null);
        Ok(format!("✅ Created menu item '{name}' at ₹{price} (ID: {item_id})"))
    }
}

pub struct UpdateMenuItem {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl UpdateMenuItem {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new(
            "update_menu_item",
            "Update menu item details (name, price, description, etc.)",
        )
        .param(ParamSpec::required("item_id", ParamType::Integer, "Item ID to update"))
        .param(ParamSpec::optional("name", ParamType::String, "New name (optional)"))
        .param(ParamSpec::optional("price", ParamType::Number, "New price (optional)"))
        .param(ParamSpec::optional("desc", ParamType::String, "New description (optional)"))
        .param(ParamSpec::optional("enable", ParamType::Boolean, "Enable/disable item (optional)"))
        .param(ParamSpec::optional("sold_out", ParamType::Boolean, "Mark as sold out (optional)"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for UpdateMenuItem {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let item_id = req_i64(args, "item_id")?;
        let mut body = Map::new();
        body.insert("id".into(), json!(item_id));
        if let Some(name) = opt_str(args, "name")?.filter(|s| !s.is_empty()) {
            body.insert("name".into(), json!(name));
        }
        if let Some(price) = opt_f64(args, "price")? {
            body.insert("def_price".into(), json!(price));
        }
        if let Some(desc) = opt_str(args, "desc")?.filter(|s| !s.is_empty()) {
            body.insert("desc".into(), json!(desc));
        }
        if let Some(enable) = opt_bool(args, "enable")? {
            body.insert("enable".into(), json!(enable));
        }
        if let Some(sold_out) = opt_bool(args, "sold_out")? {
            body.insert("sold_out".into(), json!(sold_out));
        }
        if body.len() == 1 {
            return Err("Nothing to update: provide a name, price, description or availability".into());
        }

        self.backend
            .post("/customize/item", Value::Object(body), scope)
            .await?
            .ensure_ok("Failed to update item", "Unknown error")?;
        Ok(format!("✅ Successfully updated item (ID: {item_id})"))
    }
}

pub struct GetMenuItems {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetMenuItems {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_menu_items", "Get all menu items, optionally filtered by group")
            .param(restaurant_param())
            .param(ParamSpec::optional("group_id", ParamType::Integer, "Filter by group ID (optional)"))
            .grounded();
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetMenuItems {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let group_filter = opt_i64(args, "group_id")?;

        let resp = self
            .backend
            .post("/menu/v2", json!({ "r_id": restaurant_id }), scope)
            .await?
            .ensure_ok("Failed to fetch items", "Unknown error")?;

        let groups: Vec<&Value> = resp
            .data()
            .get("groups")
            .and_then(Value::as_array)
            .map(|gs| {
                gs.iter()
                    .filter(|g| group_filter.map_or(true, |id| g.get("g_id").and_then(Value::as_i64) == Some(id)))
                    .collect()
            })
            .unwrap_or_default();

        if groups.is_empty() {
            return Ok(match group_filter {
                Some(id) => format!("No items found in group ID {id}"),
                None => "No menu items found.".to_string(),
            });
        }

        let lines: Vec<String> = groups
            .into_iter()
            .flat_map(|group| {
                let group_name = group.get("gname").and_then(Value::as_str).unwrap_or("Unknown");
                group
                    .get("items")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .take(ITEMS_PER_GROUP)
                    .map(move |item| {
                        format!(
                            "- {} (₹{}) - Group: {}, ID: {}",
                            item.get("name").and_then(Value::as_str).unwrap_or("?"),
                            item.get("def_price").cloned().unwrap_or(json!(0)),
                            group_name,
                            item.get("item_id").cloned().unwrap_or(Value::Null),
                        )
                    })
            })
            .collect();

        if lines.is_empty() {
            return Ok("No menu items found.".to_string());
        }
        Ok(format!("🍽️ Menu Items:\n{}", lines.join("\n")))
    }
}

pub struct DeleteMenuItem {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl DeleteMenuItem {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("delete_menu_item", "Delete a menu item")
            .param(ParamSpec::required("item_id", ParamType::Integer, "Item ID to delete"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for DeleteMenuItem {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let item_id = req_i64(args, "item_id")?;
        self.backend
            .delete(&format!("/menu/item/delete/{item_id}"), json!({}), scope)
            .await?
            .ensure_ok("Failed to delete item", "Unknown error")?;
        Ok(format!("✅ Successfully deleted item (ID: {item_id})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::backend::testing::fake_backend;

    fn scope() -> ExecutionScope {
        ExecutionScope {
            tenant_id: 7,
            ..Default::default()
        }
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_menu_item_maps_backend_fields() {
        let (base, captured) =
            fake_backend(json!({"status": "200", "data": {"item": {"item_id": 99}}})).await;
        let op = CreateMenuItem::new(Arc::new(BackendClient::new(&base, 5).unwrap()));

        let reply = op
            .execute(
                &args(json!({"restaurant_id": 7, "group_id": 3, "name": "Soup", "price": 8.99})),
                &scope(),
            )
            .await
            .unwrap();
        assert!(reply.contains("'Soup'"));
        assert!(reply.contains("ID: 99"));

        let captured = captured.lock().await;
        let body = &captured[0].2;
        assert!(captured[0].0.starts_with("POST /menu/create/default"));
        assert_eq!(body["r_id"], 7);
        assert_eq!(body["g_id"], 3);
        assert_eq!(body["def_price"], 8.99);
        assert_eq!(body["is_avail"], true);
        assert_eq!(body["labels"], json!([]));
    }

    #[tokio::test]
    async fn test_create_menu_item_rejects_bad_order_type_before_io() {
        let op = CreateMenuItem::new(Arc::new(BackendClient::new("http://127.0.0.1:9", 1).unwrap()));
        let err = op
            .execute(
                &args(json!({"restaurant_id": 7, "group_id": 3, "name": "Soup", "price": 1, "ordertype": 5})),
                &scope(),
            )
            .await
            .unwrap_err();
        assert!(err.contains("Invalid order type"));
    }

    #[tokio::test]
    async fn test_get_menu_items_filters_by_group() {
        let (base, _) = fake_backend(json!({
            "status": "200",
            "data": {"groups": [
                {"g_id": 1, "gname": "Soups", "items": [{"name": "Tomato", "def_price": 5, "item_id": 10}]},
                {"g_id": 2, "gname": "Breads", "items": [{"name": "Roti", "def_price": 2, "item_id": 11}]}
            ]}
        }))
        .await;
        let op = GetMenuItems::new(Arc::new(BackendClient::new(&base, 5).unwrap()));

        let reply = op
            .execute(&args(json!({"restaurant_id": 7, "group_id": 2})), &scope())
            .await
            .unwrap();
        assert!(reply.contains("Roti"));
        assert!(!reply.contains("Tomato"));
    }

    #[tokio::test]
    async fn test_update_menu_item_requires_a_change() {
        let op = UpdateMenuItem::new(Arc::new(BackendClient::new("http://127.0.0.1:9", 1).unwrap()));
        let err = op
            .execute(&args(json!({"item_id": 4})), &scope())
            .await
            .unwrap_err();
        assert!(err.contains("Nothing to update"));
    }

    #[test]
    fn test_grounded_flags() {
        let backend = Arc::new(BackendClient::new("http://127.0.0.1:9", 1).unwrap());
        assert!(CreateMenuItem::new(backend.clone()).spec().needs_grounding);
        assert!(GetMenuItems::new(backend.clone()).spec().needs_grounding);
        assert!(!DeleteMenuItem::new(backend).spec().needs_grounding);
    }
}
