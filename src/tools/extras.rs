//! 标签（veg / spicy 等）与加料（extras）操作

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::Arguments;
use crate::tools::args::{req_f64, req_i64, req_str};
use crate::tools::{
    restaurant_param, BackendClient, ExecutionScope, Operation, OperationSpec, ParamSpec, ParamType,
};

fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "?".to_string(),
        Some(other) => other.to_string(),
    }
}

pub struct GetLabels {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetLabels {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_labels", "Get all available labels (veg, non-veg, spicy, etc.)");
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetLabels {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, _args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let resp = self
            .backend
            .get("/labels/", scope)
            .await?
            .ensure_ok("Failed to fetch labels", "Unknown error")?;

        let labels = resp.data().as_array().cloned().unwrap_or_default();
        if labels.is_empty() {
            return Ok("No labels found".to_string());
        }
        let list: Vec<String> = labels
            .iter()
            .map(|l| format!("- {} (ID: {})", field(l, "name"), field(l, "id")))
            .collect();
        Ok(format!("🏷️ Available Labels:\n{}", list.join("\n")))
    }
}

pub struct CreateLabel {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl CreateLabel {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("create_label", "Create a new label (veg, spicy, gluten-free, etc.)")
            .param(ParamSpec::required("name", ParamType::String, "Label name"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for CreateLabel {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let name = req_str(args, "name")?;
        self.backend
            .post("/labels/create", json!({ "name": name }), scope)
            .await?
            .ensure_ok("Failed to create label", "Unknown error")?;
        Ok(format!("✅ Created label '{name}'"))
    }
}

pub struct GetExtras {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetExtras {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_extras", "Get all extras/addons for a restaurant")
            .param(restaurant_param());
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetExtras {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let resp = self
            .backend
            .post("/extras/", json!({ "r_id": restaurant_id }), scope)
            .await?
            .ensure_ok("Failed to fetch extras", "Unknown error")?;

        let extras = resp.data().as_array().cloned().unwrap_or_default();
        if extras.is_empty() {
            return Ok("No extras found".to_string());
        }
        let list: Vec<String> = extras
            .iter()
            .map(|e| {
                format!(
                    "- {} (₹{}) - ID: {}",
                    field(e, "name"),
                    field(e, "price"),
                    field(e, "id")
                )
            })
            .collect();
        Ok(format!("🧀 Available Extras:\n{}", list.join("\n")))
    }
}

pub struct CreateExtra {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl CreateExtra {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("create_extra", "Create a new extra/addon (cheese, sauce, etc.)")
            .param(restaurant_param())
            .param(ParamSpec::required("name", ParamType::String, "Extra name"))
            .param(ParamSpec::required("price", ParamType::Number, "Extra price"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for CreateExtra {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let name = req_str(args, "name")?;
        let price = req_f64(args, "price")?;
        self.backend
            .post(
                "/extras/create",
                json!({ "r_id": restaurant_id, "name": name, "price": price }),
                scope,
            )
            .await?
            .ensure_ok("Failed to create extra", "Unknown error")?;
        Ok(format!("✅ Created extra '{name}' at ₹{price}"))
    }
}

pub struct DeleteExtra {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl DeleteExtra {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("delete_extra", "Delete an extra/addon")
            .param(ParamSpec::required("extra_id", ParamType::Integer, "Extra ID to delete"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for DeleteExtra {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let extra_id = req_i64(args, "extra_id")?;
        // 后端用 PUT 做软删除
        self.backend
            .put(&format!("/extras/delete/{extra_id}"), json!({}), scope)
            .await?
            .ensure_ok("Failed to delete extra", "Unknown error")?;
        Ok(format!("✅ Deleted extra (ID: {extra_id})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::backend::testing::fake_backend;

    #[tokio::test]
    async fn test_get_labels_lists_names() {
        let (base, captured) = fake_backend(json!({
            "status": "200",
            "data": [{"id": 1, "name": "veg"}, {"id": 2, "name": "spicy"}]
        }))
        .await;
        let op = GetLabels::new(Arc::new(BackendClient::new(&base, 5).unwrap()));
        let reply = op
            .execute(&Arguments::new(), &ExecutionScope::default())
            .await
            .unwrap();
        assert!(reply.contains("- veg (ID: 1)"));
        assert!(reply.contains("- spicy (ID: 2)"));
        assert!(captured.lock().await[0].0.starts_with("GET /labels/"));
    }

    #[tokio::test]
    async fn test_delete_extra_uses_put() {
        let (base, captured) = fake_backend(json!({"status": "200"})).await;
        let op = DeleteExtra::new(Arc::new(BackendClient::new(&base, 5).unwrap()));
        let args = json!({"extra_id": 8}).as_object().cloned().unwrap();
        op.execute(&args, &ExecutionScope::default()).await.unwrap();
        assert!(captured.lock().await[0].0.starts_with("PUT /extras/delete/8"));
    }

    #[test]
    fn test_field_formatting() {
        let v = json!({"name": "cheese", "price": 20, "id": null});
        assert_eq!(field(&v, "name"), "cheese");
        assert_eq!(field(&v, "price"), "20");
        assert_eq!(field(&v, "id"), "?");
    }
}
