//! 订单操作：待处理 / 已完成列表，取消，完成

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::Arguments;
use crate::tools::args::req_i64;
use crate::tools::{
    restaurant_param, BackendClient, ExecutionScope, Operation, OperationSpec, ParamSpec, ParamType,
};

/// 列表最多展示的订单数
const MAX_LISTED_ORDERS: usize = 10;

fn order_param(description: &str) -> ParamSpec {
    ParamSpec::required("order_id", ParamType::Integer, description)
}

fn summarize_order(order: &Value) -> String {
    let items = order
        .get("items")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let dine_type = if order.get("dine_in").and_then(Value::as_bool).unwrap_or(false) {
        "Dine-in"
    } else {
        "Takeout"
    };
    let customer = order
        .pointer("/user_details/name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    format!(
        "Order #{} - {}\n  {} items, ₹{}\n  Customer: {}\n",
        order.get("order_id").cloned().unwrap_or(Value::Null),
        dine_type,
        items,
        order.get("amount").cloned().unwrap_or(json!(0)),
        customer
    )
}

pub struct GetOrders {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetOrders {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_orders", "Get all pending orders for the restaurant")
            .param(restaurant_param());
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetOrders {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let resp = self
            .backend
            .post("/orders/", json!({ "r_id": restaurant_id }), scope)
            .await?
            .ensure_ok("Failed to fetch orders", "Unknown error")?;

        let orders = resp.data().as_array().cloned().unwrap_or_default();
        if orders.is_empty() {
            return Ok("No pending orders".to_string());
        }

        let details: Vec<String> = orders
            .iter()
            .take(MAX_LISTED_ORDERS)
            .map(summarize_order)
            .collect();
        Ok(format!(
            "📋 {} Pending Orders:\n\n{}",
            orders.len(),
            details.join("\n")
        ))
    }
}

pub struct GetCompletedOrders {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetCompletedOrders {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_completed_orders", "Get all completed/past orders")
            .param(restaurant_param());
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetCompletedOrders {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let resp = self
            .backend
            .post("/orders/completed-orders", json!({ "r_id": restaurant_id }), scope)
            .await?
            .ensure_ok("Failed to fetch completed orders", "Unknown error")?;

        let count = resp.data().as_array().map_or(0, Vec::len);
        if count == 0 {
            return Ok("No completed orders".to_string());
        }
        Ok(format!(
            "✅ {count} completed orders found. Recent orders displayed on your dashboard."
        ))
    }
}

pub struct CancelOrder {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl CancelOrder {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("cancel_order", "Cancel a pending order")
            .param(order_param("Order ID to cancel"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for CancelOrder {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let order_id = req_i64(args, "order_id")?;
        self.backend
            .delete("/orders/delete", json!({ "o_id": order_id }), scope)
            .await?
            .ensure_ok("Failed to cancel order", "Unknown error")?;
        Ok(format!("✅ Order #{order_id} cancelled successfully"))
    }
}

pub struct CompleteOrder {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl CompleteOrder {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("complete_order", "Mark an order as completed")
            .param(order_param("Order ID to complete"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for CompleteOrder {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let order_id = req_i64(args, "order_id")?;
        self.backend
            .post("/orders/complete", json!({ "o_id": order_id }), scope)
            .await?
            .ensure_ok("Failed to complete order", "Unknown error")?;
        Ok(format!("✅ Order #{order_id} completed and moved to history"))
    }
}
