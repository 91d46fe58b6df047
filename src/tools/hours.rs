//! 餐厅信息与营业时间操作
//!
//! 后端只有 `/customize/restaurant` 一个写接口；暂停 / 恢复接单目前后端没有对应 API，调用时直接返回失败说明。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::Arguments;
use crate::tools::args::{day_name, req_i64, req_str, validate_time};
use crate::tools::{
    restaurant_param, BackendClient, ExecutionScope, Operation, OperationSpec, ParamSpec, ParamType,
};

const CUSTOMIZE_ENDPOINT: &str = "/customize/restaurant";

pub struct GetRestaurantInfo {
    spec: OperationSpec,
}

impl GetRestaurantInfo {
    pub fn new() -> Self {
        let spec = OperationSpec::new(
            "get_restaurant_info",
            "Get current restaurant information including prep time, address, hours, and status",
        )
        .param(restaurant_param());
        Self { spec }
    }
}

impl Default for GetRestaurantInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operation for GetRestaurantInfo {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, _args: &Arguments, _scope: &ExecutionScope) -> Result<String, String> {
        Ok("ℹ️ Restaurant info can be updated using the customize restaurant functions. \
            Use specific functions to change prep time, address, or hours."
            .to_string())
    }
}

pub struct UpdatePrepTime {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl UpdatePrepTime {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("update_prep_time", "Update estimated preparation time for orders")
            .param(restaurant_param())
            .param(ParamSpec::required(
                "prep_time_minutes",
                ParamType::Integer,
                "Preparation time in minutes",
            ));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for UpdatePrepTime {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let minutes = req_i64(args, "prep_time_minutes")?;
        if minutes <= 0 {
            return Err(format!("Prep time must be positive, got {minutes}"));
        }

        self.backend
            .post(
                CUSTOMIZE_ENDPOINT,
                json!({ "r_id": restaurant_id, "est_prep_time": minutes }),
                scope,
            )
            .await?
            .ensure_ok("Failed to update prep time", "Unknown error")?;
        Ok(format!("✅ Successfully updated prep time to {minutes} minutes"))
    }
}

pub struct UpdateBusinessHours {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl UpdateBusinessHours {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new(
            "update_business_hours",
            "Update opening and closing hours for specific day",
        )
        .param(restaurant_param())
        .param(
            ParamSpec::required("day_of_week", ParamType::Integer, "Day (0=Monday, 6=Sunday)")
                .with_allowed((0..7).map(|d| json!(d)).collect()),
        )
        .param(ParamSpec::required("opening_time", ParamType::String, "Opening time (HH:MM format)"))
        .param(ParamSpec::required("closing_time", ParamType::String, "Closing time (HH:MM format)"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for UpdateBusinessHours {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let day_of_week = req_i64(args, "day_of_week")?;
        let day = day_name(day_of_week)
            .ok_or_else(|| format!("Day must be 0 (Monday) to 6 (Sunday), got {day_of_week}"))?;
        let opening = validate_time(&req_str(args, "opening_time")?)?;
        let closing = validate_time(&req_str(args, "closing_time")?)?;

        self.backend
            .post(
                CUSTOMIZE_ENDPOINT,
                json!({
                    "r_id": restaurant_id,
                    "opening_hours": [{
                        "day_of_week": day_of_week,
                        "opening_time": opening,
                        "closing_time": closing,
                    }],
                }),
                scope,
            )
            .await?
            .ensure_ok("Failed to update hours", "Unknown error")?;
        Ok(format!("✅ Successfully updated {day} hours to {opening}-{closing}"))
    }
}

/// 暂停 / 恢复接单：后端暂无接口
pub struct ToggleOrdering {
    paused: bool,
    spec: OperationSpec,
}

impl ToggleOrdering {
    pub fn pause() -> Self {
        Self {
            paused: true,
            spec: OperationSpec::new("pause_restaurant", "Pause restaurant to stop accepting new orders")
                .param(restaurant_param()),
        }
    }

    pub fn unpause() -> Self {
        Self {
            paused: false,
            spec: OperationSpec::new("unpause_restaurant", "Unpause restaurant to resume accepting orders")
                .param(restaurant_param()),
        }
    }
}

#[async_trait]
impl Operation for ToggleOrdering {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, _args: &Arguments, _scope: &ExecutionScope) -> Result<String, String> {
        let action = if self.paused { "Pause" } else { "Unpause" };
        Err(format!(
            "{action} restaurant functionality is not available in the current backend. \
             Please contact support to add this feature."
        ))
    }
}

pub struct UpdateRestaurantAddress {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl UpdateRestaurantAddress {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("update_restaurant_address", "Update restaurant's physical address")
            .param(restaurant_param())
            .param(ParamSpec::required("address", ParamType::String, "New address"));
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for UpdateRestaurantAddress {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let address = req_str(args, "address")?;

        self.backend
            .post(
                CUSTOMIZE_ENDPOINT,
                json!({ "r_id": restaurant_id, "address": address }),
                scope,
            )
            .await?
            .ensure_ok("Failed to update address", "Unknown error")?;
        Ok(format!("✅ Successfully updated address to: {address}"))
    }
}
