//! 报表与统计操作
//!
//! 仪表盘接口不一定带 `status` 信封（直接返回指标对象），因此这里按字段存在与否判断成功。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::Arguments;
use crate::tools::args::{opt_bool, opt_str, req_i64, req_str, validate_date};
use crate::tools::{
    restaurant_param, BackendClient, ExecutionScope, Operation, OperationSpec, ParamSpec, ParamType,
};

/// 趋势只展示最近 7 天
const TREND_DAYS: usize = 7;

fn number(value: &Value, key: &str) -> Value {
    value.get(key).cloned().unwrap_or(json!(0))
}

pub struct GetTodayMetrics {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetTodayMetrics {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new(
            "get_today_metrics",
            "Get today's sales metrics (total sales, dine-in, takeout)",
        )
        .param(restaurant_param());
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetTodayMetrics {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let resp = self
            .backend
            .post("/dashboard/today-metrics", json!({ "r_id": restaurant_id }), scope)
            .await?;
        let data = resp.raw();
        if !resp.is_ok() && data.get("today_sales").is_none() {
            return Err("Failed to fetch metrics".to_string());
        }

        Ok(format!(
            "📊 Today's Metrics:\n\
             Total Sales: {} orders\n\
             Dine-in: {} orders (₹{})\n\
             Takeout: {} orders (₹{})\n\
             Total Amount: ₹{}",
            number(data, "today_sales"),
            number(data, "total_dine_in"),
            number(data, "total_dine_in_amount"),
            number(data, "total_takeout"),
            number(data, "total_takeout_amount"),
            number(data, "today_sales_amount"),
        ))
    }
}

pub struct GetSalesTrends {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GetSalesTrends {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("get_sales_trends", "Get sales trends for last 30 days")
            .param(restaurant_param());
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GetSalesTrends {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        let restaurant_id = req_i64(args, "restaurant_id")?;
        let resp = self
            .backend
            .post("/dashboard/sales-trends", json!({ "r_id": restaurant_id }), scope)
            .await?;
        let trends = match resp.raw().get("sales_trends").and_then(Value::as_array) {
            Some(trends) => trends.clone(),
            None if resp.is_ok() => Vec::new(),
            None => return Err("Failed to fetch trends".to_string()),
        };
        if trends.is_empty() {
            return Ok("No sales data available".to_string());
        }

        let recent = &trends[trends.len().saturating_sub(TREND_DAYS)..];
        let lines: Vec<String> = recent
            .iter()
            .map(|t| {
                let day: String = t
                    .get("day")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .chars()
                    .take(3)
                    .collect();
                format!(
                    "{} {}: {} orders",
                    day,
                    t.get("date").and_then(Value::as_str).unwrap_or("?"),
                    number(t, "daily_sales")
                )
            })
            .collect();
        Ok(format!(
            "📈 Sales Trends (Last {} Days):\n{}",
            recent.len(),
            lines.join("\n")
        ))
    }
}

pub struct GenerateSalesReport {
    backend: Arc<BackendClient>,
    spec: OperationSpec,
}

impl GenerateSalesReport {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let spec = OperationSpec::new("generate_sales_report", "Generate downloadable sales report (CSV/PDF)")
            .param(restaurant_param())
            .param(ParamSpec::required("start_date", ParamType::String, "Start date (YYYY-MM-DD)"))
            .param(ParamSpec::required("end_date", ParamType::String, "End date (YYYY-MM-DD)"))
            .param(
                ParamSpec::optional("dine_in", ParamType::Boolean, "Include dine-in orders")
                    .with_default(json!(true)),
            )
            .param(
                ParamSpec::optional("pay_mode", ParamType::String, "Payment mode filter")
                    .with_default(json!("all")),
            );
        Self { backend, spec }
    }
}

#[async_trait]
impl Operation for GenerateSalesReport {
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    async fn execute(&self, args: &Arguments, scope: &ExecutionScope) -> Result<String, String> {
        req_i64(args, "restaurant_id")?;
        let start = validate_date(&req_str(args, "start_date")?)?;
        let end = validate_date(&req_str(args, "end_date")?)?;
        if end < start {
            return Err(format!("End date {end} is before start date {start}"));
        }
        let dine_in = opt_bool(args, "dine_in")?.unwrap_or(true);
        let pay_mode = opt_str(args, "pay_mode")?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "all".to_string());

        let resp = self
            .backend
            .post(
                "/reports/download/csv",
                json!({
                    "start_date": start.format("%Y-%m-%d").to_string(),
                    "end_date": end.format("%Y-%m-%d").to_string(),
                    "dine_in": dine_in,
                    "pay_mode": pay_mode,
                }),
                scope,
            )
            .await?;

        match resp.raw().get("file_path").and_then(Value::as_str) {
            Some(path) => Ok(format!("✅ Report generated! Download from: {path}")),
            None => Ok("✅ Report generation initiated. Check your backend for the file.".to_string()),
        }
    }
}
