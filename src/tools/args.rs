//! 参数读取与校验工具
//!
//! Oracle 给出的参数类型并不总是严格（数字可能是字符串、价格可能带 `$`），
//! 这里统一做宽松读取；读取失败返回面向用户的错误原因。

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::core::Arguments;

const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn lookup<'a>(args: &'a Arguments, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

pub fn opt_i64(args: &Arguments, name: &str) -> Result<Option<i64>, String> {
    match lookup(args, name) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| format!("'{name}' must be a whole number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("'{name}' must be a whole number, got '{s}'")),
        Some(other) => Err(format!("'{name}' must be a whole number, got {other}")),
    }
}

pub fn req_i64(args: &Arguments, name: &str) -> Result<i64, String> {
    opt_i64(args, name)?.ok_or_else(|| format!("'{name}' is required"))
}

/// 读取数值；字符串时按价格解析（允许 `$` 与空白）
pub fn opt_f64(args: &Arguments, name: &str) -> Result<Option<f64>, String> {
    match lookup(args, name) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => parse_price(s)
            .map(Some)
            .ok_or_else(|| format!("'{name}' must be a number, got '{s}'")),
        Some(other) => Err(format!("'{name}' must be a number, got {other}")),
    }
}

pub fn req_f64(args: &Arguments, name: &str) -> Result<f64, String> {
    opt_f64(args, name)?.ok_or_else(|| format!("'{name}' is required"))
}

pub fn opt_str(args: &Arguments, name: &str) -> Result<Option<String>, String> {
    match lookup(args, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(format!("'{name}' must be text, got {other}")),
    }
}

pub fn req_str(args: &Arguments, name: &str) -> Result<String, String> {
    match opt_str(args, name)? {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(format!("'{name}' is required")),
    }
}

pub fn opt_bool(args: &Arguments, name: &str) -> Result<Option<bool>, String> {
    match lookup(args, name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(Some(true)),
            "false" | "no" | "n" | "0" => Ok(Some(false)),
            _ => Err(format!("'{name}' must be true or false, got '{s}'")),
        },
        Some(other) => Err(format!("'{name}' must be true or false, got {other}")),
    }
}

/// 读取 ID 数组（允许单个数字）
pub fn opt_id_list(args: &Arguments, name: &str) -> Result<Vec<i64>, String> {
    match lookup(args, name) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_i64()
                    .ok_or_else(|| format!("'{name}' must contain only IDs, got {v}"))
            })
            .collect(),
        Some(Value::Number(_)) => Ok(vec![req_i64(args, name)?]),
        Some(other) => Err(format!("'{name}' must be a list of IDs, got {other}")),
    }
}

/// "$12.99" / "12.99" -> 12.99
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_start_matches('$')
        .trim_start_matches('₹')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// 校验 HH:MM（24 小时制）
pub fn validate_time(raw: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("'{raw}' is not a valid time, expected HH:MM"))
}

/// 校验 YYYY-MM-DD
pub fn validate_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not a valid date, expected YYYY-MM-DD"))
}

/// 0 = Monday ... 6 = Sunday
pub fn day_name(day_of_week: i64) -> Option<&'static str> {
    usize::try_from(day_of_week).ok().and_then(|i| DAYS.get(i).copied())
}
