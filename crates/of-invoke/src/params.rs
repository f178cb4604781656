//! Typed readers over a JSON request body.
//!
//! Keys are matched exactly first, then ignoring ASCII case, so both
//! `ParentId` and `parentId` are accepted.

use serde_json::Value;

use crate::{Page, ServiceError};

fn lookup<'a>(params: &'a Page, key: &str) -> Option<&'a Value> {
    params.get(key).or_else(|| {
        params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub fn optional_str(params: &Page, key: &str) -> Result<Option<String>, ServiceError> {
    match lookup(params, key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ServiceError::validation(format!(
            "{} must be a string, got {}",
            key, other
        ))),
    }
}

pub fn required_str(params: &Page, key: &str) -> Result<String, ServiceError> {
    optional_str(params, key)?
        .ok_or_else(|| ServiceError::validation(format!("Missing required parameter: {}", key)))
}

pub fn optional_i32(params: &Page, key: &str) -> Result<Option<i32>, ServiceError> {
    match lookup(params, key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| ServiceError::validation(format!("{} is out of range", key))),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| ServiceError::validation(format!("{} must be an integer", key))),
        Some(other) => Err(ServiceError::validation(format!(
            "{} must be an integer, got {}",
            key, other
        ))),
    }
}

/// Insert `value` under `key` when present.
pub fn insert_opt(page: &mut Page, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        page.insert(key.to_string(), Value::String(v.to_string()));
    }
}
