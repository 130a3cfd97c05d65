//! 动作参数 JSON Schema（schemars 从参数结构体生成）与 required 校验

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 由参数结构体生成 function calling 用的 parameters schema（去掉 $schema / title）
pub fn parameters_schema_for<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {}, "required": [] })
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("required").or_insert_with(|| Value::Array(Vec::new()));
    }
    value
}

/// schema 中声明的必填参数名
pub fn required_arguments(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}

/// 校验参数：必须是对象，且每个必填参数存在且非 null
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(obj) = args.as_object() else {
        return Err(format!("Arguments must be a JSON object, got: {}", args));
    };
    let missing: Vec<&str> = required_arguments(schema)
        .into_iter()
        .filter(|name| obj.get(*name).map_or(true, Value::is_null))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Missing required argument(s): {}", missing.join(", ")))
    }
}
