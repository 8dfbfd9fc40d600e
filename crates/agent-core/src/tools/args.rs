use serde_json::{json, Value};

use super::error::ToolError;

/// Parse the raw argument text of a tool call.
///
/// Blank text means "no arguments" and yields an empty object. Anything that
/// is not a JSON object is rejected so callers can fall back to defaults.
pub fn parse_tool_args(arguments: &str) -> Result<Value, ToolError> {
    let args_raw = arguments.trim();

    if args_raw.is_empty() {
        return Ok(json!({}));
    }

    let value: Value = serde_json::from_str(args_raw)
        .map_err(|error| ToolError::MalformedArguments(format!("Invalid JSON arguments: {error}")))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(ToolError::MalformedArguments(format!(
            "expected a JSON object, got {value}"
        )))
    }
}

/// Like [`parse_tool_args`] but never fails: malformed input becomes `{}`.
pub fn parse_tool_args_or_default(arguments: &str) -> Value {
    parse_tool_args(arguments).unwrap_or_else(|error| {
        log::warn!("{error}; falling back to default arguments");
        json!({})
    })
}

/// Non-blank string field of an argument object.
pub fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
