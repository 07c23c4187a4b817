//! Moving rule bindings and verdicts across the sandbox boundary
//!
//! Values cross as plain data only. Scalars are converted directly, which
//! covers the common verdicts (`true` or a message string); arrays and
//! objects go through the engine's own `JSON.parse`/`JSON.stringify`, so a
//! script never receives a host object.

use rquickjs::{Ctx, Value};
use serde_json::{Number, Value as Json};

use crate::error::{JsError, Result};

/// Convert a JSON value into a JS value owned by `ctx`.
pub fn json_to_js<'js>(ctx: &Ctx<'js>, value: &Json) -> Result<Value<'js>> {
    match value {
        Json::Null => Ok(Value::new_null(ctx.clone())),
        Json::Bool(flag) => Ok(Value::new_bool(ctx.clone(), *flag)),
        Json::String(text) => rquickjs::String::from_str(ctx.clone(), text)
            .map(|s| s.into_value())
            .map_err(|e| JsError::type_conversion(format!("cannot bind string: {e}"))),
        Json::Number(_) | Json::Array(_) | Json::Object(_) => {
            ctx.json_parse(value.to_string())
                .map_err(|e| JsError::type_conversion(format!("cannot bind value: {e}")))
        }
    }
}

/// Convert a JS value back into JSON.
///
/// Values JSON cannot express (`undefined`, functions, symbols, `NaN`,
/// infinities) become `null`, matching what `JSON.stringify` does inside
/// arrays.
pub fn js_to_json<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<Json> {
    if let Some(flag) = value.as_bool() {
        return Ok(Json::Bool(flag));
    }
    if let Some(number) = value.as_int() {
        return Ok(Json::from(number));
    }
    if let Some(number) = value.as_float() {
        return Ok(Number::from_f64(number).map_or(Json::Null, Json::Number));
    }
    if let Some(text) = value.as_string() {
        return text
            .to_string()
            .map(Json::String)
            .map_err(|e| JsError::type_conversion(format!("cannot read string: {e}")));
    }
    if !(value.is_array() || value.is_object()) || value.is_function() {
        return Ok(Json::Null);
    }

    let text = ctx
        .json_stringify(value)
        .map_err(|e| JsError::type_conversion(format!("JSON.stringify failed: {e}")))?;
    match text {
        Some(text) => {
            let text = text
                .to_string()
                .map_err(|e| JsError::type_conversion(format!("cannot read string: {e}")))?;
            serde_json::from_str(&text).map_err(|e| JsError::type_conversion(e.to_string()))
        }
        None => Ok(Json::Null),
    }
}
