//! Host functions available to custom-code scripts.
//!
//! Scripts get a clock, dice rolls in the units flows already use
//! (inclusive integer ranges and percentages) and fresh ids for
//! backend payloads. Nothing here reaches player state; scripts only
//! see what the node hands them as `contextData`.

use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsNativeError, JsResult, JsValue, NativeFunction};
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

type HostFn = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// Global functions: name, implementation, declared arity.
const HOST_FUNCTIONS: &[(&str, HostFn, usize)] = &[
    ("randomInt", random_int, 2),
    ("chance", chance, 1),
    ("uuidv4", uuid_v4, 0),
];

/// Global names installed by [`register_all`]. The sandbox allowlist is
/// built from this.
pub const BUILTIN_GLOBALS: &[&str] = &["datetime", "randomInt", "chance", "uuidv4"];

/// Register all built-in APIs into a boa context.
pub fn register_all(context: &mut Context) -> JsResult<()> {
    let datetime = ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(datetime_now), js_string!("now"), 0)
        .build();
    context.register_global_property(js_string!("datetime"), datetime, Attribute::all())?;

    for &(name, host_fn, arity) in HOST_FUNCTIONS {
        let function = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(host_fn))
            .name(js_string!(name))
            .length(arity)
            .constructor(false)
            .build();
        context.register_global_property(js_string!(name), function, Attribute::all())?;
    }
    Ok(())
}

fn type_error<T>(message: impl Into<String>) -> JsResult<T> {
    Err(JsNativeError::typ().with_message(message.into()).into())
}

fn finite_arg(args: &[JsValue], index: usize, context: &mut Context, name: &str) -> JsResult<f64> {
    let value = match args.get(index) {
        Some(v) if !v.is_undefined() && !v.is_null() => v,
        _ => return type_error(format!("Argument '{}' is required", name)),
    };
    let number = value.to_number(context)?;
    if !number.is_finite() {
        return type_error(format!("Argument '{}' must be a finite number", name));
    }
    Ok(number)
}

/// Milliseconds since the Unix epoch.
fn datetime_now(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(Utc::now().timestamp_millis() as f64))
}

/// Integer in `[min, max]`, both ends inclusive.
fn random_int(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let min = finite_arg(args, 0, context, "min")?.ceil() as i64;
    let max = finite_arg(args, 1, context, "max")?.floor() as i64;
    if min > max {
        return type_error("randomInt: min must not exceed max");
    }
    let value = rand::thread_rng().gen_range(min..=max);
    Ok(JsValue::from(value as f64))
}

/// `true` with probability `percent / 100`; out-of-range percentages clamp.
fn chance(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let percent = finite_arg(args, 0, context, "percent")?.clamp(0.0, 100.0);
    let roll = rand::thread_rng().gen::<f64>() * 100.0;
    Ok(JsValue::from(roll < percent))
}

fn uuid_v4(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(Uuid::new_v4().to_string())))
}
