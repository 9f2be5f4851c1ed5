//! Value & type layer: tagged value references, runtime coercion and
//! locale-tolerant number parsing.

pub mod coercion;
pub mod value_ref;

pub use coercion::{
    coerce, number_to_value, parse_number, to_boolean, to_display_string, to_number,
    NumberLocale, TargetType,
};
pub use value_ref::{ValueRef, ValueType, PREVIOUS_RESULT};
