//! Runtime values and the intrinsic contracts of non-instance values.
//!
//! Scalars and strings carry the boxed-value behaviour generated code relies
//! on when it delegates: `Boolean` hashes to 1231/1237, strings hash and
//! compare over UTF-16 code units, floating values compare by the total order
//! in [`crate::derive::ordering`].

use std::cmp::Ordering;
use std::sync::Arc;

use crate::derive::{hash, ordering};
use crate::types::PrimitiveKind;

use super::Fault;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Data(Arc<Instance>),
}

/// One constructed variant. Fields are in declaration order.
#[derive(Debug)]
pub struct Instance {
    pub type_name: String,
    pub variant: usize,
    pub fields: Vec<Value>,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Str(_) => "String",
            Value::Array(_) => "array",
            Value::Data(_) => "instance",
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::Boolean(_) => PrimitiveKind::Boolean,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::Short(_) => PrimitiveKind::Short,
            Value::Char(_) => PrimitiveKind::Char,
            Value::Int(_) => PrimitiveKind::Int,
            Value::Long(_) => PrimitiveKind::Long,
            Value::Float(_) => PrimitiveKind::Float,
            Value::Double(_) => PrimitiveKind::Double,
            _ => return None,
        })
    }

    pub fn as_instance(&self) -> Result<&Instance, Fault> {
        match self {
            Value::Data(instance) => Ok(instance.as_ref()),
            other => Err(Fault::NotAnInstance { found: other.kind_name().to_string() }),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], Fault> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(Fault::shape("array", other)),
        }
    }
}

/// A value sitting in a slot of primitive type must be exactly that kind.
pub(super) fn check_kind(kind: PrimitiveKind, value: &Value) -> Result<(), Fault> {
    if value.primitive_kind() == Some(kind) {
        Ok(())
    } else {
        Err(Fault::shape(kind.keyword(), value))
    }
}

// -------------------------------- Scalars --------------------------------- //

/// Natural order of two scalars of the same kind. `None` for anything else.
pub(super) fn scalar_compare(a: &Value, b: &Value) -> Option<Ordering> {
    Some(match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Byte(x), Value::Byte(y)) => x.cmp(y),
        (Value::Short(x), Value::Short(y)) => x.cmp(y),
        (Value::Char(x), Value::Char(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Long(x), Value::Long(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => ordering::compare_float(*x, *y),
        (Value::Double(x), Value::Double(y)) => ordering::compare_double(*x, *y),
        (Value::Str(x), Value::Str(y)) => x.encode_utf16().cmp(y.encode_utf16()),
        _ => return None,
    })
}

/// Hash of a scalar. `boxed` selects the wrapper's contract, which differs
/// from the primitive one only for booleans.
pub(super) fn scalar_hash(value: &Value, boxed: bool) -> Option<i32> {
    Some(match value {
        Value::Boolean(b) if boxed => {
            if *b {
                1231
            } else {
                1237
            }
        }
        Value::Boolean(b) => hash::boolean_hash(*b),
        Value::Byte(n) => i32::from(*n),
        Value::Short(n) => i32::from(*n),
        Value::Char(c) => i32::from(*c),
        Value::Int(n) => *n,
        Value::Long(n) => hash::long_hash(*n),
        Value::Float(x) => hash::float_hash(*x),
        Value::Double(x) => hash::double_hash(*x),
        Value::Str(s) => hash::string_hash(s),
        _ => return None,
    })
}

pub(super) fn scalar_render(value: &Value) -> Option<String> {
    Some(match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Byte(n) => n.to_string(),
        Value::Short(n) => n.to_string(),
        Value::Char(c) => char::from_u32(u32::from(*c))
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string(),
        Value::Int(n) => n.to_string(),
        Value::Long(n) => n.to_string(),
        Value::Float(x) => render_floating(x.is_nan(), x.is_infinite(), x.is_sign_positive(), || {
            format!("{x:?}")
        }),
        Value::Double(x) => render_floating(x.is_nan(), x.is_infinite(), x.is_sign_positive(), || {
            format!("{x:?}")
        }),
        Value::Str(s) => s.clone(),
        _ => return None,
    })
}

fn render_floating(nan: bool, infinite: bool, positive: bool, finite: impl FnOnce() -> String) -> String {
    match (nan, infinite, positive) {
        (true, _, _) => "NaN".to_string(),
        (_, true, true) => "Infinity".to_string(),
        (_, true, false) => "-Infinity".to_string(),
        _ => finite(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_and_primitive_boolean_hashes_differ() {
        assert_eq!(scalar_hash(&Value::Boolean(true), true), Some(1231));
        assert_eq!(scalar_hash(&Value::Boolean(false), true), Some(1237));
        assert_eq!(scalar_hash(&Value::Boolean(true), false), Some(1));
        assert_eq!(scalar_hash(&Value::Char(65), false), Some(65));
        assert_eq!(scalar_hash(&Value::Array(vec![]), true), None);
    }

    #[test]
    fn strings_order_by_utf16_units() {
        // astral code points start with a surrogate, below U+FF21
        let wide = Value::str("\u{FF21}");
        let astral = Value::str("\u{1F600}");
        assert_eq!(scalar_compare(&astral, &wide), Some(Ordering::Less));
        assert_eq!(scalar_compare(&Value::str("a"), &Value::str("ab")), Some(Ordering::Less));
        assert_eq!(scalar_compare(&Value::Int(1), &Value::Long(1)), None);
    }

    #[test]
    fn floating_rendering() {
        assert_eq!(scalar_render(&Value::Double(1.0)).as_deref(), Some("1.0"));
        assert_eq!(scalar_render(&Value::Double(f64::NAN)).as_deref(), Some("NaN"));
        assert_eq!(scalar_render(&Value::Float(f32::NEG_INFINITY)).as_deref(), Some("-Infinity"));
        assert_eq!(scalar_render(&Value::Float(0.5)).as_deref(), Some("0.5"));
        assert_eq!(scalar_render(&Value::Char(0x41)).as_deref(), Some("A"));
    }

    #[test]
    fn primitive_slots_are_kind_checked() {
        assert!(check_kind(PrimitiveKind::Int, &Value::Int(3)).is_ok());
        assert!(matches!(
            check_kind(PrimitiveKind::Int, &Value::Long(3)),
            Err(Fault::Shape { expected, found }) if expected == "int" && found == "long"
        ));
    }
}
