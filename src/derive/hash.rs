//! Hash codes.
//!
//! Each variant is seeded with its declaration position plus one, then every
//! field term is combined Horner-style with the schema's `hash_code_base` in
//! wrapping 32-bit arithmetic. The numeric recipe below is the one generated
//! code must reproduce bit for bit.

use crate::error::DeriveError;
use crate::ir::{Arm, Op, Operation, OperationKind, Side};
use crate::schema::Variant;
use crate::types::{PrimitiveKind, Type};

use super::Context;

const CANONICAL_NAN_BITS_64: i64 = 0x7ff8_0000_0000_0000;
const CANONICAL_NAN_BITS_32: i32 = 0x7fc0_0000;

pub fn derive(cx: &Context<'_>, base: i32) -> Result<Operation, DeriveError> {
    let returns = Type::Primitive(PrimitiveKind::Int);
    let bindings = cx.bindings(&returns);

    let arms = cx
        .schema
        .variants()
        .iter()
        .map(|variant| {
            let steps = cx.steps("hashCode", &bindings, variant)?;
            Ok(Arm::new(variant, Op::Combine { seed: seed(variant), base, steps }))
        })
        .collect::<Result<Vec<_>, DeriveError>>()?;

    tracing::debug!(schema = %cx.schema.name(), base, "hashCode derived");
    Ok(Operation {
        kind: OperationKind::HashCode,
        visitor: cx.visitor(&bindings),
        returns,
        params: Vec::new(),
        body: Op::Match { side: Side::This, arms },
    })
}

pub fn seed(variant: &Variant) -> i32 {
    variant.declaration_index as i32 + 1
}

pub fn combine(acc: i32, base: i32, term: i32) -> i32 {
    acc.wrapping_mul(base).wrapping_add(term)
}

/// `(int)(v ^ (v >>> 32))`
pub fn long_hash(v: i64) -> i32 {
    (v ^ ((v as u64) >> 32) as i64) as i32
}

pub fn canonical_double_bits(v: f64) -> i64 {
    if v.is_nan() { CANONICAL_NAN_BITS_64 } else { v.to_bits() as i64 }
}

pub fn canonical_float_bits(v: f32) -> i32 {
    if v.is_nan() { CANONICAL_NAN_BITS_32 } else { v.to_bits() as i32 }
}

pub fn double_hash(v: f64) -> i32 {
    long_hash(canonical_double_bits(v))
}

pub fn float_hash(v: f32) -> i32 {
    canonical_float_bits(v)
}

pub fn boolean_hash(v: bool) -> i32 {
    if v { 1 } else { 0 }
}

/// Hash of a string over its UTF-16 code units, `h = 31 * h + c`.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(i32::from(c)))
}
