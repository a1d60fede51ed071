//! Structural equality.
//!
//! The outer dispatch picks `this`'s variant and holds an inner dispatch on
//! `that`'s. Different tags return `false`; equal tags compare fields pairwise
//! in declared order and stop at the first mismatch.

use crate::error::DeriveError;
use crate::ir::{Arm, Lit, Op, Operation, OperationKind, Param, Side};
use crate::types::{PrimitiveKind, Type};

use super::Context;

pub fn derive(cx: &Context<'_>) -> Result<Operation, DeriveError> {
    let returns = Type::Primitive(PrimitiveKind::Boolean);
    let bindings = cx.bindings(&returns);
    let variants = cx.schema.variants();

    let arms = variants
        .iter()
        .map(|outer| {
            let inner = variants
                .iter()
                .map(|candidate| {
                    let body = if candidate.declaration_index == outer.declaration_index {
                        Op::AllEqual(cx.steps("equals", &bindings, outer)?)
                    } else {
                        Op::Return(Lit::Bool(false))
                    };
                    Ok(Arm::new(candidate, body))
                })
                .collect::<Result<Vec<_>, DeriveError>>()?;
            Ok(Arm::new(outer, Op::Match { side: Side::That, arms: inner }))
        })
        .collect::<Result<Vec<_>, DeriveError>>()?;

    tracing::debug!(schema = %cx.schema.name(), "equals derived");
    Ok(Operation {
        kind: OperationKind::Equals,
        visitor: cx.visitor(&bindings),
        returns,
        params: vec![Param::new("that", cx.data_type.clone())],
        body: Op::Match { side: Side::This, arms },
    })
}

/// Primitive identity for floating kinds: canonical bit patterns, so NaN
/// equals itself and `-0.0` differs from `0.0`.
pub fn double_identity(a: f64, b: f64) -> bool {
    super::hash::canonical_double_bits(a) == super::hash::canonical_double_bits(b)
}

pub fn float_identity(a: f32, b: f32) -> bool {
    super::hash::canonical_float_bits(a) == super::hash::canonical_float_bits(b)
}
