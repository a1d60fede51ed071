//! Total ordering.
//!
//! Variants order by declaration position. Two instances of the same variant
//! compare field by field and return the first non-zero result. Null sorts
//! first; arrays compare over the shared prefix and then shorter first.

use std::cmp::Ordering;

use crate::error::DeriveError;
use crate::ir::{Arm, Lit, Op, Operation, OperationKind, Param, Side};
use crate::types::{PrimitiveKind, Type};

use super::{Context, sign};

pub fn derive(cx: &Context<'_>) -> Result<Operation, DeriveError> {
    let returns = Type::Primitive(PrimitiveKind::Int);
    let bindings = cx.bindings(&returns);
    let variants = cx.schema.variants();

    let arms = variants
        .iter()
        .map(|outer| {
            let inner = variants
                .iter()
                .map(|candidate| {
                    let body = if candidate.declaration_index == outer.declaration_index {
                        Op::Lexicographic(cx.steps("compareTo", &bindings, outer)?)
                    } else {
                        let delta = outer.declaration_index as i64 - candidate.declaration_index as i64;
                        Op::Return(Lit::Int(sign(delta)))
                    };
                    Ok(Arm::new(candidate, body))
                })
                .collect::<Result<Vec<_>, DeriveError>>()?;
            Ok(Arm::new(outer, Op::Match { side: Side::That, arms: inner }))
        })
        .collect::<Result<Vec<_>, DeriveError>>()?;

    tracing::debug!(schema = %cx.schema.name(), "compareTo derived");
    Ok(Operation {
        kind: OperationKind::CompareTo,
        visitor: cx.visitor(&bindings),
        returns,
        params: vec![Param::new("that", cx.data_type.clone())],
        body: Op::Match { side: Side::This, arms },
    })
}

/// Natural order of `double`: numeric, then by canonical bits, so `-0.0 < 0.0`
/// and NaN sorts above everything, equal only to itself.
pub fn compare_double(a: f64, b: f64) -> Ordering {
    if a < b {
        return Ordering::Less;
    }
    if a > b {
        return Ordering::Greater;
    }
    super::hash::canonical_double_bits(a).cmp(&super::hash::canonical_double_bits(b))
}

pub fn compare_float(a: f32, b: f32) -> Ordering {
    if a < b {
        return Ordering::Less;
    }
    if a > b {
        return Ordering::Greater;
    }
    super::hash::canonical_float_bits(a).cmp(&super::hash::canonical_float_bits(b))
}

pub fn ordering_to_int(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, SchemaDef, VariantDef, VariantSchema};

    #[test]
    fn different_variants_return_index_sign() {
        let def = SchemaDef::new("Level", "R")
            .with_variant(VariantDef::new("Low", "R"))
            .with_variant(VariantDef::new("Mid", "R").with_field(FieldDef::new("n", "int")))
            .with_variant(VariantDef::new("High", "R"));
        let schema = VariantSchema::build(&def).unwrap();
        let op = derive(&Context::new(&schema)).unwrap();

        let high = op.body.arms()[2].body.arms();
        assert_eq!(high[0].body, Op::Return(Lit::Int(1)));
        assert_eq!(high[1].body, Op::Return(Lit::Int(1)));
        assert!(matches!(&high[2].body, Op::Lexicographic(steps) if steps.is_empty()));
        let low = op.body.arms()[0].body.arms();
        assert_eq!(low[2].body, Op::Return(Lit::Int(-1)));
    }

    #[test]
    fn floating_order() {
        assert_eq!(compare_double(-0.0, 0.0), Ordering::Less);
        assert_eq!(compare_double(f64::NAN, f64::INFINITY), Ordering::Greater);
        assert_eq!(compare_double(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(compare_double(-1.0, f64::NAN), Ordering::Less);
        assert_eq!(compare_float(2.0, 1.0), Ordering::Greater);
        assert_eq!(compare_float(0.0, -0.0), Ordering::Greater);
    }
}
