//! Canonical string form: `Type.Variant{a = 1, b = x}`.

use crate::error::DeriveError;
use crate::ir::{Arm, Op, Operation, OperationKind, Side};
use crate::types::Type;

use super::Context;

pub fn derive(cx: &Context<'_>) -> Result<Operation, DeriveError> {
    let returns = Type::named("String");
    let bindings = cx.bindings(&returns);
    let arms = cx
        .schema
        .variants()
        .iter()
        .map(|variant| {
            let steps = cx.steps("toString", &bindings, variant)?;
            let prefix = format!("{}.{}", cx.schema.name(), variant.name);
            Ok(Arm::new(variant, Op::Render { prefix, steps }))
        })
        .collect::<Result<Vec<_>, DeriveError>>()?;

    tracing::debug!(schema = %cx.schema.name(), "toString derived");
    Ok(Operation {
        kind: OperationKind::ToString,
        visitor: cx.visitor(&bindings),
        returns,
        params: Vec::new(),
        body: Op::Match { side: Side::This, arms },
    })
}

pub fn assemble<'a>(prefix: &str, fields: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let body = fields
        .into_iter()
        .map(|(name, repr)| format!("{name} = {repr}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{prefix}{{{body}}}")
}
