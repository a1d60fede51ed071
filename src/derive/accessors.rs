//! Getters, updaters, predicates and factories.
//!
//! Getters and updaters dispatch on `this`: variants the configuration maps
//! read or rebuild their field, every other variant faults at run time with
//! "no such field". Predicates return their membership literal.

use crate::config::{FieldConfiguration, PredicateConfiguration};
use crate::error::DeriveError;
use crate::ir::{Arm, Failure, Lit, Op, Operation, OperationKind, Param, Side};
use crate::schema::Variant;
use crate::types::{PrimitiveKind, Type};

use super::Context;

pub fn getter(cx: &Context<'_>, config: &FieldConfiguration) -> Result<Operation, DeriveError> {
    // the field type may itself mention the self role
    let returns = config.ty.substitute(&cx.bindings(&cx.data_type)).into_owned();
    let bindings = cx.bindings(&returns);
    let arms = field_arms(cx, config, |variant, index| {
        let field = cx.field_at("getter", variant, index)?;
        Ok(Op::Read(cx.step("getter", &bindings, index, field)?))
    })?;

    Ok(Operation {
        kind: OperationKind::Getter { name: config.public_name.clone() },
        visitor: cx.visitor(&bindings),
        returns,
        params: Vec::new(),
        body: Op::Match { side: Side::This, arms },
    })
}

pub fn updater(cx: &Context<'_>, config: &FieldConfiguration) -> Result<Operation, DeriveError> {
    let bindings = cx.bindings(&cx.data_type);
    let arms = field_arms(cx, config, |variant, index| {
        let field = cx.field_at("updater", variant, index)?;
        let target = cx.step("updater", &bindings, index, field)?;
        Ok(Op::Rebuild { variant: variant.declaration_index, target })
    })?;

    Ok(Operation {
        kind: OperationKind::Updater { name: config.public_name.clone() },
        visitor: cx.visitor(&bindings),
        returns: cx.data_type.clone(),
        params: vec![Param::new("value", config.ty.substitute(&bindings).into_owned())],
        body: Op::Match { side: Side::This, arms },
    })
}

pub fn predicate(cx: &Context<'_>, config: &PredicateConfiguration) -> Operation {
    let returns = Type::Primitive(PrimitiveKind::Boolean);
    let bindings = cx.bindings(&returns);
    let arms = cx
        .schema
        .variants()
        .iter()
        .map(|variant| Arm::new(variant, Op::Return(Lit::Bool(config.holds_for(&variant.name)))))
        .collect();

    Operation {
        kind: OperationKind::Predicate { name: config.public_name.clone() },
        visitor: cx.visitor(&bindings),
        returns,
        params: Vec::new(),
        body: Op::Match { side: Side::This, arms },
    }
}

/// Factory for one variant; non-nullable reference arguments are null-checked.
pub fn factory(cx: &Context<'_>, variant: &Variant) -> Result<Operation, DeriveError> {
    let bindings = cx.bindings(&cx.data_type);
    let steps = cx.steps("factory", &bindings, variant)?;
    let checks = steps
        .iter()
        .filter(|step| step.rule.rejects_null())
        .map(|step| step.index)
        .collect();
    let params = steps
        .into_iter()
        .map(|step| Param::new(step.field, step.ty))
        .collect();

    Ok(Operation {
        kind: OperationKind::Factory { variant: variant.name.clone() },
        visitor: cx.visitor(&bindings),
        returns: cx.data_type.clone(),
        params,
        body: Op::Construct { variant: variant.declaration_index, checks },
    })
}

fn field_arms(
    cx: &Context<'_>,
    config: &FieldConfiguration,
    mut mapped: impl FnMut(&Variant, usize) -> Result<Op, DeriveError>,
) -> Result<Vec<Arm>, DeriveError> {
    cx.schema
        .variants()
        .iter()
        .map(|variant| {
            let body = match config.slot(&variant.name) {
                Some(slot) => mapped(variant, slot.index)?,
                None => Op::Fault(Failure::NoSuchField {
                    accessor: config.public_name.clone(),
                    variant: variant.name.clone(),
                }),
            };
            Ok(Arm::new(variant, body))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configurations;
    use crate::ir::FieldRule;
    use crate::schema::{AccessorTag, FieldDef, SchemaDef, VariantDef, VariantSchema};

    fn schema() -> VariantSchema {
        let def = SchemaDef::new("Tree", "R")
            .with_param("T")
            .with_self("S")
            .with_variant(
                VariantDef::new("Leaf", "R")
                    .with_field(FieldDef::new("value", "T").with_getter(AccessorTag::public("value")))
                    .with_predicate(AccessorTag::public("isLeaf")),
            )
            .with_variant(
                VariantDef::new("Node", "R")
                    .with_field(FieldDef::new("weight", "int"))
                    .with_field(FieldDef::new("left", "S").with_updater(AccessorTag::public("left")))
                    .with_field(FieldDef::new("right", "S").nullable()),
            );
        VariantSchema::build(&def).unwrap()
    }

    #[test]
    fn getter_faults_on_unmapped_variants() {
        let schema = schema();
        let configs = Configurations::read(&schema).unwrap();
        let cx = Context::new(&schema);
        let op = getter(&cx, &configs.getters["value"]).unwrap();
        let arms = op.body.arms();
        assert!(matches!(&arms[0].body, Op::Read(step) if step.field == "value"));
        assert_eq!(
            arms[1].body,
            Op::Fault(Failure::NoSuchField { accessor: "value".into(), variant: "Node".into() })
        );
        assert_eq!(schema.render(&op.returns), "T");
        assert_eq!(schema.render(&op.visitor), "TreeVisitor<Tree<T>, T, T>");
    }

    #[test]
    fn updater_rebuilds_with_substituted_type() {
        let schema = schema();
        let configs = Configurations::read(&schema).unwrap();
        let cx = Context::new(&schema);
        let op = updater(&cx, &configs.updaters["left"]).unwrap();
        assert_eq!(schema.render(&op.params[0].ty), "Tree<T>");
        let arms = op.body.arms();
        assert!(matches!(&arms[0].body, Op::Fault(_)));
        assert!(matches!(&arms[1].body, Op::Rebuild { variant: 1, target } if target.index == 1));
    }

    #[test]
    fn predicate_is_a_literal_per_variant() {
        let schema = schema();
        let configs = Configurations::read(&schema).unwrap();
        let op = predicate(&Context::new(&schema), &configs.predicates["isLeaf"]);
        let bodies: Vec<&Op> = op.body.arms().iter().map(|arm| &arm.body).collect();
        assert_eq!(bodies, vec![&Op::Return(Lit::Bool(true)), &Op::Return(Lit::Bool(false))]);
    }

    #[test]
    fn factory_checks_non_nullable_references() {
        let schema = schema();
        let cx = Context::new(&schema);
        let op = factory(&cx, &schema.variants()[1]).unwrap();
        assert_eq!(op.body, Op::Construct { variant: 1, checks: vec![1] });
        let names: Vec<&str> = op.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["weight", "left", "right"]);
        assert!(!FieldRule::Nullable(Box::new(FieldRule::Delegate)).rejects_null());
    }
}
