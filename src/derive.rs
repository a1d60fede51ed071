//! Derivers: one structural operation per submodule.
//!
//! Every deriver instantiates the schema's roles for its own result type,
//! substitutes the field types, and classifies each field into the rule it
//! applies. That shared part lives here.
pub mod accessors;
pub mod equality;
pub mod hash;
pub mod ordering;
pub mod render;

use serde::{Deserialize, Serialize};

use crate::error::DeriveError;
use crate::ir::{FieldRule, FieldStep};
use crate::schema::{Field, Variant, VariantSchema};
use crate::types::{Bindings, RoleBindings, Type};

/// Per-schema tuning and the set of operations to derive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveOptions {
    pub hash_code_base: i32,
    pub equality: bool,
    pub hash: bool,
    pub ordering: bool,
    pub rendering: bool,
    pub serializable: bool,
    pub serial_version_uid: i64,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            hash_code_base: 27,
            equality: true,
            hash: true,
            ordering: true,
            rendering: true,
            serializable: false,
            serial_version_uid: 1,
        }
    }
}

/// What every deriver of one schema shares.
pub struct Context<'a> {
    pub schema: &'a VariantSchema,
    pub data_type: Type,
}

impl<'a> Context<'a> {
    pub fn new(schema: &'a VariantSchema) -> Self {
        Self { schema, data_type: schema.data_type() }
    }

    /// Role bindings for an operation whose matcher returns `result`.
    pub fn bindings(&self, result: &Type) -> Bindings {
        let roles = RoleBindings::new(result.boxed())
            .with_self(self.data_type.clone())
            .with_exception(Type::named("RuntimeException"));
        Bindings::for_roles(self.schema.roles(), &roles)
    }

    pub fn visitor(&self, bindings: &Bindings) -> Type {
        self.schema.visitor_type().substitute(bindings).into_owned()
    }

    pub fn step(
        &self,
        operation: &str,
        bindings: &Bindings,
        index: usize,
        field: &Field,
    ) -> Result<FieldStep, DeriveError> {
        let ty = field.ty.substitute(bindings).into_owned();
        if let Some(role) = ty.variables().into_iter().find_map(|v| self.schema.vars().role(v)) {
            return Err(DeriveError::UnboundRole {
                operation: operation.to_string(),
                field: field.name.clone(),
                role,
            });
        }
        let rule = classify(&ty, field.nullable).ok_or_else(|| DeriveError::UnsupportedShape {
            operation: operation.to_string(),
            field: field.name.clone(),
            ty: self.schema.render(&ty),
        })?;
        Ok(FieldStep { field: field.name.clone(), index, ty, rule })
    }

    /// One step per field, declaration order.
    pub fn steps(
        &self,
        operation: &str,
        bindings: &Bindings,
        variant: &Variant,
    ) -> Result<Vec<FieldStep>, DeriveError> {
        variant
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| self.step(operation, bindings, index, field))
            .collect()
    }

    pub fn field_at<'v>(
        &self,
        operation: &str,
        variant: &'v Variant,
        index: usize,
    ) -> Result<&'v Field, DeriveError> {
        variant.fields.get(index).ok_or_else(|| DeriveError::UnknownField {
            operation: operation.to_string(),
            variant: variant.name.clone(),
            index,
        })
    }
}

/// Rule for a substituted field type. Wildcards have no runtime shape.
pub fn classify(ty: &Type, nullable: bool) -> Option<FieldRule> {
    let rule = match ty {
        Type::Primitive(kind) => return Some(FieldRule::Primitive(*kind)),
        Type::Array(element) => FieldRule::Array(Box::new(classify(element, !element.is_primitive())?)),
        Type::Reference { .. } | Type::Variable(_) => FieldRule::Delegate,
        Type::Wildcard { .. } => return None,
    };
    Some(if nullable { FieldRule::Nullable(Box::new(rule)) } else { rule })
}

/// -1, 0 or 1.
pub(crate) fn sign(n: i64) -> i32 {
    n.signum() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, SchemaDef, VariantDef};
    use crate::types::{PrimitiveKind, WildcardMode};

    #[test]
    fn classification_follows_nullability_and_nesting() {
        let int = Type::Primitive(PrimitiveKind::Int);
        assert_eq!(classify(&int, false), Some(FieldRule::Primitive(PrimitiveKind::Int)));
        assert_eq!(
            classify(&Type::array(Type::array(int.clone())), true),
            Some(FieldRule::Nullable(Box::new(FieldRule::Array(Box::new(FieldRule::Nullable(
                Box::new(FieldRule::Array(Box::new(FieldRule::Primitive(PrimitiveKind::Int))))
            ))))))
        );
        // rows of a primitive matrix are references, so they may be null
        assert_eq!(
            classify(&Type::array(Type::array(int.clone())), false),
            Some(FieldRule::Array(Box::new(FieldRule::Nullable(Box::new(FieldRule::Array(
                Box::new(FieldRule::Primitive(PrimitiveKind::Int))
            ))))))
        );
        assert_eq!(
            classify(&Type::array(Type::named("String")), false),
            Some(FieldRule::Array(Box::new(FieldRule::Nullable(Box::new(FieldRule::Delegate)))))
        );
        assert_eq!(classify(&Type::wildcard(WildcardMode::Super, int), false), None);
    }

    #[test]
    fn self_typed_fields_become_the_data_type() {
        let def = SchemaDef::new("Tree", "R")
            .with_param("T")
            .with_self("S")
            .with_variant(
                VariantDef::new("Node", "R")
                    .with_field(FieldDef::new("children", "java.util.List<? extends S>[]"))
                    .with_field(FieldDef::new("value", "T")),
            );
        let schema = VariantSchema::build(&def).unwrap();
        let cx = Context::new(&schema);
        let bindings = cx.bindings(&Type::Primitive(PrimitiveKind::Boolean));
        let steps = cx.steps("equals", &bindings, &schema.variants()[0]).unwrap();
        assert_eq!(schema.render(&steps[0].ty), "java.util.List<? extends Tree<T>>[]");
        assert_eq!(schema.render(&steps[1].ty), "T");
        assert_eq!(steps[1].rule, FieldRule::Delegate);
        assert_eq!(schema.render(&cx.visitor(&bindings)), "TreeVisitor<Tree<T>, T, Boolean>");
    }

    #[test]
    fn leftover_roles_are_contract_faults() {
        let def = SchemaDef::new("Tree", "R")
            .with_self("S")
            .with_variant(VariantDef::new("Leaf", "R").with_field(FieldDef::new("up", "S")));
        let schema = VariantSchema::build(&def).unwrap();
        let cx = Context::new(&schema);
        // no binding for the self role
        let err = cx
            .step("equals", &Bindings::new(), 0, &schema.variants()[0].fields[0])
            .unwrap_err();
        assert!(matches!(err, DeriveError::UnboundRole { field, .. } if field == "up"));
    }
}
