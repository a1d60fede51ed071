//! Variant schemas: definition records in, validated model out.
//!
//! `SchemaDef` is the plain description a host integration hands over, in
//! memory or as JSON. `VariantSchema::build` resolves every type expression
//! against the schema's variable arena and validates the whole definition in
//! one pass, collecting every violation instead of stopping at the first.
//!
//! Once built, a `VariantSchema` is immutable. Derivers only read it.
pub mod type_expr;

use std::fmt;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::types::{Bindings, Role, RoleBindings, RoleVars, Type, TypeVarId, TypeVars};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier regex"));

// ------------------------------- Definitions ------------------------------ //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<String>,
    pub roles: RolesDef,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolesDef {
    #[serde(default, rename = "self")]
    pub self_type: Option<String>,
    pub result: String,
    #[serde(default)]
    pub exception: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    pub returns: String,
    #[serde(default)]
    pub throws: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub predicates: Vec<AccessorTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub getter: Option<AccessorTag>,
    #[serde(default)]
    pub updater: Option<AccessorTag>,
}

/// Public name (and visibility) under which a field or variant is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorTag {
    pub name: String,
    #[serde(default)]
    pub access: Access,
}

impl AccessorTag {
    pub fn public(name: impl Into<String>) -> Self {
        Self { name: name.into(), access: Access::Public }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Package,
    Private,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::Public => "public",
            Access::Package => "package-private",
            Access::Private => "private",
        })
    }
}

impl SchemaDef {
    pub fn new(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            roles: RolesDef { self_type: None, result: result.into(), exception: None },
            variants: Vec::new(),
        }
    }

    pub fn with_self(mut self, name: impl Into<String>) -> Self {
        self.roles.self_type = Some(name.into());
        self
    }

    pub fn with_exception(mut self, name: impl Into<String>) -> Self {
        self.roles.exception = Some(name.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn with_variant(mut self, variant: VariantDef) -> Self {
        self.variants.push(variant);
        self
    }
}

impl VariantDef {
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            returns: returns.into(),
            throws: Vec::new(),
            fields: Vec::new(),
            predicates: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_throws(mut self, ty: impl Into<String>) -> Self {
        self.throws.push(ty.into());
        self
    }

    pub fn with_predicate(mut self, tag: AccessorTag) -> Self {
        self.predicates.push(tag);
        self
    }
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { name: name.into(), ty: ty.into(), nullable: false, getter: None, updater: None }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_getter(mut self, tag: AccessorTag) -> Self {
        self.getter = Some(tag);
        self
    }

    pub fn with_updater(mut self, tag: AccessorTag) -> Self {
        self.updater = Some(tag);
        self
    }
}

// ------------------------------ Validated model --------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub nullable: bool,
    pub getter: Option<AccessorTag>,
    pub updater: Option<AccessorTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub fields: Vec<Field>,
    /// Position in declaration order; the only ordering tie-break between variants.
    pub declaration_index: usize,
    pub may_throw: bool,
    pub predicates: Vec<AccessorTag>,
}

#[derive(Debug, Clone)]
pub struct VariantSchema {
    name: String,
    vars: TypeVars,
    roles: RoleVars,
    params: Vec<TypeVarId>,
    variants: Vec<Variant>,
}

impl VariantSchema {
    pub fn build(def: &SchemaDef) -> Result<Self, Vec<SchemaError>> {
        let mut errors = Vec::new();
        check_identifier("a type name", &def.name, &mut errors);

        // declare ordinary parameters first, then the roles
        let mut vars = TypeVars::new();
        let mut declared: Vec<(String, String)> = Vec::new();
        let mut declare = |vars: &mut TypeVars, name: &str, role: Option<Role>, errors: &mut Vec<SchemaError>| {
            let what = match role {
                Some(role) => format!("the {role} role"),
                None => "a type parameter".to_string(),
            };
            check_identifier("a type variable", name, errors);
            if let Some((_, first)) = declared.iter().find(|(n, _)| n == name) {
                errors.push(SchemaError::RoleConflict {
                    name: name.to_string(),
                    first: first.clone(),
                    second: what.clone(),
                });
            }
            declared.push((name.to_string(), what));
            vars.declare(name, role)
        };

        let params: Vec<TypeVarId> = def
            .type_params
            .iter()
            .map(|p| declare(&mut vars, p.as_str(), None, &mut errors))
            .collect();
        let self_ = def
            .roles
            .self_type
            .as_deref()
            .map(|n| declare(&mut vars, n, Some(Role::SelfType), &mut errors));
        let result = declare(&mut vars, &def.roles.result, Some(Role::Result), &mut errors);
        let exception = def
            .roles
            .exception
            .as_deref()
            .map(|n| declare(&mut vars, n, Some(Role::Exception), &mut errors));
        let roles = RoleVars { self_, result, exception };

        if def.variants.is_empty() {
            errors.push(SchemaError::NoVariants { schema: def.name.clone() });
        }

        let mut seen = IndexSet::new();
        let variants: Vec<Variant> = def
            .variants
            .iter()
            .enumerate()
            .map(|(index, variant)| {
                if !seen.insert(variant.name.as_str()) {
                    errors.push(SchemaError::DuplicateVariant { variant: variant.name.clone() });
                }
                read_variant(variant, index, &vars, &roles, &mut errors)
            })
            .collect();

        if !errors.is_empty() {
            tracing::warn!(schema = %def.name, errors = errors.len(), "schema rejected");
            return Err(errors);
        }

        tracing::debug!(schema = %def.name, variants = variants.len(), "schema validated");
        Ok(Self { name: def.name.clone(), vars, roles, params, variants })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> &TypeVars {
        &self.vars
    }

    pub fn roles(&self) -> &RoleVars {
        &self.roles
    }

    /// Ordinary (non-role) type parameters in declaration order.
    pub fn params(&self) -> &[TypeVarId] {
        &self.params
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// The sum type itself, applied to its own parameters.
    pub fn data_type(&self) -> Type {
        Type::reference(
            self.name.clone(),
            self.params.iter().copied().map(Type::Variable).collect(),
        )
    }

    /// The matcher type, before any role is instantiated.
    pub fn visitor_type(&self) -> Type {
        let mut args = Vec::new();
        args.extend(self.roles.self_.map(Type::Variable));
        args.extend(self.params.iter().copied().map(Type::Variable));
        args.push(Type::Variable(self.roles.result));
        args.extend(self.roles.exception.map(Type::Variable));
        Type::reference(format!("{}Visitor", self.name), args)
    }

    pub fn render(&self, ty: &Type) -> String {
        ty.display(&self.vars).to_string()
    }
}

// ------------------------------- Validation ------------------------------- //

fn check_identifier(what: &'static str, name: &str, errors: &mut Vec<SchemaError>) {
    if !IDENTIFIER.is_match(name) {
        errors.push(SchemaError::InvalidIdentifier { what, name: name.to_string() });
    }
}

fn read_type(
    text: &str,
    context: impl FnOnce() -> String,
    vars: &TypeVars,
    errors: &mut Vec<SchemaError>,
) -> Option<Type> {
    match type_expr::parse(text, vars) {
        Ok(ty) => Some(ty),
        Err(error) => {
            errors.push(SchemaError::TypeSyntax {
                context: context(),
                text: text.to_string(),
                message: error.to_string(),
            });
            None
        }
    }
}

fn read_variant(
    def: &VariantDef,
    index: usize,
    vars: &TypeVars,
    roles: &RoleVars,
    errors: &mut Vec<SchemaError>,
) -> Variant {
    check_identifier("a variant name", &def.name, errors);

    let ctx = || format!("the return type of variant `{}`", def.name);
    if let Some(returns) = read_type(&def.returns, ctx, vars, errors) {
        let identity = Bindings::for_roles(roles, &RoleBindings::identity(roles));
        let returns = returns.substitute(&identity);
        if *returns != Type::Variable(roles.result) {
            errors.push(SchemaError::ReturnTypeMismatch {
                variant: def.name.clone(),
                expected: vars.name(roles.result).to_string(),
                found: returns.display(vars).to_string(),
            });
        }
    }

    if def.throws.len() > 1 {
        errors.push(SchemaError::TooManyThrows { variant: def.name.clone(), count: def.throws.len() });
    }
    for text in &def.throws {
        let ctx = || format!("the throws clause of variant `{}`", def.name);
        if let Some(thrown) = read_type(text, ctx, vars, errors) {
            let allowed = roles.exception.map(Type::Variable);
            if allowed.as_ref() != Some(&thrown) {
                errors.push(SchemaError::IllegalThrows {
                    variant: def.name.clone(),
                    found: thrown.display(vars).to_string(),
                });
            }
        }
    }

    let mut names = IndexSet::new();
    let fields = def
        .fields
        .iter()
        .filter_map(|field| {
            check_identifier("a field name", &field.name, errors);
            if !names.insert(field.name.as_str()) {
                errors.push(SchemaError::DuplicateField {
                    variant: def.name.clone(),
                    field: field.name.clone(),
                });
            }
            for tag in field.getter.iter().chain(&field.updater) {
                check_identifier("an accessor name", &tag.name, errors);
            }
            let ctx = || format!("field `{}` of variant `{}`", field.name, def.name);
            let ty = read_type(&field.ty, ctx, vars, errors)?;
            check_field_type(def, field, &ty, vars, roles, errors);
            Some(Field {
                name: field.name.clone(),
                ty,
                nullable: field.nullable,
                getter: field.getter.clone(),
                updater: field.updater.clone(),
            })
        })
        .collect();

    for tag in &def.predicates {
        check_identifier("a predicate name", &tag.name, errors);
    }

    tracing::trace!(variant = %def.name, index, "variant read");
    Variant {
        name: def.name.clone(),
        fields,
        declaration_index: index,
        may_throw: !def.throws.is_empty(),
        predicates: def.predicates.clone(),
    }
}

fn check_field_type(
    variant: &VariantDef,
    field: &FieldDef,
    ty: &Type,
    vars: &TypeVars,
    roles: &RoleVars,
    errors: &mut Vec<SchemaError>,
) {
    if field.nullable && ty.is_primitive() {
        errors.push(SchemaError::NullablePrimitive {
            variant: variant.name.clone(),
            field: field.name.clone(),
            ty: ty.display(vars).to_string(),
        });
    }
    let mut leaf = ty;
    while let Type::Array(element) = leaf {
        leaf = &**element;
    }
    if matches!(leaf, Type::Wildcard { .. }) {
        errors.push(SchemaError::WildcardField {
            variant: variant.name.clone(),
            field: field.name.clone(),
            ty: ty.display(vars).to_string(),
        });
    }
    for role in [Role::Result, Role::Exception] {
        if let Some(var) = roles.get(role).filter(|var| ty.mentions(*var)) {
            errors.push(SchemaError::RoleMisuse {
                variant: variant.name.clone(),
                field: field.name.clone(),
                role,
                name: vars.name(var).to_string(),
            });
        }
    }
}
