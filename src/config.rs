//! Field configurations: getters, updaters and predicates grouped by public name.
//!
//! Reading is a pure fold over the schema. Each tagged field either seeds a
//! new configuration or merges into the one already registered under the same
//! public name. Conflicts are collected and attributed to the name; nothing
//! stops at the first one.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::error::ConfigError;
use crate::schema::{Access, AccessorTag, Field, Variant, VariantSchema};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    Getter,
    Updater,
    Predicate,
}

impl fmt::Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessorKind::Getter => "getter",
            AccessorKind::Updater => "updater",
            AccessorKind::Predicate => "predicate",
        })
    }
}

/// Where a configuration reads from in one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSlot {
    pub field: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConfiguration {
    pub public_name: String,
    pub ty: Type,
    pub nullable: bool,
    pub access: Access,
    /// variant name -> field
    pub per_variant: IndexMap<String, FieldSlot>,
}

impl FieldConfiguration {
    pub fn slot(&self, variant: &str) -> Option<&FieldSlot> {
        self.per_variant.get(variant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateConfiguration {
    pub public_name: String,
    pub access: Access,
    pub true_for_variants: IndexSet<String>,
}

impl PredicateConfiguration {
    pub fn holds_for(&self, variant: &str) -> bool {
        self.true_for_variants.contains(variant)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Configurations {
    pub getters: IndexMap<String, FieldConfiguration>,
    pub updaters: IndexMap<String, FieldConfiguration>,
    pub predicates: IndexMap<String, PredicateConfiguration>,
}

impl Configurations {
    pub fn read(schema: &VariantSchema) -> Result<Self, Vec<ConfigError>> {
        schema
            .variants()
            .iter()
            .fold(Reader::new(schema), Reader::variant)
            .finish()
    }
}

// --------------------------------- Reader --------------------------------- //

struct Reader<'s> {
    schema: &'s VariantSchema,
    out: Configurations,
    errors: Vec<ConfigError>,
}

impl<'s> Reader<'s> {
    fn new(schema: &'s VariantSchema) -> Self {
        Self { schema, out: Configurations::default(), errors: Vec::new() }
    }

    fn variant(self, variant: &Variant) -> Self {
        let reader = variant.fields.iter().enumerate().fold(self, |reader, (index, field)| {
            let reader = match &field.getter {
                Some(tag) => reader.field(AccessorKind::Getter, variant, index, field, tag),
                None => reader,
            };
            match &field.updater {
                Some(tag) => reader.field(AccessorKind::Updater, variant, index, field, tag),
                None => reader,
            }
        });
        variant
            .predicates
            .iter()
            .fold(reader, |reader, tag| reader.predicate(variant, tag))
    }

    fn field(
        mut self,
        kind: AccessorKind,
        variant: &Variant,
        index: usize,
        field: &Field,
        tag: &AccessorTag,
    ) -> Self {
        let slot = FieldSlot { field: field.name.clone(), index };
        let configs = match kind {
            AccessorKind::Getter => &mut self.out.getters,
            _ => &mut self.out.updaters,
        };

        let Some(existing) = configs.get_mut(&tag.name) else {
            configs.insert(
                tag.name.clone(),
                FieldConfiguration {
                    public_name: tag.name.clone(),
                    ty: field.ty.clone(),
                    nullable: field.nullable,
                    access: tag.access,
                    per_variant: IndexMap::from([(variant.name.clone(), slot)]),
                },
            );
            return self;
        };

        let mut consistent = true;
        if existing.ty != field.ty {
            consistent = false;
            self.errors.push(ConfigError::TypeMismatch {
                kind,
                name: tag.name.clone(),
                first_variant: existing.per_variant.keys().next().cloned().unwrap_or_default(),
                expected: self.schema.render(&existing.ty),
                variant: variant.name.clone(),
                found: self.schema.render(&field.ty),
            });
        } else if existing.nullable != field.nullable {
            consistent = false;
            self.errors.push(ConfigError::NullabilityMismatch {
                kind,
                name: tag.name.clone(),
                variant: variant.name.clone(),
            });
        }
        if existing.access != tag.access {
            self.errors.push(ConfigError::AccessMismatch {
                kind,
                name: tag.name.clone(),
                variant: variant.name.clone(),
                expected: existing.access,
                found: tag.access,
            });
        }
        match existing.per_variant.get(&variant.name) {
            Some(first) => {
                self.errors.push(ConfigError::AmbiguousField {
                    kind,
                    name: tag.name.clone(),
                    variant: variant.name.clone(),
                    first: first.field.clone(),
                    second: field.name.clone(),
                });
            }
            None if consistent => {
                existing.per_variant.insert(variant.name.clone(), slot);
            }
            None => {}
        }
        self
    }

    fn predicate(mut self, variant: &Variant, tag: &AccessorTag) -> Self {
        match self.out.predicates.get_mut(&tag.name) {
            None => {
                self.out.predicates.insert(
                    tag.name.clone(),
                    PredicateConfiguration {
                        public_name: tag.name.clone(),
                        access: tag.access,
                        true_for_variants: IndexSet::from([variant.name.clone()]),
                    },
                );
            }
            Some(existing) => {
                if existing.access != tag.access {
                    self.errors.push(ConfigError::AccessMismatch {
                        kind: AccessorKind::Predicate,
                        name: tag.name.clone(),
                        variant: variant.name.clone(),
                        expected: existing.access,
                        found: tag.access,
                    });
                }
                existing.true_for_variants.insert(variant.name.clone());
            }
        }
        self
    }

    fn finish(mut self) -> Result<Configurations, Vec<ConfigError>> {
        for name in self.out.getters.keys() {
            if self.out.predicates.contains_key(name) {
                self.errors.push(ConfigError::NameClash { name: name.clone() });
            }
        }
        if !self.errors.is_empty() {
            tracing::warn!(
                schema = %self.schema.name(),
                errors = self.errors.len(),
                "field configurations rejected"
            );
            return Err(self.errors);
        }
        tracing::debug!(
            schema = %self.schema.name(),
            getters = self.out.getters.len(),
            updaters = self.out.updaters.len(),
            predicates = self.out.predicates.len(),
            "field configurations read"
        );
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, SchemaDef, VariantDef};

    fn read(def: SchemaDef) -> Result<Configurations, Vec<ConfigError>> {
        Configurations::read(&VariantSchema::build(&def).unwrap())
    }

    #[test]
    fn merges_getters_across_variants() {
        let def = SchemaDef::new("Shape", "R")
            .with_variant(
                VariantDef::new("Circle", "R")
                    .with_field(FieldDef::new("radius", "double"))
                    .with_field(FieldDef::new("label", "String").with_getter(AccessorTag::public("label"))),
            )
            .with_variant(VariantDef::new("Dot", "R"))
            .with_variant(
                VariantDef::new("Square", "R")
                    .with_field(FieldDef::new("name", "String").with_getter(AccessorTag::public("label")))
                    .with_predicate(AccessorTag::public("isSquare")),
            );
        let configs = read(def).unwrap();
        let label = &configs.getters["label"];
        assert_eq!(label.ty, Type::named("String"));
        assert_eq!(label.slot("Circle"), Some(&FieldSlot { field: "label".into(), index: 1 }));
        assert_eq!(label.slot("Square"), Some(&FieldSlot { field: "name".into(), index: 0 }));
        assert_eq!(label.slot("Dot"), None);
        assert!(configs.predicates["isSquare"].holds_for("Square"));
        assert!(!configs.predicates["isSquare"].holds_for("Circle"));
    }

    #[test]
    fn differing_types_under_one_name_are_rejected() {
        let def = SchemaDef::new("Outcome", "R")
            .with_param("T")
            .with_variant(
                VariantDef::new("Ok", "R")
                    .with_field(FieldDef::new("payload", "T").with_getter(AccessorTag::public("value"))),
            )
            .with_variant(
                VariantDef::new("Err", "R")
                    .with_field(FieldDef::new("payload", "String").with_getter(AccessorTag::public("value"))),
            );
        let errors = read(def).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name(), "value");
        assert_eq!(
            errors[0],
            ConfigError::TypeMismatch {
                kind: AccessorKind::Getter,
                name: "value".into(),
                first_variant: "Ok".into(),
                expected: "T".into(),
                variant: "Err".into(),
                found: "String".into(),
            }
        );
    }

    #[test]
    fn two_fields_of_one_variant_under_one_name_are_ambiguous() {
        let def = SchemaDef::new("Pair", "R").with_variant(
            VariantDef::new("Pair", "R")
                .with_field(FieldDef::new("left", "int").with_updater(AccessorTag::public("side")))
                .with_field(FieldDef::new("right", "int").with_updater(AccessorTag::public("side"))),
        );
        let errors = read(def).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigError::AmbiguousField {
                kind: AccessorKind::Updater,
                name: "side".into(),
                variant: "Pair".into(),
                first: "left".into(),
                second: "right".into(),
            }]
        );
    }

    #[test]
    fn collects_access_nullability_and_clash_errors() {
        let private = AccessorTag { name: "isA".into(), access: Access::Private };
        let def = SchemaDef::new("T", "R")
            .with_variant(
                VariantDef::new("A", "R")
                    .with_field(FieldDef::new("x", "String").nullable().with_getter(AccessorTag::public("x")))
                    .with_field(FieldDef::new("y", "int").with_getter(AccessorTag::public("isA")))
                    .with_predicate(AccessorTag::public("isA")),
            )
            .with_variant(
                VariantDef::new("B", "R")
                    .with_field(FieldDef::new("x", "String").with_getter(AccessorTag::public("x")))
                    .with_predicate(private),
            );
        let errors = read(def).unwrap_err();
        assert!(errors.contains(&ConfigError::NullabilityMismatch {
            kind: AccessorKind::Getter,
            name: "x".into(),
            variant: "B".into(),
        }));
        assert!(errors.contains(&ConfigError::AccessMismatch {
            kind: AccessorKind::Predicate,
            name: "isA".into(),
            variant: "B".into(),
            expected: Access::Public,
            found: Access::Private,
        }));
        assert!(errors.contains(&ConfigError::NameClash { name: "isA".into() }));
        assert_eq!(errors.len(), 3);
    }
}
