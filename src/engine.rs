//! Front API of the engine.
//!
//! Goals:
//! 1) Validate a schema once and read its configurations once.
//! 2) Run nothing when either step reports errors; report all of them.
//! 3) Run each requested deriver against the same validated schema.
//! 4) Derive independent schemas in parallel.

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Configurations;
use crate::derive::{Context, DeriveOptions, accessors, equality, hash, ordering, render};
use crate::error::Error;
use crate::ir::{Operation, OperationKind};
use crate::schema::{SchemaDef, VariantSchema};

/// Everything derived for one schema.
#[derive(Debug, Clone, Serialize)]
pub struct Derivation {
    #[serde(skip)]
    pub schema: VariantSchema,
    pub type_name: String,
    pub options: DeriveOptions,
    pub equals: Option<Operation>,
    pub hash_code: Option<Operation>,
    pub compare_to: Option<Operation>,
    pub to_string: Option<Operation>,
    /// One per variant, declaration order.
    pub factories: Vec<Operation>,
    pub getters: Vec<Operation>,
    pub updaters: Vec<Operation>,
    pub predicates: Vec<Operation>,
    pub configurations: Configurations,
    /// Present when the data type is serializable.
    pub serial_version_uid: Option<i64>,
}

impl Derivation {
    pub fn factory(&self, variant: &str) -> Option<&Operation> {
        self.factories
            .iter()
            .find(|op| matches!(&op.kind, OperationKind::Factory { variant: v } if v == variant))
    }

    pub fn getter(&self, name: &str) -> Option<&Operation> {
        self.getters
            .iter()
            .find(|op| matches!(&op.kind, OperationKind::Getter { name: n } if n == name))
    }

    pub fn updater(&self, name: &str) -> Option<&Operation> {
        self.updaters
            .iter()
            .find(|op| matches!(&op.kind, OperationKind::Updater { name: n } if n == name))
    }

    pub fn predicate(&self, name: &str) -> Option<&Operation> {
        self.predicates
            .iter()
            .find(|op| matches!(&op.kind, OperationKind::Predicate { name: n } if n == name))
    }

    /// Every derived operation, structural ones first.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        [&self.equals, &self.hash_code, &self.compare_to, &self.to_string]
            .into_iter()
            .flatten()
            .chain(&self.factories)
            .chain(&self.getters)
            .chain(&self.updaters)
            .chain(&self.predicates)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: DeriveOptions,
}

impl Engine {
    pub fn new(options: DeriveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Validates `def` and derives every requested operation.
    ///
    /// Configuration errors are only looked for once the schema itself is
    /// valid, so a definition with both kinds of problem reports
    /// [`Error::Schema`] first and [`Error::Config`] on the next run.
    pub fn derive(&self, def: &SchemaDef) -> Result<Derivation, Error> {
        let schema = VariantSchema::build(def).map_err(Error::Schema)?;
        self.derive_schema(schema)
    }

    pub fn derive_schema(&self, schema: VariantSchema) -> Result<Derivation, Error> {
        let configurations = Configurations::read(&schema).map_err(Error::Config)?;
        let options = &self.options;
        let cx = Context::new(&schema);

        let equals = options.equality.then(|| equality::derive(&cx)).transpose()?;
        let hash_code = options
            .hash
            .then(|| hash::derive(&cx, options.hash_code_base))
            .transpose()?;
        let compare_to = options.ordering.then(|| ordering::derive(&cx)).transpose()?;
        let to_string = options.rendering.then(|| render::derive(&cx)).transpose()?;

        let factories = schema
            .variants()
            .iter()
            .map(|variant| accessors::factory(&cx, variant))
            .collect::<Result<Vec<_>, _>>()?;
        let getters = configurations
            .getters
            .values()
            .map(|config| accessors::getter(&cx, config))
            .collect::<Result<Vec<_>, _>>()?;
        let updaters = configurations
            .updaters
            .values()
            .map(|config| accessors::updater(&cx, config))
            .collect::<Result<Vec<_>, _>>()?;
        let predicates = configurations
            .predicates
            .values()
            .map(|config| accessors::predicate(&cx, config))
            .collect();

        let derivation = Derivation {
            type_name: schema.name().to_string(),
            options: options.clone(),
            equals,
            hash_code,
            compare_to,
            to_string,
            factories,
            getters,
            updaters,
            predicates,
            configurations,
            serial_version_uid: options.serializable.then_some(options.serial_version_uid),
            schema,
        };
        tracing::debug!(
            schema = %derivation.type_name,
            operations = derivation.operations().count(),
            "derivation complete"
        );
        Ok(derivation)
    }
}

/// Derives every schema independently, in parallel. Results keep input order.
pub fn derive_all(defs: &[SchemaDef], options: &DeriveOptions) -> Vec<Result<Derivation, Error>> {
    let engine = Engine::new(options.clone());
    defs.par_iter().map(|def| engine.derive(def)).collect()
}
