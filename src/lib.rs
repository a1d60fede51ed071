//! Derivation engine for variant schemas.
//!
//! A schema names a sum type, its variants and their typed fields, plus the
//! special type roles (self, result, exception) its matcher is generic over.
//! The engine validates the schema, reads the getter/updater/predicate
//! configurations declared on it, and derives equality, hashing, ordering,
//! rendering, accessors and factories as operation trees ([`ir`]). The
//! [`eval`] runtime executes those trees.
pub mod config;
pub mod derive;
pub mod engine;
pub mod error;
pub mod eval;
pub mod ir;
pub mod path_de;
pub mod schema;
pub mod types;

#[cfg(test)]
mod prop_tests;

pub use derive::DeriveOptions;
pub use engine::{Derivation, Engine, derive_all};
pub use error::Error;
pub use schema::{SchemaDef, VariantSchema};
