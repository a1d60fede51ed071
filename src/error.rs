//! Error types for every stage of the engine.
//!
//! Validation and configuration errors are collected, never short-circuited,
//! so a single pass reports everything wrong with a schema. Derivation errors
//! are contract faults in the caller and stop at the first one.

use std::fmt;

use thiserror::Error;

use crate::config::AccessorKind;
use crate::schema::Access;
use crate::types::Role;

// ------------------------------- Validation ------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema `{schema}` declares no variants")]
    NoVariants { schema: String },

    #[error("`{name}` is not a valid identifier for {what}")]
    InvalidIdentifier { what: &'static str, name: String },

    #[error("type variable `{name}` is declared as {first} and again as {second}")]
    RoleConflict { name: String, first: String, second: String },

    #[error("variant `{variant}` is declared more than once")]
    DuplicateVariant { variant: String },

    #[error("field `{field}` is declared more than once in variant `{variant}`")]
    DuplicateField { variant: String, field: String },

    #[error("field `{field}` of variant `{variant}` has primitive type `{ty}` and cannot be nullable")]
    NullablePrimitive { variant: String, field: String, ty: String },

    #[error("variant `{variant}` must return the result type `{expected}`, found `{found}`")]
    ReturnTypeMismatch { variant: String, expected: String, found: String },

    #[error("variant `{variant}` declares {count} thrown types, at most one is allowed")]
    TooManyThrows { variant: String, count: usize },

    #[error("variant `{variant}` may only throw the exception type variable, found `{found}`")]
    IllegalThrows { variant: String, found: String },

    #[error("field `{field}` of variant `{variant}` mentions the {role} type variable `{name}`")]
    RoleMisuse { variant: String, field: String, role: Role, name: String },

    #[error("field `{field}` of variant `{variant}` has wildcard type `{ty}`")]
    WildcardField { variant: String, field: String, ty: String },

    #[error("cannot read type `{text}` in {context}: {message}")]
    TypeSyntax { context: String, text: String, message: String },
}

// ----------------------------- Configuration ------------------------------ //

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{kind} `{name}` has type `{expected}` in variant `{first_variant}` but `{found}` in variant `{variant}`")]
    TypeMismatch {
        kind: AccessorKind,
        name: String,
        first_variant: String,
        expected: String,
        variant: String,
        found: String,
    },

    #[error("{kind} `{name}` has inconsistent nullability in variant `{variant}`")]
    NullabilityMismatch { kind: AccessorKind, name: String, variant: String },

    #[error("{kind} `{name}` is declared {expected} but {found} in variant `{variant}`")]
    AccessMismatch {
        kind: AccessorKind,
        name: String,
        variant: String,
        expected: Access,
        found: Access,
    },

    #[error("{kind} `{name}` maps both `{first}` and `{second}` in variant `{variant}`")]
    AmbiguousField {
        kind: AccessorKind,
        name: String,
        variant: String,
        first: String,
        second: String,
    },

    #[error("`{name}` is used both as a getter and as a predicate")]
    NameClash { name: String },
}

impl ConfigError {
    /// Public name of the configuration the error is attributed to.
    pub fn name(&self) -> &str {
        match self {
            ConfigError::TypeMismatch { name, .. }
            | ConfigError::NullabilityMismatch { name, .. }
            | ConfigError::AccessMismatch { name, .. }
            | ConfigError::AmbiguousField { name, .. }
            | ConfigError::NameClash { name } => name,
        }
    }
}

// ------------------------------- Derivation ------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("{operation}: field `{field}` still mentions the {role} type variable after substitution")]
    UnboundRole { operation: String, field: String, role: Role },

    #[error("{operation}: field `{field}` has unsupported type shape `{ty}`")]
    UnsupportedShape { operation: String, field: String, ty: String },

    #[error("{operation}: variant `{variant}` has no field at position {index}")]
    UnknownField { operation: String, variant: String, index: usize },
}

// --------------------------------- Loading -------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at JSON path {path}: {message}")]
pub struct LoadError {
    pub path: String,
    pub message: String,
}

// --------------------------------- Engine --------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{} schema error(s): {}", .0.len(), join_messages(.0))]
    Schema(Vec<SchemaError>),

    #[error("{} configuration error(s): {}", .0.len(), join_messages(.0))]
    Config(Vec<ConfigError>),

    #[error(transparent)]
    Derive(#[from] DeriveError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl Error {
    /// Every individual message, one per collected error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Error::Schema(errors) => errors.iter().map(ToString::to_string).collect(),
            Error::Config(errors) => errors.iter().map(ToString::to_string).collect(),
            Error::Derive(error) => vec![error.to_string()],
            Error::Load(error) => vec![error.to_string()],
        }
    }
}

fn join_messages<E: fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
