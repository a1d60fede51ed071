// Operation descriptions handed to the code-writer. No syntax lives here.
//
// Every derived method becomes one `Operation`. Its body is a small tree:
// dispatch on a variant, walk fields under a per-field rule, return a literal,
// or fault. Equality and ordering nest a dispatch on `that` inside a dispatch
// on `this`.

use std::fmt;

use serde::Serialize;

use crate::schema::Variant;
use crate::types::{PrimitiveKind, Type};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    Equals,
    HashCode,
    CompareTo,
    ToString,
    Factory { variant: String },
    Getter { name: String },
    Updater { name: String },
    Predicate { name: String },
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Equals => f.write_str("equals"),
            OperationKind::HashCode => f.write_str("hashCode"),
            OperationKind::CompareTo => f.write_str("compareTo"),
            OperationKind::ToString => f.write_str("toString"),
            OperationKind::Factory { variant } => write!(f, "factory {variant}"),
            OperationKind::Getter { name } => write!(f, "getter {name}"),
            OperationKind::Updater { name } => write!(f, "updater {name}"),
            OperationKind::Predicate { name } => write!(f, "predicate {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Matcher type with every role instantiated for this operation.
    pub visitor: Type,
    pub returns: Type,
    pub params: Vec<Param>,
    pub body: Op,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    This,
    That,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lit {
    Bool(bool),
    Int(i32),
}

/// Faults raised by the generated program itself, not by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    NoSuchField { accessor: String, variant: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arm {
    pub variant: usize,
    pub name: String,
    pub body: Op,
}

impl Arm {
    pub fn new(variant: &Variant, body: Op) -> Self {
        Self { variant: variant.declaration_index, name: variant.name.clone(), body }
    }
}

/// How one field (or array element) is compared, hashed or checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    Primitive(PrimitiveKind),
    /// Defer to the value's own contract.
    Delegate,
    /// Branch on null before applying the inner rule.
    Nullable(Box<FieldRule>),
    /// Element-wise under the element rule.
    Array(Box<FieldRule>),
}

impl FieldRule {
    /// True when a null here violates the field's contract.
    pub fn rejects_null(&self) -> bool {
        matches!(self, FieldRule::Delegate | FieldRule::Array(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStep {
    pub field: String,
    pub index: usize,
    /// Field type after role substitution.
    pub ty: Type,
    pub rule: FieldRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Return(Lit),
    Fault(Failure),
    /// Dispatch on the variant of `side`; one arm per variant, declaration order.
    Match { side: Side, arms: Vec<Arm> },
    /// `true` iff every step compares equal; stops at the first mismatch.
    AllEqual(Vec<FieldStep>),
    /// First non-zero step comparison, else 0.
    Lexicographic(Vec<FieldStep>),
    /// `seed`, then `acc * base + term` per hashed term.
    Combine { seed: i32, base: i32, steps: Vec<FieldStep> },
    /// `prefix{f = v, ...}`
    Render { prefix: String, steps: Vec<FieldStep> },
    Read(FieldStep),
    /// Copy of `this` with `target` replaced by the argument.
    Rebuild { variant: usize, target: FieldStep },
    /// New instance of `variant`; params at `checks` must not be null.
    Construct { variant: usize, checks: Vec<usize> },
}

impl Op {
    /// Arms of a `Match`, empty for every other node.
    pub fn arms(&self) -> &[Arm] {
        match self {
            Op::Match { arms, .. } => arms,
            _ => &[],
        }
    }
}
