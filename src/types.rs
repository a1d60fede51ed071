//! Type model for variant schemas.
//!
//! Types are immutable values shared freely between the schema, the derivers
//! and the operation descriptions they produce. Type variables are handles
//! into a per-schema arena (`TypeVars`) and compare by slot, never by name:
//! two variables both spelled `T` but declared separately are different.
pub mod subst;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub use subst::{Bindings, RoleBindings, substitute};

// ------------------------------ Identifiers ------------------------------- //

/// Handle to one declared type-variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeVarId(pub u32);

/// Fixed meaning a type variable plays across every variant of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The data type itself.
    SelfType,
    /// What a matcher returns.
    Result,
    /// What a matcher may throw.
    Exception,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SelfType => "self",
            Role::Result => "result",
            Role::Exception => "exception",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role-playing variables of one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleVars {
    pub self_: Option<TypeVarId>,
    pub result: TypeVarId,
    pub exception: Option<TypeVarId>,
}

impl RoleVars {
    pub fn get(&self, role: Role) -> Option<TypeVarId> {
        match role {
            Role::SelfType => self.self_,
            Role::Result => Some(self.result),
            Role::Exception => self.exception,
        }
    }
}

// ------------------------------- Primitives ------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.keyword() == s)
    }

    /// Name of the reference type a primitive boxes into.
    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::Char => "Character",
            PrimitiveKind::Int => "Integer",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Double => "Double",
        }
    }
}

// --------------------------------- Types ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardMode {
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Primitive(PrimitiveKind),
    Array(Box<Type>),
    Reference { name: String, args: Vec<Type> },
    Variable(TypeVarId),
    Wildcard { bound: Box<Type>, mode: WildcardMode },
}

impl Type {
    pub fn reference(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Reference { name: name.into(), args }
    }

    /// Reference type with no arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self::reference(name, Vec::new())
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn wildcard(mode: WildcardMode, bound: Type) -> Self {
        Type::Wildcard { bound: Box::new(bound), mode }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    /// Primitives become their wrapper reference; everything else is kept.
    pub fn boxed(&self) -> Type {
        match self {
            Type::Primitive(kind) => Type::named(kind.boxed_name()),
            other => other.clone(),
        }
    }

    pub fn mentions(&self, var: TypeVarId) -> bool {
        match self {
            Type::Variable(v) => *v == var,
            Type::Array(element) => element.mentions(var),
            Type::Wildcard { bound, .. } => bound.mentions(var),
            Type::Reference { args, .. } => args.iter().any(|a| a.mentions(var)),
            Type::Primitive(_) => false,
        }
    }

    /// Every variable occurring anywhere in the type.
    pub fn variables(&self) -> BTreeSet<TypeVarId> {
        fn collect(ty: &Type, out: &mut BTreeSet<TypeVarId>) {
            match ty {
                Type::Variable(v) => {
                    out.insert(*v);
                }
                Type::Array(element) => collect(element, out),
                Type::Wildcard { bound, .. } => collect(bound, out),
                Type::Reference { args, .. } => {
                    for a in args {
                        collect(a, out);
                    }
                }
                Type::Primitive(_) => {}
            }
        }
        let mut out = BTreeSet::new();
        collect(self, &mut out);
        out
    }

    pub fn substitute<'a>(&'a self, bindings: &Bindings) -> std::borrow::Cow<'a, Type> {
        substitute(self, bindings)
    }

    /// Render with variable names looked up in `vars`.
    pub fn display<'a>(&'a self, vars: &'a TypeVars) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, vars }
    }
}

pub struct TypeDisplay<'a> {
    ty: &'a Type,
    vars: &'a TypeVars,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Primitive(kind) => f.write_str(kind.keyword()),
            Type::Array(element) => write!(f, "{}[]", element.display(self.vars)),
            Type::Reference { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", a.display(self.vars))?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::Variable(var) => f.write_str(self.vars.name(*var)),
            Type::Wildcard { bound, mode } => match mode {
                WildcardMode::Extends => write!(f, "? extends {}", bound.display(self.vars)),
                WildcardMode::Super => write!(f, "? super {}", bound.display(self.vars)),
            },
        }
    }
}

// ------------------------------ Variable arena ---------------------------- //

#[derive(Debug, Clone)]
struct VarSlot {
    name: String,
    role: Option<Role>,
}

/// Arena of declared type variables. A slot's role is fixed at declaration.
#[derive(Debug, Clone, Default)]
pub struct TypeVars {
    slots: Vec<VarSlot>,
}

impl TypeVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, role: Option<Role>) -> TypeVarId {
        let id = TypeVarId(self.slots.len() as u32);
        self.slots.push(VarSlot { name: name.into(), role });
        id
    }

    pub fn name(&self, var: TypeVarId) -> &str {
        self.slots
            .get(var.0 as usize)
            .map(|slot| slot.name.as_str())
            .unwrap_or("?")
    }

    pub fn role(&self, var: TypeVarId) -> Option<Role> {
        self.slots.get(var.0 as usize).and_then(|slot| slot.role)
    }

    /// First slot declared under `name`.
    pub fn lookup(&self, name: &str) -> Option<TypeVarId> {
        self.slots
            .iter()
            .position(|slot| slot.name == name)
            .map(|i| TypeVarId(i as u32))
    }
}
