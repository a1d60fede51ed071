//! Reference runtime: executes derived operations over runtime values.
//!
//! The runtime is what a generated program would do, interpreted directly
//! from the operation trees. Every registered [`Derivation`] contributes its
//! operations; delegation to another data type goes back through the registry,
//! so recursive schemas and schemas that hold each other both work.
pub mod value;

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::derive::{hash, ordering, render};
use crate::engine::Derivation;
use crate::ir::{Failure, FieldRule, FieldStep, Lit, Op, Operation, Side};

pub use value::{Instance, Value};
use value::{check_kind, scalar_compare, scalar_hash, scalar_render};

/// Faults raised by a derived operation at run time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("no such field: {accessor} is not defined for variant {variant}")]
    NoSuchField { accessor: String, variant: String },

    #[error("{operation}: argument `{param}` must not be null")]
    NullArgument { operation: String, param: String },

    #[error("{operation} is not derived for `{type_name}`")]
    NotDerived { operation: String, type_name: String },

    #[error("no derivation registered for `{type_name}`")]
    UnknownType { type_name: String },

    #[error("`{type_name}` has no {what} named `{name}`")]
    UnknownName { type_name: String, what: &'static str, name: String },

    #[error("expected {expected}, found {found}")]
    Shape { expected: String, found: String },

    #[error("{operation} takes {expected} argument(s), {found} given")]
    Arity { operation: String, expected: usize, found: usize },

    #[error("expected a data instance, found {found}")]
    NotAnInstance { found: String },

    #[error("malformed operation {operation}: {message}")]
    Malformed { operation: String, message: String },
}

impl Fault {
    pub(crate) fn shape(expected: &str, found: &Value) -> Self {
        Fault::Shape { expected: expected.to_string(), found: found.kind_name().to_string() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Runtime {
    types: IndexMap<String, Derivation>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, derivation: Derivation) {
        tracing::debug!(schema = %derivation.type_name, "derivation registered");
        self.types.insert(derivation.type_name.clone(), derivation);
    }

    pub fn with(mut self, derivation: Derivation) -> Self {
        self.register(derivation);
        self
    }

    pub fn derivation(&self, type_name: &str) -> Result<&Derivation, Fault> {
        self.types
            .get(type_name)
            .ok_or_else(|| Fault::UnknownType { type_name: type_name.to_string() })
    }

    // ---------------------------- Entry points ---------------------------- //

    pub fn construct(&self, type_name: &str, variant: &str, args: Vec<Value>) -> Result<Value, Fault> {
        let derivation = self.derivation(type_name)?;
        let op = derivation.factory(variant).ok_or_else(|| Fault::UnknownName {
            type_name: type_name.to_string(),
            what: "variant",
            name: variant.to_string(),
        })?;
        if args.len() != op.params.len() {
            return Err(Fault::Arity {
                operation: op.kind.to_string(),
                expected: op.params.len(),
                found: args.len(),
            });
        }
        self.invoke(derivation, op, None, None, &args)
    }

    /// `a.equals(b)`. Anything that is not an instance of `a`'s type is unequal.
    pub fn equals(&self, a: &Value, b: &Value) -> Result<bool, Fault> {
        let this = a.as_instance()?;
        let derivation = self.derivation(&this.type_name)?;
        let op = required(derivation, derivation.equals.as_ref(), "equals")?;
        match b {
            Value::Data(that) if that.type_name == this.type_name => {
                expect_bool(op, self.invoke(derivation, op, Some(this), Some(that.as_ref()), &[])?)
            }
            _ => Ok(false),
        }
    }

    pub fn hash_code(&self, v: &Value) -> Result<i32, Fault> {
        let this = v.as_instance()?;
        let derivation = self.derivation(&this.type_name)?;
        let op = required(derivation, derivation.hash_code.as_ref(), "hashCode")?;
        expect_int(op, self.invoke(derivation, op, Some(this), None, &[])?)
    }

    /// `a.compareTo(b)`, always -1, 0 or 1.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<i32, Fault> {
        let this = a.as_instance()?;
        let that = b.as_instance()?;
        if this.type_name != that.type_name {
            return Err(Fault::Shape {
                expected: this.type_name.clone(),
                found: that.type_name.clone(),
            });
        }
        let derivation = self.derivation(&this.type_name)?;
        let op = required(derivation, derivation.compare_to.as_ref(), "compareTo")?;
        expect_int(op, self.invoke(derivation, op, Some(this), Some(that), &[])?)
    }

    pub fn render(&self, v: &Value) -> Result<String, Fault> {
        let this = v.as_instance()?;
        let derivation = self.derivation(&this.type_name)?;
        let op = required(derivation, derivation.to_string.as_ref(), "toString")?;
        expect_str(op, self.invoke(derivation, op, Some(this), None, &[])?)
    }

    pub fn get(&self, v: &Value, name: &str) -> Result<Value, Fault> {
        let this = v.as_instance()?;
        let derivation = self.derivation(&this.type_name)?;
        let op = named(derivation, derivation.getter(name), "getter", name)?;
        self.invoke(derivation, op, Some(this), None, &[])
    }

    pub fn update(&self, v: &Value, name: &str, value: Value) -> Result<Value, Fault> {
        let this = v.as_instance()?;
        let derivation = self.derivation(&this.type_name)?;
        let op = named(derivation, derivation.updater(name), "updater", name)?;
        self.invoke(derivation, op, Some(this), None, std::slice::from_ref(&value))
    }

    pub fn test(&self, v: &Value, name: &str) -> Result<bool, Fault> {
        let this = v.as_instance()?;
        let derivation = self.derivation(&this.type_name)?;
        let op = named(derivation, derivation.predicate(name), "predicate", name)?;
        expect_bool(op, self.invoke(derivation, op, Some(this), None, &[])?)
    }

    // ----------------------------- Evaluation ----------------------------- //

    fn invoke(
        &self,
        derivation: &Derivation,
        op: &Operation,
        this: Option<&Instance>,
        that: Option<&Instance>,
        args: &[Value],
    ) -> Result<Value, Fault> {
        let frame = Frame { type_name: &derivation.type_name, op, this, that, args };
        self.eval(&frame, &op.body)
    }

    fn eval(&self, frame: &Frame<'_>, op: &Op) -> Result<Value, Fault> {
        match op {
            Op::Return(Lit::Bool(b)) => Ok(Value::Boolean(*b)),
            Op::Return(Lit::Int(n)) => Ok(Value::Int(*n)),
            Op::Fault(Failure::NoSuchField { accessor, variant }) => Err(Fault::NoSuchField {
                accessor: accessor.clone(),
                variant: variant.clone(),
            }),
            Op::Match { side, arms } => {
                let instance = frame.side(*side)?;
                let arm = arms
                    .iter()
                    .find(|arm| arm.variant == instance.variant)
                    .ok_or_else(|| frame.malformed(format!("no arm for variant {}", instance.variant)))?;
                tracing::trace!(operation = %frame.op.kind, ?side, variant = %arm.name, "dispatch");
                self.eval(frame, &arm.body)
            }
            Op::AllEqual(steps) => {
                let (this, that) = (frame.this()?, frame.that()?);
                for step in steps {
                    if !self.rule_equals(&step.rule, frame.field(this, step)?, frame.field(that, step)?)? {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }
            Op::Lexicographic(steps) => {
                let (this, that) = (frame.this()?, frame.that()?);
                for step in steps {
                    let c = self.rule_compare(&step.rule, frame.field(this, step)?, frame.field(that, step)?)?;
                    if c != Ordering::Equal {
                        return Ok(Value::Int(ordering::ordering_to_int(c)));
                    }
                }
                Ok(Value::Int(0))
            }
            Op::Combine { seed, base, steps } => {
                let this = frame.this()?;
                let mut acc = *seed;
                for step in steps {
                    acc = self.fold_hash(&step.rule, *base, acc, frame.field(this, step)?)?;
                }
                Ok(Value::Int(acc))
            }
            Op::Render { prefix, steps } => {
                let this = frame.this()?;
                let fields = steps
                    .iter()
                    .map(|step| {
                        let repr = self.rule_render(&step.rule, frame.field(this, step)?)?;
                        Ok::<_, Fault>((step.field.as_str(), repr))
                    })
                    .collect::<Result<Vec<_>, Fault>>()?;
                Ok(Value::Str(render::assemble(prefix, fields)))
            }
            Op::Read(step) => Ok(frame.field(frame.this()?, step)?.clone()),
            Op::Rebuild { variant, target } => {
                let this = frame.this()?;
                let value = frame.arg(0)?;
                if value.is_null() && target.rule.rejects_null() {
                    return Err(Fault::NullArgument {
                        operation: frame.op.kind.to_string(),
                        param: target.field.clone(),
                    });
                }
                let mut fields = this.fields.clone();
                let slot = fields
                    .get_mut(target.index)
                    .ok_or_else(|| frame.malformed(format!("no field at position {}", target.index)))?;
                *slot = value.clone();
                Ok(Value::Data(Arc::new(Instance {
                    type_name: this.type_name.clone(),
                    variant: *variant,
                    fields,
                })))
            }
            Op::Construct { variant, checks } => {
                for &index in checks {
                    if frame.arg(index)?.is_null() {
                        let param = frame
                            .op
                            .params
                            .get(index)
                            .map_or_else(|| index.to_string(), |p| p.name.clone());
                        return Err(Fault::NullArgument { operation: frame.op.kind.to_string(), param });
                    }
                }
                Ok(Value::Data(Arc::new(Instance {
                    type_name: frame.type_name.to_string(),
                    variant: *variant,
                    fields: frame.args.to_vec(),
                })))
            }
        }
    }

    // ------------------------------ Field rules ---------------------------- //

    fn rule_equals(&self, rule: &FieldRule, a: &Value, b: &Value) -> Result<bool, Fault> {
        match rule {
            FieldRule::Primitive(kind) => {
                check_kind(*kind, a)?;
                check_kind(*kind, b)?;
                Ok(scalar_compare(a, b) == Some(Ordering::Equal))
            }
            FieldRule::Delegate => self.delegate_equals(a, b),
            FieldRule::Nullable(inner) => match (a.is_null(), b.is_null()) {
                (true, true) => Ok(true),
                (false, false) => self.rule_equals(inner, a, b),
                _ => Ok(false),
            },
            FieldRule::Array(inner) => self.elements_equal(inner, a.as_array()?, b.as_array()?),
        }
    }

    fn elements_equal(&self, rule: &FieldRule, xs: &[Value], ys: &[Value]) -> Result<bool, Fault> {
        if xs.len() != ys.len() {
            return Ok(false);
        }
        for (x, y) in xs.iter().zip(ys) {
            if !self.rule_equals(rule, x, y)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn rule_compare(&self, rule: &FieldRule, a: &Value, b: &Value) -> Result<Ordering, Fault> {
        match rule {
            FieldRule::Primitive(kind) => {
                check_kind(*kind, a)?;
                check_kind(*kind, b)?;
                scalar_compare(a, b).ok_or_else(|| Fault::shape(kind.keyword(), b))
            }
            FieldRule::Delegate => self.delegate_compare(a, b),
            FieldRule::Nullable(inner) => match (a.is_null(), b.is_null()) {
                (true, true) => Ok(Ordering::Equal),
                (true, false) => Ok(Ordering::Less),
                (false, true) => Ok(Ordering::Greater),
                (false, false) => self.rule_compare(inner, a, b),
            },
            FieldRule::Array(inner) => self.elements_compare(inner, a.as_array()?, b.as_array()?),
        }
    }

    /// Shared prefix first, then the shorter array sorts first.
    fn elements_compare(&self, rule: &FieldRule, xs: &[Value], ys: &[Value]) -> Result<Ordering, Fault> {
        for (x, y) in xs.iter().zip(ys) {
            let c = self.rule_compare(rule, x, y)?;
            if c != Ordering::Equal {
                return Ok(c);
            }
        }
        Ok(xs.len().cmp(&ys.len()))
    }

    /// Folds `v` into `acc`. Arrays contribute one term per element.
    fn fold_hash(&self, rule: &FieldRule, base: i32, acc: i32, v: &Value) -> Result<i32, Fault> {
        match rule {
            FieldRule::Primitive(kind) => {
                check_kind(*kind, v)?;
                let term = scalar_hash(v, false).ok_or_else(|| Fault::shape(kind.keyword(), v))?;
                Ok(hash::combine(acc, base, term))
            }
            FieldRule::Delegate => Ok(hash::combine(acc, base, self.delegate_hash(v)?)),
            FieldRule::Nullable(_) if v.is_null() => Ok(hash::combine(acc, base, 0)),
            FieldRule::Nullable(inner) => self.fold_hash(inner, base, acc, v),
            FieldRule::Array(inner) => v
                .as_array()?
                .iter()
                .try_fold(acc, |acc, element| self.fold_hash(inner, base, acc, element)),
        }
    }

    fn rule_render(&self, rule: &FieldRule, v: &Value) -> Result<String, Fault> {
        match rule {
            FieldRule::Nullable(_) if v.is_null() => Ok("null".to_string()),
            FieldRule::Nullable(inner) => self.rule_render(inner, v),
            FieldRule::Array(inner) => {
                let items = v
                    .as_array()?
                    .iter()
                    .map(|element| self.rule_render(inner, element))
                    .collect::<Result<Vec<_>, Fault>>()?;
                Ok(format!("[{}]", items.join(", ")))
            }
            FieldRule::Primitive(kind) => {
                check_kind(*kind, v)?;
                scalar_render(v).ok_or_else(|| Fault::shape(kind.keyword(), v))
            }
            FieldRule::Delegate => self.delegate_render(v),
        }
    }

    // ------------------------------ Delegation ----------------------------- //

    fn delegate_equals(&self, a: &Value, b: &Value) -> Result<bool, Fault> {
        match (a, b) {
            (Value::Null, _) => Err(Fault::shape("non-null value", a)),
            (_, Value::Null) => Ok(false),
            (Value::Data(x), Value::Data(y)) => {
                if x.type_name != y.type_name {
                    return Ok(false);
                }
                let derivation = self.derivation(&x.type_name)?;
                match &derivation.equals {
                    Some(op) => expect_bool(op, self.invoke(derivation, op, Some(x.as_ref()), Some(y.as_ref()), &[])?),
                    None => Ok(Arc::ptr_eq(x, y)),
                }
            }
            (Value::Array(xs), Value::Array(ys)) => self.elements_equal(&boxed_element(), xs, ys),
            _ => Ok(scalar_compare(a, b) == Some(Ordering::Equal)),
        }
    }

    fn delegate_hash(&self, v: &Value) -> Result<i32, Fault> {
        match v {
            Value::Null => Err(Fault::shape("non-null value", v)),
            Value::Data(x) => {
                let derivation = self.derivation(&x.type_name)?;
                let op = required(derivation, derivation.hash_code.as_ref(), "hashCode")?;
                expect_int(op, self.invoke(derivation, op, Some(x.as_ref()), None, &[])?)
            }
            Value::Array(items) => items.iter().try_fold(1i32, |acc, element| {
                let term = if element.is_null() { 0 } else { self.delegate_hash(element)? };
                Ok(hash::combine(acc, 31, term))
            }),
            _ => scalar_hash(v, true).ok_or_else(|| Fault::shape("hashable value", v)),
        }
    }

    fn delegate_compare(&self, a: &Value, b: &Value) -> Result<Ordering, Fault> {
        match (a, b) {
            (Value::Null, _) | (_, Value::Null) => Err(Fault::shape("non-null value", &Value::Null)),
            (Value::Data(x), Value::Data(y)) => {
                if x.type_name != y.type_name {
                    return Err(Fault::Shape { expected: x.type_name.clone(), found: y.type_name.clone() });
                }
                let derivation = self.derivation(&x.type_name)?;
                let op = required(derivation, derivation.compare_to.as_ref(), "compareTo")?;
                let c = expect_int(op, self.invoke(derivation, op, Some(x.as_ref()), Some(y.as_ref()), &[])?)?;
                Ok(c.cmp(&0))
            }
            (Value::Array(xs), Value::Array(ys)) => self.elements_compare(&boxed_element(), xs, ys),
            _ => scalar_compare(a, b).ok_or_else(|| Fault::shape(a.kind_name(), b)),
        }
    }

    fn delegate_render(&self, v: &Value) -> Result<String, Fault> {
        match v {
            Value::Data(x) => {
                let derivation = self.derivation(&x.type_name)?;
                let op = required(derivation, derivation.to_string.as_ref(), "toString")?;
                expect_str(op, self.invoke(derivation, op, Some(x.as_ref()), None, &[])?)
            }
            Value::Array(_) => self.rule_render(&FieldRule::Array(Box::new(boxed_element())), v),
            _ => scalar_render(v).ok_or_else(|| Fault::shape("printable value", v)),
        }
    }
}

/// Element rule of an array reached through delegation.
fn boxed_element() -> FieldRule {
    FieldRule::Nullable(Box::new(FieldRule::Delegate))
}

struct Frame<'a> {
    type_name: &'a str,
    op: &'a Operation,
    this: Option<&'a Instance>,
    that: Option<&'a Instance>,
    args: &'a [Value],
}

impl<'a> Frame<'a> {
    fn side(&self, side: Side) -> Result<&'a Instance, Fault> {
        match side {
            Side::This => self.this(),
            Side::That => self.that(),
        }
    }

    fn this(&self) -> Result<&'a Instance, Fault> {
        self.this.ok_or_else(|| self.malformed("no receiver"))
    }

    fn that(&self) -> Result<&'a Instance, Fault> {
        self.that.ok_or_else(|| self.malformed("no argument instance"))
    }

    fn field(&self, instance: &'a Instance, step: &FieldStep) -> Result<&'a Value, Fault> {
        instance
            .fields
            .get(step.index)
            .ok_or_else(|| self.malformed(format!("no field `{}` at position {}", step.field, step.index)))
    }

    fn arg(&self, index: usize) -> Result<&'a Value, Fault> {
        self.args.get(index).ok_or_else(|| Fault::Arity {
            operation: self.op.kind.to_string(),
            expected: self.op.params.len(),
            found: self.args.len(),
        })
    }

    fn malformed(&self, message: impl Into<String>) -> Fault {
        Fault::Malformed { operation: self.op.kind.to_string(), message: message.into() }
    }
}

fn required<'d>(derivation: &Derivation, op: Option<&'d Operation>, operation: &str) -> Result<&'d Operation, Fault> {
    op.ok_or_else(|| Fault::NotDerived {
        operation: operation.to_string(),
        type_name: derivation.type_name.clone(),
    })
}

fn named<'d>(
    derivation: &Derivation,
    op: Option<&'d Operation>,
    what: &'static str,
    name: &str,
) -> Result<&'d Operation, Fault> {
    op.ok_or_else(|| Fault::UnknownName {
        type_name: derivation.type_name.clone(),
        what,
        name: name.to_string(),
    })
}

fn expect_bool(op: &Operation, v: Value) -> Result<bool, Fault> {
    match v {
        Value::Boolean(b) => Ok(b),
        other => Err(unexpected(op, "boolean", &other)),
    }
}

fn expect_int(op: &Operation, v: Value) -> Result<i32, Fault> {
    match v {
        Value::Int(n) => Ok(n),
        other => Err(unexpected(op, "int", &other)),
    }
}

fn expect_str(op: &Operation, v: Value) -> Result<String, Fault> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(unexpected(op, "String", &other)),
    }
}

fn unexpected(op: &Operation, expected: &str, found: &Value) -> Fault {
    Fault::Malformed {
        operation: op.kind.to_string(),
        message: format!("produced {} where {expected} was expected", found.kind_name()),
    }
}
