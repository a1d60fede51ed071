//! Role-aware substitution over the type grammar.
//!
//! Substitution is a single structural pass: bound types are spliced in as
//! they are and never substituted again, so no cycle can arise. Subtrees that
//! contain nothing to substitute come back borrowed.

use std::borrow::Cow;

use super::{RoleVars, Type, TypeVarId};

/// Concrete types for the three special roles of one derived operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleBindings {
    pub self_: Option<Type>,
    pub result: Type,
    pub exception: Option<Type>,
}

impl RoleBindings {
    pub fn new(result: Type) -> Self {
        Self { self_: None, result, exception: None }
    }

    pub fn with_self(mut self, ty: Type) -> Self {
        self.self_ = Some(ty);
        self
    }

    pub fn with_exception(mut self, ty: Type) -> Self {
        self.exception = Some(ty);
        self
    }

    /// Every role bound to its own variable.
    pub fn identity(roles: &RoleVars) -> Self {
        Self {
            self_: roles.self_.map(Type::Variable),
            result: Type::Variable(roles.result),
            exception: roles.exception.map(Type::Variable),
        }
    }
}

/// Variable-to-type map consulted by `substitute`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    slots: Vec<(TypeVarId, Type)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var` to `ty`, replacing any earlier binding.
    /// A variable bound to itself is dropped: it is never substituted.
    pub fn bind(mut self, var: TypeVarId, ty: Type) -> Self {
        if ty == Type::Variable(var) {
            self.slots.retain(|(v, _)| *v != var);
            return self;
        }
        match self.slots.iter_mut().find(|(v, _)| *v == var) {
            Some(slot) => slot.1 = ty,
            None => self.slots.push((var, ty)),
        }
        self
    }

    pub fn for_roles(roles: &RoleVars, bindings: &RoleBindings) -> Self {
        let mut out = Self::new().bind(roles.result, bindings.result.clone());
        if let (Some(var), Some(ty)) = (roles.self_, &bindings.self_) {
            out = out.bind(var, ty.clone());
        }
        if let (Some(var), Some(ty)) = (roles.exception, &bindings.exception) {
            out = out.bind(var, ty.clone());
        }
        out
    }

    /// Bind ordinary parameters positionally; extra entries on either side are ignored.
    pub fn with_params(self, params: &[TypeVarId], args: &[Type]) -> Self {
        params
            .iter()
            .zip(args)
            .fold(self, |out, (var, ty)| out.bind(*var, ty.clone()))
    }

    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.slots.iter().find(|(v, _)| *v == var).map(|(_, ty)| ty)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub fn substitute<'a>(ty: &'a Type, bindings: &Bindings) -> Cow<'a, Type> {
    match ty {
        Type::Variable(var) => match bindings.get(*var) {
            Some(bound) => Cow::Owned(bound.clone()),
            None => Cow::Borrowed(ty),
        },
        Type::Array(element) => match substitute(element, bindings) {
            Cow::Borrowed(_) => Cow::Borrowed(ty),
            Cow::Owned(element) => Cow::Owned(Type::Array(Box::new(element))),
        },
        Type::Wildcard { bound, mode } => match substitute(bound, bindings) {
            Cow::Borrowed(_) => Cow::Borrowed(ty),
            Cow::Owned(bound) => Cow::Owned(Type::Wildcard { bound: Box::new(bound), mode: *mode }),
        },
        Type::Reference { name, args } if !args.is_empty() => {
            let args: Vec<Cow<'a, Type>> = args.iter().map(|a| substitute(a, bindings)).collect();
            if args.iter().all(|a| matches!(a, Cow::Borrowed(_))) {
                return Cow::Borrowed(ty);
            }
            Cow::Owned(Type::Reference {
                name: name.clone(),
                args: args.into_iter().map(Cow::into_owned).collect(),
            })
        }
        _ => Cow::Borrowed(ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrimitiveKind, Role, TypeVars, WildcardMode};

    fn roles(vars: &mut TypeVars) -> RoleVars {
        RoleVars {
            self_: Some(vars.declare("S", Some(Role::SelfType))),
            result: vars.declare("R", Some(Role::Result)),
            exception: Some(vars.declare("E", Some(Role::Exception))),
        }
    }

    #[test]
    fn roles_substitute_through_arrays_and_wildcards() {
        let mut vars = TypeVars::new();
        let roles = roles(&mut vars);
        let s = Type::reference("Tree", vec![Type::named("String")]);
        let bindings = Bindings::for_roles(
            &roles,
            &RoleBindings::new(Type::named("Integer"))
                .with_self(s.clone())
                .with_exception(Type::named("RuntimeException")),
        );

        let ty = Type::array(Type::wildcard(
            WildcardMode::Extends,
            Type::Variable(roles.self_.unwrap()),
        ));
        let out = substitute(&ty, &bindings);
        assert_eq!(*out, Type::array(Type::wildcard(WildcardMode::Extends, s)));
    }

    #[test]
    fn nested_generic_arguments_are_rewritten() {
        let mut vars = TypeVars::new();
        let roles = roles(&mut vars);
        let bindings = Bindings::for_roles(&roles, &RoleBindings::new(Type::named("Boolean")));
        let ty = Type::reference(
            "Map",
            vec![
                Type::named("String"),
                Type::reference(
                    "List",
                    vec![Type::wildcard(WildcardMode::Super, Type::Variable(roles.result))],
                ),
            ],
        );
        let expected = Type::reference(
            "Map",
            vec![
                Type::named("String"),
                Type::reference(
                    "List",
                    vec![Type::wildcard(WildcardMode::Super, Type::named("Boolean"))],
                ),
            ],
        );
        assert_eq!(substitute(&ty, &bindings).into_owned(), expected);
    }

    #[test]
    fn variable_free_types_come_back_borrowed() {
        let mut vars = TypeVars::new();
        let roles = roles(&mut vars);
        let bindings = Bindings::for_roles(&roles, &RoleBindings::new(Type::named("Boolean")));
        let ty = Type::array(Type::reference(
            "List",
            vec![Type::Primitive(PrimitiveKind::Int).boxed()],
        ));
        assert!(matches!(substitute(&ty, &bindings), Cow::Borrowed(_)));
        let plain = Type::named("String");
        assert!(matches!(substitute(&plain, &bindings), Cow::Borrowed(_)));
    }

    #[test]
    fn identity_bindings_never_substitute() {
        let mut vars = TypeVars::new();
        let roles = roles(&mut vars);
        let bindings = Bindings::for_roles(&roles, &RoleBindings::identity(&roles));
        assert!(bindings.is_empty());
        let ty = Type::Variable(roles.result);
        assert!(matches!(substitute(&ty, &bindings), Cow::Borrowed(_)));
    }

    #[test]
    fn positional_parameters() {
        let mut vars = TypeVars::new();
        let k = vars.declare("K", None);
        let v = vars.declare("V", None);
        let bindings = Bindings::new()
            .with_params(&[k, v], &[Type::named("String"), Type::Primitive(PrimitiveKind::Long).boxed()]);
        let ty = Type::reference("Entry", vec![Type::Variable(v), Type::Variable(k)]);
        assert_eq!(
            substitute(&ty, &bindings).into_owned(),
            Type::reference("Entry", vec![Type::named("Long"), Type::named("String")])
        );
    }

    #[test]
    fn substitution_is_single_pass() {
        let mut vars = TypeVars::new();
        let a = vars.declare("A", None);
        let b = vars.declare("B", None);
        // A -> List<B>, B -> A: the result must not chase B again.
        let bindings = Bindings::new()
            .bind(a, Type::reference("List", vec![Type::Variable(b)]))
            .bind(b, Type::Variable(a));
        let out = substitute(&Type::Variable(a), &bindings).into_owned();
        assert_eq!(out, Type::reference("List", vec![Type::Variable(b)]));
    }
}
