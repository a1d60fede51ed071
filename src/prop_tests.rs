//! Property tests using proptest.
//!
//! Invariants that must hold for any input, not just hand-picked cases:
//!
//! 1. Substitution leaves variable-free types untouched, without allocating
//! 2. Substitution is idempotent when bound types are variable-free
//! 3. Derived equality is reflexive and symmetric
//! 4. Equal instances have equal hash codes
//! 5. compareTo is zero exactly when equals holds, and is antisymmetric
//! 6. compareTo is reflexive and transitive

use std::borrow::Cow;

use once_cell::sync::Lazy;
use proptest::prelude::*;

use crate::derive::DeriveOptions;
use crate::engine::Engine;
use crate::eval::{Runtime, Value};
use crate::schema::{FieldDef, SchemaDef, VariantDef};
use crate::types::{Bindings, PrimitiveKind, Type, TypeVarId, WildcardMode, substitute};

// ---------------------------------------------------------------------------
// Strategies for generating types
// ---------------------------------------------------------------------------

fn arb_type(with_vars: bool) -> impl Strategy<Value = Type> {
    let primitive = prop::sample::select(PrimitiveKind::ALL.to_vec()).prop_map(Type::Primitive);
    let named = prop::sample::select(vec!["String", "Integer", "java.util.Date"]).prop_map(Type::named);
    let leaf = if with_vars {
        prop_oneof![primitive, named, (0u32..6).prop_map(|id| Type::Variable(TypeVarId(id)))].boxed()
    } else {
        prop_oneof![primitive, named].boxed()
    };
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::array),
            (
                prop::sample::select(vec!["List", "Map", "Optional"]),
                prop::collection::vec(inner.clone(), 1..3),
            )
                .prop_map(|(name, args)| Type::reference(name, args)),
            (inner, prop_oneof![Just(WildcardMode::Extends), Just(WildcardMode::Super)])
                .prop_map(|(bound, mode)| Type::wildcard(mode, bound)),
        ]
    })
}

/// Binds some of the variables 0..4 to variable-free types.
fn arb_bindings() -> impl Strategy<Value = Bindings> {
    prop::collection::vec((0u32..4, arb_type(false)), 0..4).prop_map(|pairs| {
        pairs
            .into_iter()
            .fold(Bindings::new(), |b, (id, ty)| b.bind(TypeVarId(id), ty))
    })
}

// ---------------------------------------------------------------------------
// Strategies for generating instances
// ---------------------------------------------------------------------------

static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    let def = SchemaDef::new("Sample", "R")
        .with_self("S")
        .with_variant(VariantDef::new("Empty", "R"))
        .with_variant(
            VariantDef::new("Point", "R")
                .with_field(FieldDef::new("x", "int"))
                .with_field(FieldDef::new("y", "double")),
        )
        .with_variant(
            VariantDef::new("Label", "R")
                .with_field(FieldDef::new("text", "String").nullable())
                .with_field(FieldDef::new("weights", "long[]")),
        )
        .with_variant(
            VariantDef::new("Node", "R")
                .with_field(FieldDef::new("child", "S").nullable())
                .with_field(FieldDef::new("grid", "float[][]")),
        );
    let derivation = Engine::new(DeriveOptions::default())
        .derive(&def)
        .expect("sample schema derives");
    Runtime::new().with(derivation)
});

#[derive(Debug, Clone)]
enum Sample {
    Empty,
    Point(i32, f64),
    Label(Option<String>, Vec<i64>),
    Node(Option<Box<Sample>>, Vec<Vec<f32>>),
}

impl Sample {
    fn build(&self) -> Value {
        let (variant, args) = match self {
            Sample::Empty => ("Empty", vec![]),
            Sample::Point(x, y) => ("Point", vec![Value::Int(*x), Value::Double(*y)]),
            Sample::Label(text, weights) => (
                "Label",
                vec![
                    text.clone().map_or(Value::Null, Value::Str),
                    Value::array(weights.iter().copied().map(Value::Long)),
                ],
            ),
            Sample::Node(child, grid) => (
                "Node",
                vec![
                    child.as_ref().map_or(Value::Null, |c| c.build()),
                    Value::array(grid.iter().map(|row| Value::array(row.iter().copied().map(Value::Float)))),
                ],
            ),
        };
        RUNTIME.construct("Sample", variant, args).expect("valid sample")
    }
}

fn arb_sample() -> impl Strategy<Value = Sample> {
    // small domains so that equal pairs actually occur
    let double = prop::sample::select(vec![0.0f64, -0.0, 1.0, 2.5, f64::NAN]);
    let float = prop::sample::select(vec![0.0f32, -0.0, 1.5, f32::NAN]);
    let text = prop::sample::select(vec!["", "a", "b"]).prop_map(str::to_string);

    let leaf = prop_oneof![
        Just(Sample::Empty),
        (-1i32..2, double).prop_map(|(x, y)| Sample::Point(x, y)),
        (prop::option::of(text), prop::collection::vec(-1i64..2, 0..3))
            .prop_map(|(text, weights)| Sample::Label(text, weights)),
    ];
    leaf.prop_recursive(3, 12, 2, move |inner| {
        (
            prop::option::of(inner.prop_map(Box::new)),
            prop::collection::vec(prop::collection::vec(float.clone(), 0..3), 0..3),
        )
            .prop_map(|(child, grid)| Sample::Node(child, grid))
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ground_types_are_returned_borrowed(ty in arb_type(false), bindings in arb_bindings()) {
        let out = substitute(&ty, &bindings);
        prop_assert!(matches!(out, Cow::Borrowed(_)));
        prop_assert_eq!(out.as_ref(), &ty);
    }

    #[test]
    fn substitution_is_idempotent(ty in arb_type(true), bindings in arb_bindings()) {
        let once = substitute(&ty, &bindings).into_owned();
        let twice = substitute(&once, &bindings).into_owned();
        prop_assert_eq!(&twice, &once);
        for var in once.variables() {
            prop_assert!(bindings.get(var).is_none());
            prop_assert!(ty.mentions(var));
        }
    }

    #[test]
    fn equality_is_reflexive_and_symmetric(a in arb_sample(), b in arb_sample()) {
        let (x, y) = (a.build(), b.build());
        prop_assert!(RUNTIME.equals(&x, &x).unwrap());
        prop_assert!(RUNTIME.equals(&x, &a.build()).unwrap());
        prop_assert_eq!(RUNTIME.equals(&x, &y).unwrap(), RUNTIME.equals(&y, &x).unwrap());
    }

    #[test]
    fn equal_instances_hash_alike(a in arb_sample(), b in arb_sample()) {
        let (x, y) = (a.build(), b.build());
        if RUNTIME.equals(&x, &y).unwrap() {
            prop_assert_eq!(RUNTIME.hash_code(&x).unwrap(), RUNTIME.hash_code(&y).unwrap());
        }
        prop_assert_eq!(RUNTIME.hash_code(&x).unwrap(), RUNTIME.hash_code(&a.build()).unwrap());
    }

    #[test]
    fn ordering_agrees_with_equality(a in arb_sample(), b in arb_sample()) {
        let (x, y) = (a.build(), b.build());
        let forward = RUNTIME.compare(&x, &y).unwrap();
        let backward = RUNTIME.compare(&y, &x).unwrap();
        prop_assert_eq!(forward == 0, RUNTIME.equals(&x, &y).unwrap());
        prop_assert_eq!(forward, -backward);
        prop_assert!(RUNTIME.render(&x).unwrap().starts_with("Sample."));
    }

    #[test]
    fn ordering_is_reflexive(a in arb_sample()) {
        let x = a.build();
        prop_assert_eq!(RUNTIME.compare(&x, &x).unwrap(), 0);
        prop_assert_eq!(RUNTIME.compare(&x, &a.build()).unwrap(), 0);
    }

    #[test]
    fn ordering_is_transitive(a in arb_sample(), b in arb_sample(), c in arb_sample()) {
        let values = [a.build(), b.build(), c.build()];
        let le = |i: usize, j: usize| RUNTIME.compare(&values[i], &values[j]).unwrap() <= 0;
        for (i, j, k) in [(0, 1, 2), (0, 2, 1), (1, 0, 2), (1, 2, 0), (2, 0, 1), (2, 1, 0)] {
            if le(i, j) && le(j, k) {
                prop_assert!(le(i, k));
            }
        }
    }
}
