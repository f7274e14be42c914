//! Algebraic laws of the type-set lattices

use mype_core::{BaseType, Dype, MypeArged, NodeId};
use proptest::prelude::*;
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

// ----- MypeArged (proptest) -----

fn base() -> impl Strategy<Value = BaseType> {
    proptest::sample::select(BaseType::ALL.to_vec())
}

fn container() -> impl Strategy<Value = BaseType> {
    proptest::sample::select(vec![BaseType::List, BaseType::Map, BaseType::Set])
}

fn simple_leaf() -> impl Strategy<Value = MypeArged> {
    prop_oneof![
        base().prop_map(MypeArged::SingleBase),
        (0u32..3).prop_map(|id| MypeArged::Class(NodeId(id))),
    ]
}

fn leaf() -> impl Strategy<Value = MypeArged> {
    prop_oneof![
        3 => simple_leaf(),
        2 => (container(), simple_leaf()).prop_map(|(c, arg)| MypeArged::arged(c, arg)),
    ]
}

fn mype() -> impl Strategy<Value = MypeArged> {
    prop_oneof![
        1 => Just(MypeArged::All),
        1 => Just(MypeArged::Empty),
        6 => proptest::collection::vec(leaf(), 1..4).prop_map(MypeArged::from_leaves),
    ]
}

proptest! {
    #[test]
    fn union_is_commutative(a in mype(), b in mype()) {
        prop_assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn intersection_is_commutative(a in mype(), b in mype()) {
        prop_assert_eq!(a.intersection(&b), b.intersection(&a));
    }

    #[test]
    fn identities_and_absorbers(a in mype()) {
        prop_assert_eq!(a.union(&MypeArged::Empty), a.clone());
        prop_assert_eq!(a.union(&MypeArged::All), MypeArged::All);
        prop_assert_eq!(a.intersection(&MypeArged::All), a.clone());
        prop_assert_eq!(a.intersection(&MypeArged::Empty), MypeArged::Empty);
        prop_assert_eq!(a.union(&a), a.clone());
    }

    #[test]
    fn results_stay_well_formed(a in mype(), b in mype()) {
        prop_assert!(a.try_union(&b).is_ok());
        let meet = a.try_intersection(&b).unwrap();
        prop_assert!(meet.check().is_ok());
    }

    #[test]
    fn change_predicates_agree_with_operations(a in mype(), b in mype()) {
        prop_assert_eq!(a.would_change_union_with(&b), a.union(&b) != a);
        prop_assert_eq!(a.would_change_intersection_with(&b), a.intersection(&b) != a);
    }
}

// ----- Dype (quickcheck) -----

#[derive(Debug, Clone)]
struct AnyDype(Dype);

fn arbitrary_dype(g: &mut Gen, depth: usize) -> Dype {
    let choices = if depth == 0 { 3 } else { 5 };
    match u8::arbitrary(g) % choices {
        0 => Dype::Base(*g.choose(&BaseType::ALL).unwrap_or(&BaseType::Int)),
        1 => Dype::All,
        2 => Dype::Empty,
        3 => {
            let n = usize::arbitrary(g) % 3 + 1;
            Dype::Union((0..n).map(|_| arbitrary_dype(g, depth - 1)).collect())
        }
        _ => {
            let n = usize::arbitrary(g) % 3 + 1;
            Dype::Xsect((0..n).map(|_| arbitrary_dype(g, depth - 1)).collect())
        }
    }
}

impl Arbitrary for AnyDype {
    fn arbitrary(g: &mut Gen) -> Self {
        AnyDype(arbitrary_dype(g, 3))
    }
}

/// A base type or a flat union of base types
#[derive(Debug, Clone)]
struct FlatDype(Dype);

impl Arbitrary for FlatDype {
    fn arbitrary(g: &mut Gen) -> Self {
        let n = usize::arbitrary(g) % 3 + 1;
        let bases: Vec<Dype> = (0..n)
            .map(|_| Dype::Base(*g.choose(&BaseType::ALL).unwrap_or(&BaseType::Int)))
            .collect();
        FlatDype(Dype::union_all(&bases).simplify())
    }
}

#[quickcheck]
fn simplify_is_idempotent(d: AnyDype) -> bool {
    let once = d.0.simplify();
    once.simplify() == once && once.is_simplified()
}

#[quickcheck]
fn dype_union_is_commutative(a: AnyDype, b: AnyDype) -> bool {
    a.0.union(&b.0) == b.0.union(&a.0)
}

#[quickcheck]
fn everything_is_a_subset_of_all(d: AnyDype) -> bool {
    Dype::subset(&Dype::All, &d.0) == Ok(true) && Dype::subset(&d.0, &Dype::Empty) == Ok(true)
}

#[quickcheck]
fn operands_are_subsets_of_their_union(a: FlatDype, b: FlatDype) -> bool {
    let joined = a.0.union(&b.0);
    Dype::subset(&joined, &a.0) == Ok(true) && Dype::subset(&joined, &b.0) == Ok(true)
}

#[quickcheck]
fn single_base_contains_only_itself(a: FlatDype) -> bool {
    BaseType::ALL
        .into_iter()
        .all(|x| Dype::subset(&Dype::Base(x), &a.0) == Ok(a.0 == Dype::Base(x)))
}

#[quickcheck]
fn subset_is_reflexive(d: AnyDype) -> bool {
    Dype::subset(&d.0, &d.0) == Ok(true)
}

#[test]
fn union_order_does_not_matter_for_subset() {
    let int = Dype::Base(BaseType::Int);
    let float = Dype::Base(BaseType::Float);
    let int_float = Dype::Union(vec![int.clone(), float.clone()]);
    let float_int = Dype::Union(vec![float, int]);
    assert_eq!(Dype::subset(&int_float, &float_int), Ok(true));
    assert_eq!(Dype::subset(&float_int, &int_float), Ok(true));
}
