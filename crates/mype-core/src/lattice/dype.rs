//! Plain type-set algebra over base types
//!
//! A [`Dype`] is a set of base types written as a small expression tree:
//! - `All` is the universe
//! - `Empty` is the empty set
//! - `Union` / `Xsect` combine operands
//! - `Base` is a single base type
//!
//! Distinct base types are disjoint atoms, so every value denotes a subset
//! of [`BaseType::ALL`].

use super::base::BaseType;
use crate::error::LatticeError;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dype {
    All,
    Empty,
    Union(Vec<Dype>),
    Xsect(Vec<Dype>),
    Base(BaseType),
}

impl From<BaseType> for Dype {
    fn from(base: BaseType) -> Self {
        Dype::Base(base)
    }
}

impl Dype {
    /// Union of two values. `All` absorbs, `Empty` is the identity.
    pub fn union(&self, other: &Dype) -> Dype {
        match (self, other) {
            (Dype::All, _) | (_, Dype::All) => Dype::All,
            (Dype::Empty, x) | (x, Dype::Empty) => x.clone(),
            (a, b) if a == b => a.clone(),
            // operands in canonical order so a ∪ b and b ∪ a are the same tree
            (a, b) => Dype::Union(vec![a.min(b).clone(), a.max(b).clone()]),
        }
    }

    /// Intersection of two values. `Empty` absorbs, `All` is the identity.
    pub fn intersection(&self, other: &Dype) -> Dype {
        match (self, other) {
            (Dype::Empty, _) | (_, Dype::Empty) => Dype::Empty,
            (Dype::All, x) | (x, Dype::All) => x.clone(),
            (a, b) if a == b => a.clone(),
            (a, b) => Dype::Xsect(vec![a.min(b).clone(), a.max(b).clone()]),
        }
    }

    pub fn union_all<'a>(values: impl IntoIterator<Item = &'a Dype>) -> Dype {
        values
            .into_iter()
            .fold(Dype::Empty, |acc, value| acc.union(value))
    }

    /// Flatten nested same-kind operators, drop duplicate operands and
    /// collapse operators left with zero or one operand
    pub fn simplify(&self) -> Dype {
        let (ops, is_union) = match self {
            Dype::Union(ops) => (ops, true),
            Dype::Xsect(ops) => (ops, false),
            leaf => return leaf.clone(),
        };

        let mut flat: Vec<Dype> = Vec::with_capacity(ops.len());
        for op in ops {
            match (op.simplify(), is_union) {
                (Dype::Union(inner), true) | (Dype::Xsect(inner), false) => flat.extend(inner),
                (other, _) => flat.push(other),
            }
        }

        let mut unique: Vec<Dype> = Vec::with_capacity(flat.len());
        for op in flat {
            if !unique.contains(&op) {
                unique.push(op);
            }
        }

        match unique.len() {
            0 => Dype::Empty,
            1 => unique.swap_remove(0),
            _ if is_union => Dype::Union(unique),
            _ => Dype::Xsect(unique),
        }
    }

    pub fn is_simplified(&self) -> bool {
        self.simplify() == *self
    }

    /// Whether every type in `sub` is also in `container`
    ///
    /// Operands nested past one level after simplification cannot be decided
    /// and raise [`LatticeError::UndeterminedSubset`].
    pub fn subset(container: &Dype, sub: &Dype) -> Result<bool, LatticeError> {
        if *container == Dype::All || *sub == Dype::Empty || container == sub {
            return Ok(true);
        }

        let container = container.simplify();
        let sub = sub.simplify();
        if container.depth() > 1 || sub.depth() > 1 {
            return Err(LatticeError::UndeterminedSubset {
                container: container.to_string(),
                sub: sub.to_string(),
            });
        }

        Ok(match (container.atoms(), sub.atoms()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(c), Some(s)) => s.is_subset(&c),
        })
    }

    /// Operator nesting depth: leaves are 0, an operator over leaves is 1
    fn depth(&self) -> usize {
        match self {
            Dype::Union(ops) | Dype::Xsect(ops) => 1 + ops.iter().map(Dype::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Denoted set of base types; `None` stands for the universe
    fn atoms(&self) -> Option<BTreeSet<BaseType>> {
        match self {
            Dype::All => None,
            Dype::Empty => Some(BTreeSet::new()),
            Dype::Base(base) => Some(BTreeSet::from([*base])),
            Dype::Union(ops) => {
                let mut acc = BTreeSet::new();
                for op in ops {
                    acc.extend(op.atoms()?);
                }
                Some(acc)
            }
            Dype::Xsect(ops) => {
                let mut acc: Option<BTreeSet<BaseType>> = None;
                for op in ops {
                    acc = match (acc, op.atoms()) {
                        (None, x) => x,
                        (x, None) => x,
                        (Some(a), Some(b)) => Some(a.intersection(&b).copied().collect()),
                    };
                }
                acc
            }
        }
    }
}

impl fmt::Display for Dype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, ops: &[Dype], sep: &str| -> fmt::Result {
            f.write_str("(")?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{op}")?;
            }
            f.write_str(")")
        };
        match self {
            Dype::All => f.write_str("*"),
            Dype::Empty => f.write_str("{}"),
            Dype::Base(base) => write!(f, "{base}"),
            Dype::Union(ops) => join(f, ops, " | "),
            Dype::Xsect(ops) => join(f, ops, " & "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(base: BaseType) -> Dype {
        Dype::Base(base)
    }

    #[test]
    fn test_union_degenerate_cases() {
        let int = b(BaseType::Int);
        assert_eq!(Dype::All.union(&int), Dype::All);
        assert_eq!(Dype::Empty.union(&int), int);
        assert_eq!(int.union(&int), int);
    }

    #[test]
    fn test_union_is_structurally_commutative() {
        let int = b(BaseType::Int);
        let float = b(BaseType::Float);
        assert_eq!(int.union(&float), float.union(&int));
        assert_eq!(int.intersection(&float), float.intersection(&int));
    }

    #[test]
    fn test_simplify_flattens_and_dedups() {
        let int = b(BaseType::Int);
        let float = b(BaseType::Float);
        let nested = Dype::Union(vec![
            Dype::Union(vec![int.clone(), float.clone()]),
            int.clone(),
            Dype::Union(vec![float.clone()]),
        ]);
        assert_eq!(nested.simplify(), Dype::Union(vec![int, float]));
    }

    #[test]
    fn test_simplify_mono_arg() {
        assert_eq!(Dype::Union(vec![]).simplify(), Dype::Empty);
        assert_eq!(Dype::Xsect(vec![b(BaseType::Bool)]).simplify(), b(BaseType::Bool));
        let wrapped = Dype::Union(vec![Dype::Xsect(vec![Dype::Union(vec![
            b(BaseType::Int),
            b(BaseType::Float),
        ])])]);
        assert_eq!(
            wrapped.simplify(),
            Dype::Union(vec![b(BaseType::Int), b(BaseType::Float)])
        );
    }

    #[test]
    fn test_subset_basics() {
        let int = b(BaseType::Int);
        let num = b(BaseType::Int).union(&b(BaseType::Float));
        assert!(Dype::subset(&num, &int).unwrap());
        assert!(!Dype::subset(&int, &num).unwrap());
        assert!(Dype::subset(&Dype::All, &num).unwrap());
        assert!(Dype::subset(&int, &Dype::Empty).unwrap());
        assert!(!Dype::subset(&int, &Dype::All).unwrap());
    }

    #[test]
    fn test_subset_union_against_leaf_container() {
        // a union whose members collapse to one leaf is contained in that leaf
        let sub = Dype::Union(vec![b(BaseType::Int), b(BaseType::Int)]);
        assert!(Dype::subset(&b(BaseType::Int), &sub).unwrap());
        let sub = b(BaseType::Int).union(&b(BaseType::String));
        assert!(!Dype::subset(&b(BaseType::Int), &sub).unwrap());
    }

    #[test]
    fn test_subset_with_intersections() {
        let num = b(BaseType::Int).union(&b(BaseType::Float));
        let sx = Dype::Xsect(vec![b(BaseType::Int), b(BaseType::String)]);
        // disjoint atoms meet in the empty set
        assert!(Dype::subset(&b(BaseType::Bool), &sx).unwrap());
        let container = Dype::Xsect(vec![Dype::All, b(BaseType::Float)]);
        assert!(Dype::subset(&container, &b(BaseType::Float)).unwrap());
        assert!(!Dype::subset(&container, &num).unwrap());
    }

    #[test]
    fn test_subset_rejects_deep_nesting() {
        let deep = Dype::Union(vec![
            Dype::Xsect(vec![b(BaseType::Int), b(BaseType::Float)]),
            b(BaseType::String),
        ]);
        let err = Dype::subset(&deep, &b(BaseType::Bool)).unwrap_err();
        assert!(matches!(err, LatticeError::UndeterminedSubset { .. }));
    }

    #[test]
    fn test_display() {
        let v = b(BaseType::Int).union(&b(BaseType::String));
        insta::assert_snapshot!(v.to_string(), @"(int | string)");
        insta::assert_snapshot!(Dype::All.to_string(), @"*");
    }
}
