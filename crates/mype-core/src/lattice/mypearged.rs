//! Generic-argument-aware type-set algebra
//!
//! Extends the plain algebra with one level of generic arguments
//! (`list<int>`) and opaque user class types compared by identity. Values
//! are kept canonical: a `Union` holds at least two distinct leaves in
//! sorted order, so two equal sets are always equal trees.
//!
//! The shape of an operand pair decides how union and intersection are
//! computed:
//! - `All` / `Empty` degenerate cases come first
//! - equal operands return themselves
//! - the remaining pairs are ordered bigger/smaller by [`MypeArged::rank`],
//!   which leaves three cases: union-union, union-leaf and leaf-leaf

use super::base::BaseType;
use super::dype::Dype;
use crate::error::LatticeError;
use crate::ir::NodeId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MypeArged {
    All,
    Empty,
    /// Non-generic base type, or a container with any argument
    SingleBase(BaseType),
    /// Container base with one argument, itself a leaf
    SingleArged(BaseType, Box<MypeArged>),
    /// User class, by definition node
    Class(NodeId),
    Union(Vec<MypeArged>),
}

impl From<BaseType> for MypeArged {
    fn from(base: BaseType) -> Self {
        MypeArged::SingleBase(base)
    }
}

impl MypeArged {
    pub fn arged(base: BaseType, arg: MypeArged) -> MypeArged {
        MypeArged::SingleArged(base, Box::new(arg))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, MypeArged::All)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MypeArged::Empty)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            MypeArged::SingleBase(_) | MypeArged::SingleArged(..) | MypeArged::Class(_)
        )
    }

    /// Base type of a base or arged leaf
    pub fn base(&self) -> Option<BaseType> {
        match self {
            MypeArged::SingleBase(base) | MypeArged::SingleArged(base, _) => Some(*base),
            _ => None,
        }
    }

    /// Leaf operands: the members of a union, nothing for `Empty`, the value itself otherwise
    pub fn leaves(&self) -> &[MypeArged] {
        match self {
            MypeArged::Union(ops) => ops,
            MypeArged::Empty => &[],
            other => std::slice::from_ref(other),
        }
    }

    /// Canonical set of the given leaves
    pub fn from_leaves(leaves: impl IntoIterator<Item = MypeArged>) -> MypeArged {
        let mut ops: Vec<MypeArged> = leaves.into_iter().collect();
        ops.sort();
        ops.dedup();
        match ops.len() {
            0 => MypeArged::Empty,
            1 => ops.swap_remove(0),
            _ => MypeArged::Union(ops),
        }
    }

    /// Lift a plain type-set into this algebra
    pub fn from_dype(dype: &Dype) -> MypeArged {
        match dype {
            Dype::All => MypeArged::All,
            Dype::Empty => MypeArged::Empty,
            Dype::Base(base) => MypeArged::SingleBase(*base),
            Dype::Union(ops) => ops
                .iter()
                .fold(MypeArged::Empty, |acc, op| acc.union(&MypeArged::from_dype(op))),
            Dype::Xsect(ops) => ops
                .iter()
                .fold(MypeArged::All, |acc, op| acc.intersection(&MypeArged::from_dype(op))),
        }
    }

    /// Validate the structural invariants of a value
    pub fn check(&self) -> Result<(), LatticeError> {
        match self {
            MypeArged::All | MypeArged::Empty | MypeArged::SingleBase(_) | MypeArged::Class(_) => {
                Ok(())
            }
            MypeArged::SingleArged(base, arg) => {
                if !base.is_container() {
                    return Err(LatticeError::IncompatibleShapes {
                        left: base.to_string(),
                        right: arg.to_string(),
                    });
                }
                if !arg.is_leaf() {
                    return Err(LatticeError::MalformedArgument(arg.to_string()));
                }
                arg.check()
            }
            MypeArged::Union(ops) => {
                for op in ops {
                    if !op.is_leaf() {
                        return Err(LatticeError::NestedUnion(op.to_string()));
                    }
                    op.check()?;
                }
                Ok(())
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MypeArged::All | MypeArged::Empty => 0,
            MypeArged::Class(_) => 1,
            MypeArged::SingleBase(_) => 2,
            MypeArged::SingleArged(..) => 3,
            MypeArged::Union(_) => 4,
        }
    }

    pub fn union(&self, other: &MypeArged) -> MypeArged {
        match (self, other) {
            (MypeArged::All, _) | (_, MypeArged::All) => MypeArged::All,
            (MypeArged::Empty, x) | (x, MypeArged::Empty) => x.clone(),
            (a, b) if a == b => a.clone(),
            _ => {
                let (big, small) = if self.rank() >= other.rank() {
                    (self, other)
                } else {
                    (other, self)
                };
                match (big, small) {
                    (MypeArged::Union(ops), MypeArged::Union(more)) => {
                        Self::from_leaves(ops.iter().chain(more).cloned())
                    }
                    (MypeArged::Union(ops), leaf) => {
                        if ops.contains(leaf) {
                            big.clone()
                        } else {
                            Self::from_leaves(ops.iter().chain(std::iter::once(leaf)).cloned())
                        }
                    }
                    (a, b) => Self::from_leaves([a.clone(), b.clone()]),
                }
            }
        }
    }

    pub fn intersection(&self, other: &MypeArged) -> MypeArged {
        match (self, other) {
            (MypeArged::Empty, _) | (_, MypeArged::Empty) => MypeArged::Empty,
            (MypeArged::All, x) | (x, MypeArged::All) => x.clone(),
            (a, b) if a == b => a.clone(),
            _ => {
                let mut out = Vec::new();
                for left in self.leaves() {
                    for right in other.leaves() {
                        out.extend(Self::leaf_meet(left, right));
                    }
                }
                Self::from_leaves(out)
            }
        }
    }

    /// Union after validating both operands
    pub fn try_union(&self, other: &MypeArged) -> Result<MypeArged, LatticeError> {
        self.check()?;
        other.check()?;
        Ok(self.union(other))
    }

    /// Intersection after validating both operands
    pub fn try_intersection(&self, other: &MypeArged) -> Result<MypeArged, LatticeError> {
        self.check()?;
        other.check()?;
        Ok(self.intersection(other))
    }

    fn leaf_meet(left: &MypeArged, right: &MypeArged) -> Option<MypeArged> {
        use MypeArged::*;
        match (left, right) {
            _ if left == right => Some(left.clone()),
            // a bare container admits any argument
            (SingleBase(a), SingleArged(b, _)) if a == b => Some(right.clone()),
            (SingleArged(a, _), SingleBase(b)) if a == b => Some(left.clone()),
            (SingleArged(a, x), SingleArged(b, y)) if a == b => {
                Self::leaf_meet(x, y).map(|arg| MypeArged::arged(*a, arg))
            }
            _ => None,
        }
    }

    /// Whether `self ∪ other` differs from `self`
    pub fn would_change_union_with(&self, other: &MypeArged) -> bool {
        match (self, other) {
            (MypeArged::All, _) | (_, MypeArged::Empty) => false,
            (_, MypeArged::All) | (MypeArged::Empty, _) => true,
            _ => {
                let mine = self.leaves();
                other.leaves().iter().any(|leaf| !mine.contains(leaf))
            }
        }
    }

    /// Whether `self ∩ other` differs from `self`
    pub fn would_change_intersection_with(&self, other: &MypeArged) -> bool {
        match (self, other) {
            (MypeArged::Empty, _) | (_, MypeArged::All) => false,
            (_, MypeArged::Empty) | (MypeArged::All, _) => true,
            _ => self.intersection(other) != *self,
        }
    }

    /// Most specific common structural ancestor of a set of leaves
    pub fn greatest_common_stem<'a>(
        leaves: impl IntoIterator<Item = &'a MypeArged>,
    ) -> Option<MypeArged> {
        let mut leaves = leaves.into_iter();
        let first = leaves.next()?.clone();
        leaves.try_fold(first, |acc, leaf| Self::stem_of(&acc, leaf))
    }

    /// Common stem of this value's leaves
    pub fn stem(&self) -> Option<MypeArged> {
        match self {
            MypeArged::All | MypeArged::Empty => None,
            other => Self::greatest_common_stem(other.leaves()),
        }
    }

    fn stem_of(left: &MypeArged, right: &MypeArged) -> Option<MypeArged> {
        use MypeArged::*;
        match (left, right) {
            _ if left == right => Some(left.clone()),
            (SingleBase(a), SingleArged(b, _)) | (SingleArged(b, _), SingleBase(a)) if a == b => {
                Some(SingleBase(*a))
            }
            (SingleArged(a, x), SingleArged(b, y)) if a == b => Some(match Self::stem_of(x, y) {
                Some(arg) => MypeArged::arged(*a, arg),
                None => SingleBase(*a),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for MypeArged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MypeArged::All => f.write_str("*"),
            MypeArged::Empty => f.write_str("{}"),
            MypeArged::SingleBase(base) => write!(f, "{base}"),
            MypeArged::SingleArged(base, arg) => write!(f, "{base}<{arg}>"),
            MypeArged::Class(node) => write!(f, "class{node}"),
            MypeArged::Union(ops) => {
                for (i, op) in ops.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{op}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MypeArged::*;

    fn list_of(arg: BaseType) -> MypeArged {
        MypeArged::arged(BaseType::List, SingleBase(arg))
    }

    #[test]
    fn test_union_keeps_leaves_as_atoms() {
        let u = SingleBase(BaseType::List).union(&list_of(BaseType::Int));
        assert_eq!(u.leaves().len(), 2);
        assert_eq!(u, list_of(BaseType::Int).union(&SingleBase(BaseType::List)));
    }

    #[test]
    fn test_union_absorbs_member() {
        let u = SingleBase(BaseType::Int).union(&SingleBase(BaseType::Float));
        assert_eq!(u.union(&SingleBase(BaseType::Int)), u);
        assert!(!u.would_change_union_with(&SingleBase(BaseType::Float)));
        assert!(u.would_change_union_with(&SingleBase(BaseType::String)));
    }

    #[test]
    fn test_intersection_refines_bare_container() {
        let bare = SingleBase(BaseType::List);
        assert_eq!(bare.intersection(&list_of(BaseType::Int)), list_of(BaseType::Int));
        assert_eq!(list_of(BaseType::Int).intersection(&list_of(BaseType::String)), Empty);
    }

    #[test]
    fn test_intersection_distributes_over_unions() {
        let num = SingleBase(BaseType::Int).union(&SingleBase(BaseType::Float));
        let other = SingleBase(BaseType::Float).union(&SingleBase(BaseType::String));
        assert_eq!(num.intersection(&other), SingleBase(BaseType::Float));
        assert!(num.would_change_intersection_with(&other));
        assert!(!num.would_change_intersection_with(&All));
    }

    #[test]
    fn test_classes_compare_by_identity() {
        let a = Class(NodeId(3));
        let b = Class(NodeId(4));
        assert_eq!(a.intersection(&b), Empty);
        assert_eq!(a.union(&b).leaves().len(), 2);
    }

    #[test]
    fn test_greatest_common_stem() {
        let ints = list_of(BaseType::Int);
        let strs = list_of(BaseType::String);
        assert_eq!(
            MypeArged::greatest_common_stem([&ints, &strs]),
            Some(SingleBase(BaseType::List))
        );
        assert_eq!(MypeArged::greatest_common_stem([&ints, &ints]), Some(ints.clone()));

        let nested_a = MypeArged::arged(BaseType::List, list_of(BaseType::Int));
        let nested_b = MypeArged::arged(BaseType::List, list_of(BaseType::Float));
        assert_eq!(
            MypeArged::greatest_common_stem([&nested_a, &nested_b]),
            Some(MypeArged::arged(BaseType::List, SingleBase(BaseType::List)))
        );

        let mixed = [SingleBase(BaseType::Int), SingleBase(BaseType::String)];
        assert_eq!(MypeArged::greatest_common_stem(&mixed), None);
    }

    #[test]
    fn test_check_rejects_malformed_values() {
        let nested = Union(vec![SingleBase(BaseType::Int), Union(vec![])]);
        assert!(matches!(nested.check(), Err(LatticeError::NestedUnion(_))));

        let bad_arg = MypeArged::arged(BaseType::List, All);
        assert!(matches!(bad_arg.check(), Err(LatticeError::MalformedArgument(_))));

        let bad_base = MypeArged::arged(BaseType::Int, SingleBase(BaseType::Int));
        assert!(matches!(
            bad_base.try_union(&Empty),
            Err(LatticeError::IncompatibleShapes { .. })
        ));
    }

    #[test]
    fn test_from_dype() {
        let d = Dype::Base(BaseType::Int).union(&Dype::Base(BaseType::Float));
        let lifted = MypeArged::from_dype(&d);
        assert_eq!(lifted.leaves().len(), 2);
        assert_eq!(MypeArged::from_dype(&Dype::All), All);
    }

    #[test]
    fn test_display() {
        let v = list_of(BaseType::Int).union(&SingleBase(BaseType::String));
        insta::assert_snapshot!(v.to_string(), @"string | list<int>");
        insta::assert_snapshot!(Class(NodeId(12)).to_string(), @"class#12");
        insta::assert_snapshot!(Empty.to_string(), @"{}");
    }
}
