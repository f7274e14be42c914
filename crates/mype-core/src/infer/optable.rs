//! Fixed operator typing table
//!
//! Binary entries are keyed by the canonical (low, high) operand pair, so a
//! lookup covers both operand orders at once. Each operator also carries its
//! result domain: the union of everything its table can produce.

use crate::ir::{BinOp, UnOp};
use crate::lattice::{BaseType, Dype, MypeArged};
use std::collections::HashMap;

use crate::lattice::BaseType::{Bool, Float, Int, List, Map, Set, String as Str};

#[derive(Debug, Clone)]
pub struct OperatorTable {
    binary: HashMap<(BinOp, BaseType, BaseType), BaseType>,
    domains: HashMap<BinOp, MypeArged>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl OperatorTable {
    pub fn standard() -> Self {
        let mut table = Self {
            binary: HashMap::new(),
            domains: HashMap::new(),
        };

        for op in [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Mod] {
            table.insert(op, Int, Int, Int);
            table.insert(op, Int, Float, Float);
            table.insert(op, Float, Float, Float);
        }
        table.insert(BinOp::Add, Str, Str, Str);

        let comparable = [(Int, Int), (Int, Float), (Float, Float), (Str, Str), (Bool, Bool)];
        for op in [BinOp::Eq, BinOp::Ne, BinOp::Lt, BinOp::Le, BinOp::Gt, BinOp::Ge] {
            for (a, b) in comparable {
                table.insert(op, a, b, Bool);
            }
        }
        for op in [BinOp::And, BinOp::Or] {
            table.insert(op, Bool, Bool, Bool);
        }

        table.domains = BinOp::ALL
            .into_iter()
            .map(|op| {
                let results: Vec<Dype> = table
                    .binary
                    .iter()
                    .filter(|((o, _, _), _)| *o == op)
                    .map(|(_, &result)| Dype::Base(result))
                    .collect();
                let domain = Dype::union_all(&results).simplify();
                (op, MypeArged::from_dype(&domain))
            })
            .collect();
        table
    }

    fn insert(&mut self, op: BinOp, a: BaseType, b: BaseType, result: BaseType) {
        self.binary.insert((op, a.min(b), a.max(b)), result);
    }

    pub fn lookup(&self, op: BinOp, a: BaseType, b: BaseType) -> Option<BaseType> {
        self.binary.get(&(op, a.min(b), a.max(b))).copied()
    }

    /// Everything `op` can ever produce
    pub fn domain(&self, op: BinOp) -> &MypeArged {
        static NONE: MypeArged = MypeArged::Empty;
        self.domains.get(&op).unwrap_or(&NONE)
    }

    pub fn unary(&self, op: UnOp, operand: BaseType) -> Option<BaseType> {
        match (op, operand) {
            (UnOp::Not, Bool) => Some(Bool),
            (UnOp::Neg, Int) => Some(Int),
            (UnOp::Neg, Float) => Some(Float),
            _ => None,
        }
    }

    pub fn unary_domain(&self, op: UnOp) -> MypeArged {
        match op {
            UnOp::Not => MypeArged::SingleBase(Bool),
            UnOp::Neg => MypeArged::from_leaves([Int.into(), Float.into()]),
        }
    }

    /// `len` is defined on containers only
    pub fn len_of(&self, operand: BaseType) -> Option<BaseType> {
        matches!(operand, List | Map | Set).then_some(Int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_order_independent() {
        let table = OperatorTable::standard();
        assert_eq!(table.lookup(BinOp::Add, Int, Float), Some(Float));
        assert_eq!(table.lookup(BinOp::Add, Float, Int), Some(Float));
        assert_eq!(table.lookup(BinOp::Add, Str, Str), Some(Str));
        assert_eq!(table.lookup(BinOp::Sub, Str, Str), None);
        assert_eq!(table.lookup(BinOp::Add, Int, Str), None);
        assert_eq!(table.lookup(BinOp::Lt, Float, Int), Some(Bool));
        assert_eq!(table.lookup(BinOp::And, Bool, Bool), Some(Bool));
    }

    #[test]
    fn test_domains() {
        let table = OperatorTable::standard();
        assert_eq!(table.domain(BinOp::Lt), &MypeArged::SingleBase(Bool));
        let add = table.domain(BinOp::Add);
        assert_eq!(add.leaves().len(), 3);
        assert!(!add.would_change_union_with(&MypeArged::SingleBase(Str)));
        let sub = table.domain(BinOp::Sub);
        assert!(sub.would_change_union_with(&MypeArged::SingleBase(Str)));
    }

    #[test]
    fn test_len_on_containers() {
        let table = OperatorTable::standard();
        assert_eq!(table.len_of(List), Some(Int));
        assert_eq!(table.len_of(Int), None);
    }
}
