//! Per-node POS/NEG bounds
//!
//! Bounds live in a side table keyed by node rather than on the graph. A
//! definition and every reference to it are bound to the same slot, which
//! is how a write through one name becomes visible through all the others.

use crate::error::{GraphError, Result};
use crate::ir::{Graph, NodeId, NodeKind, Role, TypeKind};
use crate::lattice::MypeArged;
use std::collections::HashMap;

static EMPTY: MypeArged = MypeArged::Empty;
static ALL: MypeArged = MypeArged::All;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

/// POS grows by union only, NEG shrinks by intersection only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds {
    pub pos: MypeArged,
    pub neg: MypeArged,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            pos: MypeArged::Empty,
            neg: MypeArged::All,
        }
    }
}

impl Bounds {
    pub fn valid(&self) -> Result<MypeArged> {
        Ok(self.pos.try_intersection(&self.neg)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoundsTable {
    slots: Vec<Bounds>,
    by_node: HashMap<NodeId, SlotId>,
}

impl BoundsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `node` a slot of its own
    pub fn fresh(&mut self, node: NodeId) -> SlotId {
        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(Bounds::default());
        self.by_node.insert(node, slot);
        slot
    }

    /// Bind `node` to an existing slot
    pub fn alias(&mut self, node: NodeId, slot: SlotId) {
        self.by_node.insert(node, slot);
    }

    pub fn slot(&self, node: NodeId) -> Option<SlotId> {
        self.by_node.get(&node).copied()
    }

    pub fn get(&self, slot: SlotId) -> &Bounds {
        &self.slots[slot.0 as usize]
    }

    pub fn of(&self, node: NodeId) -> Option<&Bounds> {
        self.slot(node).map(|slot| self.get(slot))
    }

    /// POS of `node`; nodes without bounds have produced nothing
    pub fn pos(&self, node: NodeId) -> &MypeArged {
        self.of(node).map_or(&EMPTY, |b| &b.pos)
    }

    /// NEG of `node`; nodes without bounds accept anything
    pub fn neg(&self, node: NodeId) -> &MypeArged {
        self.of(node).map_or(&ALL, |b| &b.neg)
    }

    /// Number of distinct slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn widen(&mut self, slot: SlotId, with: &MypeArged) -> Result<bool> {
        let bounds = &mut self.slots[slot.0 as usize];
        if !bounds.pos.would_change_union_with(with) {
            return Ok(false);
        }
        bounds.pos = bounds.pos.try_union(with)?;
        Ok(true)
    }

    pub fn narrow(&mut self, slot: SlotId, with: &MypeArged) -> Result<bool> {
        let bounds = &mut self.slots[slot.0 as usize];
        if !bounds.neg.would_change_intersection_with(with) {
            return Ok(false);
        }
        bounds.neg = bounds.neg.try_intersection(with)?;
        Ok(true)
    }

    pub fn apply(&mut self, patch: BoundsPatch) -> Result<usize> {
        let mut changed = 0;
        for (slot, with) in &patch.widen {
            changed += usize::from(self.widen(*slot, with)?);
        }
        for (slot, with) in &patch.narrow {
            changed += usize::from(self.narrow(*slot, with)?);
        }
        Ok(changed)
    }
}

/// Bound updates produced by one rule firing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsPatch {
    widen: Vec<(SlotId, MypeArged)>,
    narrow: Vec<(SlotId, MypeArged)>,
}

impl BoundsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.widen.is_empty() && self.narrow.is_empty()
    }

    /// Queue `POS(node) ∪= with` if it would change anything
    pub fn widen(&mut self, table: &BoundsTable, node: NodeId, with: MypeArged) -> &mut Self {
        if let Some(slot) = table.slot(node) {
            if table.get(slot).pos.would_change_union_with(&with) {
                self.widen.push((slot, with));
            }
        }
        self
    }

    /// Queue `NEG(node) ∩= with` if it would change anything
    pub fn narrow(&mut self, table: &BoundsTable, node: NodeId, with: MypeArged) -> &mut Self {
        if let Some(slot) = table.slot(node) {
            if table.get(slot).neg.would_change_intersection_with(&with) {
                self.narrow.push((slot, with));
            }
        }
        self
    }

    /// `None` when nothing was queued, so a quiet rule does not count as fired
    pub fn into_option(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

/// Type-set denoted by a type annotation
pub fn annotation_set(graph: &Graph, ty: NodeId) -> Result<MypeArged> {
    Ok(match graph.kind(ty) {
        NodeKind::Type(TypeKind::Base(base)) => MypeArged::SingleBase(base),
        NodeKind::Type(TypeKind::Generic) => {
            let base = graph.require_child(ty, Role::Base)?;
            let NodeKind::Type(TypeKind::Base(base)) = graph.kind(base) else {
                return Err(GraphError::MissingPayload {
                    node: base,
                    expected: "base type",
                }
                .into());
            };
            let arg = annotation_set(graph, graph.require_child(ty, Role::Arg)?)?;
            let set = MypeArged::arged(base, arg);
            set.check()?;
            set
        }
        NodeKind::Type(TypeKind::Named) => MypeArged::Class(graph.require_child(ty, Role::Ref)?),
        NodeKind::Type(TypeKind::Dynamic) => MypeArged::All,
        NodeKind::Type(TypeKind::Void) => MypeArged::Empty,
        _ => {
            return Err(GraphError::MissingPayload {
                node: ty,
                expected: "type annotation",
            }
            .into())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ProgramBuilder;
    use crate::lattice::BaseType;

    #[test]
    fn test_aliased_nodes_share_bounds() {
        let mut table = BoundsTable::new();
        let def = table.fresh(NodeId(1));
        table.alias(NodeId(2), def);
        table.widen(def, &MypeArged::SingleBase(BaseType::Int)).unwrap();
        assert_eq!(table.pos(NodeId(2)), &MypeArged::SingleBase(BaseType::Int));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_patch_skips_unchanged_updates() {
        let mut table = BoundsTable::new();
        let slot = table.fresh(NodeId(0));
        table.widen(slot, &MypeArged::SingleBase(BaseType::Int)).unwrap();

        let mut patch = BoundsPatch::new();
        patch
            .widen(&table, NodeId(0), MypeArged::SingleBase(BaseType::Int))
            .narrow(&table, NodeId(0), MypeArged::All);
        assert!(patch.into_option().is_none());

        let mut patch = BoundsPatch::new();
        patch.narrow(&table, NodeId(0), MypeArged::SingleBase(BaseType::Float));
        assert_eq!(table.apply(patch).unwrap(), 1);
        assert_eq!(table.neg(NodeId(0)), &MypeArged::SingleBase(BaseType::Float));
    }

    #[test]
    fn test_unbound_nodes_default() {
        let table = BoundsTable::new();
        assert!(table.pos(NodeId(9)).is_empty());
        assert!(table.neg(NodeId(9)).is_all());
    }

    #[test]
    fn test_annotation_sets() {
        let mut b = ProgramBuilder::new();
        let int = b.base_type(BaseType::Int);
        let list_int = b.generic_type(BaseType::List, int);
        let dynamic = b.dynamic_type();
        let g = b.graph();
        assert_eq!(
            annotation_set(g, list_int).unwrap(),
            MypeArged::arged(BaseType::List, MypeArged::SingleBase(BaseType::Int))
        );
        assert_eq!(annotation_set(g, dynamic).unwrap(), MypeArged::All);
    }
}
