//! Concrete type assignment
//!
//! Once bounds are stable every typable node gets one concrete type node
//! attached through [`Role::Colored`], picked from `POS ∩ NEG`. Type nodes
//! are shared: every node colored `list<int>` points at the same `Generic`.

use super::bounds::BoundsTable;
use crate::error::{MypeError, Result};
use crate::ir::{DeclKind, ExprKind, Graph, NodeId, NodeKind, Role, StmtKind, TypeKind};
use crate::lattice::MypeArged;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorStats {
    pub colored: usize,
    /// Nodes colored `dyn`
    pub dynamic: usize,
    /// Nodes that produce nothing and were colored `void`
    pub void: usize,
}

struct Colorer<'g> {
    graph: &'g mut Graph,
    interned: HashMap<MypeArged, NodeId>,
    void: Option<NodeId>,
    stats: ColorStats,
}

/// Color every node in `nodes` from its bounds
pub fn color_all(graph: &mut Graph, bounds: &BoundsTable, nodes: &[NodeId]) -> Result<ColorStats> {
    let mut colorer = Colorer {
        graph,
        interned: HashMap::new(),
        void: None,
        stats: ColorStats::default(),
    };
    for &node in nodes {
        colorer.color(bounds, node)?;
    }
    Ok(colorer.stats)
}

impl Colorer<'_> {
    fn color(&mut self, bounds: &BoundsTable, node: NodeId) -> Result<()> {
        let Some(b) = bounds.of(node) else {
            return Ok(());
        };
        let valid = b.valid()?;
        let ty = if valid.is_empty() {
            if !self.may_produce_nothing(node) {
                return Err(MypeError::NoConsistentType {
                    node,
                    kind: self.graph.kind(node).to_string(),
                    pos: b.pos.to_string(),
                    neg: b.neg.to_string(),
                });
            }
            debug!(%node, kind = %self.graph.kind(node), "nothing produced, colored void");
            self.stats.void += 1;
            self.void_type()
        } else {
            let ty = self.concrete(&valid);
            if self.graph.kind(ty) == NodeKind::Type(TypeKind::Dynamic) {
                self.stats.dynamic += 1;
            }
            ty
        };
        self.graph.set_child(node, Role::Colored, ty);
        self.stats.colored += 1;
        Ok(())
    }

    /// Calls whose result is discarded, calls into untyped code and return
    /// placeholders of procedures
    fn may_produce_nothing(&self, node: NodeId) -> bool {
        let g = &*self.graph;
        match g.kind(node) {
            NodeKind::Expr(ExprKind::SysCall | ExprKind::DynCall | ExprKind::MethodCall) => true,
            NodeKind::Decl(DeclKind::ReturnSlot) => true,
            NodeKind::Expr(ExprKind::Call | ExprKind::ObjectInit) => g
                .parents(node)
                .any(|p| g.kind(p) == NodeKind::Stmt(StmtKind::ExprStmt)),
            _ => false,
        }
    }

    fn void_type(&mut self) -> NodeId {
        if let Some(void) = self.void {
            return void;
        }
        let void = self.graph.add(NodeKind::Type(TypeKind::Void));
        self.void = Some(void);
        void
    }

    fn concrete(&mut self, set: &MypeArged) -> NodeId {
        if let MypeArged::Class(class) = set {
            return *class;
        }
        if let Some(&ty) = self.interned.get(set) {
            return ty;
        }
        let ty = match set {
            MypeArged::Empty => return self.void_type(),
            MypeArged::All => self.graph.add(NodeKind::Type(TypeKind::Dynamic)),
            MypeArged::SingleBase(base) => self.graph.add(NodeKind::Type(TypeKind::Base(*base))),
            MypeArged::SingleArged(base, arg) => {
                let base = self.concrete(&MypeArged::SingleBase(*base));
                let arg = self.concrete(arg);
                let ty = self.graph.add(NodeKind::Type(TypeKind::Generic));
                self.graph.set_child(ty, Role::Base, base);
                self.graph.set_child(ty, Role::Arg, arg);
                ty
            }
            MypeArged::Union(_) => match set.stem() {
                Some(stem) => self.concrete(&stem),
                None => {
                    warn!(set = %set, "no common stem, falling back to dyn");
                    self.concrete(&MypeArged::All)
                }
            },
            MypeArged::Class(class) => *class,
        };
        self.interned.insert(set.clone(), ty);
        ty
    }
}

/// Type node a colored node was assigned
pub fn colored_type(graph: &Graph, node: NodeId) -> Option<NodeId> {
    graph.child(node, Role::Colored)
}

/// Render a type node the way it would be written in source
pub fn describe_type(graph: &Graph, ty: NodeId) -> String {
    match graph.kind(ty) {
        NodeKind::Type(TypeKind::Base(base)) => base.name().to_string(),
        NodeKind::Type(TypeKind::Generic) => {
            let part = |role| {
                graph
                    .child(ty, role)
                    .map_or_else(|| "?".to_string(), |n| describe_type(graph, n))
            };
            format!("{}<{}>", part(Role::Base), part(Role::Arg))
        }
        NodeKind::Type(TypeKind::Named) => match graph.child(ty, Role::Ref) {
            Some(class) => describe_type(graph, class),
            None => graph.name(ty).unwrap_or("?").to_string(),
        },
        NodeKind::Type(TypeKind::Dynamic) => "dyn".to_string(),
        NodeKind::Type(TypeKind::Void) => "void".to_string(),
        NodeKind::Decl(DeclKind::Class) => graph.name(ty).unwrap_or("?").to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::BaseType;

    fn table_with(node: NodeId, pos: MypeArged, neg: MypeArged) -> BoundsTable {
        let mut table = BoundsTable::new();
        let slot = table.fresh(node);
        table.widen(slot, &pos).unwrap();
        table.narrow(slot, &neg).unwrap();
        table
    }

    #[test]
    fn test_type_nodes_are_shared() {
        let mut g = Graph::new();
        let a = g.add(NodeKind::Expr(ExprKind::ListLit));
        let b = g.add(NodeKind::Expr(ExprKind::ListLit));
        let list_int = MypeArged::arged(BaseType::List, BaseType::Int.into());
        let mut table = table_with(a, list_int.clone(), MypeArged::All);
        let slot = table.fresh(b);
        table.widen(slot, &list_int).unwrap();

        let stats = color_all(&mut g, &table, &[a, b]).unwrap();
        assert_eq!(stats.colored, 2);
        let ty = colored_type(&g, a).unwrap();
        assert_eq!(colored_type(&g, b), Some(ty));
        assert_eq!(describe_type(&g, ty), "list<int>");
    }

    #[test]
    fn test_union_without_stem_is_dynamic() {
        let mut g = Graph::new();
        let n = g.add(NodeKind::Expr(ExprKind::Ident));
        let pos = MypeArged::from_leaves([BaseType::Int.into(), BaseType::String.into()]);
        let table = table_with(n, pos, MypeArged::All);

        let stats = color_all(&mut g, &table, &[n]).unwrap();
        assert_eq!(stats.dynamic, 1);
        assert_eq!(describe_type(&g, colored_type(&g, n).unwrap()), "dyn");
    }

    #[test]
    fn test_empty_valid_set_is_an_error() {
        let mut g = Graph::new();
        let n = g.add(NodeKind::Expr(ExprKind::StrLit));
        let table = table_with(n, BaseType::String.into(), BaseType::Int.into());

        let err = color_all(&mut g, &table, &[n]).unwrap_err();
        assert!(matches!(err, MypeError::NoConsistentType { node, .. } if node == n));
    }

    #[test]
    fn test_system_calls_may_produce_nothing() {
        let mut g = Graph::new();
        let n = g.add(NodeKind::Expr(ExprKind::SysCall));
        let table = table_with(n, MypeArged::Empty, MypeArged::All);

        let stats = color_all(&mut g, &table, &[n]).unwrap();
        assert_eq!(stats.void, 1);
        assert_eq!(describe_type(&g, colored_type(&g, n).unwrap()), "void");
    }
}
