//! Deferred graph edits
//!
//! Rewrite rules never touch the graph directly. They describe their effect
//! as a [`GraphPatch`], which may mention nodes that do not exist yet through
//! [`Handle::New`], and the patch is committed by [`Graph::apply_patch`].

use super::graph::Graph;
use super::kind::{NodeId, NodeKind, Payload, Role};
use crate::error::GraphError;

/// Node reference inside a patch: an existing node or one the patch creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Old(NodeId),
    New(usize),
}

impl From<NodeId> for Handle {
    fn from(id: NodeId) -> Self {
        Handle::Old(id)
    }
}

#[derive(Debug, Clone)]
enum Edit {
    SetChild(Handle, Role, Handle),
    RemoveChild(Handle, Role),
    PushItem(Handle, Handle),
    ClearItems(Handle),
    Replace(Handle, Handle),
    Detach(Handle),
    SetKind(Handle, NodeKind),
    SetPayload(Handle, Payload),
}

/// Graph edits described as data, committed by [`Graph::apply_patch`]
#[derive(Debug, Clone, Default)]
pub struct GraphPatch {
    nodes: Vec<(NodeKind, Payload)>,
    edits: Vec<Edit>,
}

impl GraphPatch {
    /// Patch that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the patch neither creates nodes nor edits edges
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edits.is_empty()
    }

    /// Create a node when the patch is applied
    pub fn node(&mut self, kind: NodeKind) -> Handle {
        self.node_with(kind, Payload::None)
    }

    /// Create a node with a payload when the patch is applied
    pub fn node_with(&mut self, kind: NodeKind, payload: impl Into<Payload>) -> Handle {
        self.nodes.push((kind, payload.into()));
        Handle::New(self.nodes.len() - 1)
    }

    /// Set the single-valued edge `role` of `src`
    pub fn set_child(&mut self, src: impl Into<Handle>, role: Role, dst: impl Into<Handle>) -> &mut Self {
        self.edits.push(Edit::SetChild(src.into(), role, dst.into()));
        self
    }

    /// Remove the edge `role` of `src`
    pub fn remove_child(&mut self, src: impl Into<Handle>, role: Role) -> &mut Self {
        self.edits.push(Edit::RemoveChild(src.into(), role));
        self
    }

    /// Append `dst` to the ordered child list of `src`
    pub fn push_item(&mut self, src: impl Into<Handle>, dst: impl Into<Handle>) -> &mut Self {
        self.edits.push(Edit::PushItem(src.into(), dst.into()));
        self
    }

    /// Drop the ordered child list of `src`
    pub fn clear_items(&mut self, src: impl Into<Handle>) -> &mut Self {
        self.edits.push(Edit::ClearItems(src.into()));
        self
    }

    /// Redirect every edge targeting `old` to `new`
    pub fn replace(&mut self, old: impl Into<Handle>, new: impl Into<Handle>) -> &mut Self {
        self.edits.push(Edit::Replace(old.into(), new.into()));
        self
    }

    /// Drop every outgoing edge of `node`
    pub fn detach(&mut self, node: impl Into<Handle>) -> &mut Self {
        self.edits.push(Edit::Detach(node.into()));
        self
    }

    /// Change the kind of `node`
    pub fn set_kind(&mut self, node: impl Into<Handle>, kind: NodeKind) -> &mut Self {
        self.edits.push(Edit::SetKind(node.into(), kind));
        self
    }

    /// Replace the payload of `node`
    pub fn set_payload(&mut self, node: impl Into<Handle>, payload: impl Into<Payload>) -> &mut Self {
        self.edits.push(Edit::SetPayload(node.into(), payload.into()));
        self
    }

    /// Retire `old` in favour of `new`: redirect its parents, then drop its edges
    pub fn retire(&mut self, old: NodeId, new: impl Into<Handle>) -> &mut Self {
        self.replace(old, new).detach(old)
    }
}

impl Graph {
    /// Commit a patch; returns the ids of the nodes it created, in creation order
    pub fn apply_patch(&mut self, patch: GraphPatch) -> Result<Vec<NodeId>, GraphError> {
        let created: Vec<NodeId> = patch
            .nodes
            .into_iter()
            .map(|(kind, payload)| self.add_with(kind, payload))
            .collect();
        let resolve = |h: Handle| -> Result<NodeId, GraphError> {
            match h {
                Handle::Old(id) => Ok(id),
                Handle::New(i) => created.get(i).copied().ok_or(GraphError::StaleHandle(i)),
            }
        };
        for edit in patch.edits {
            match edit {
                Edit::SetChild(src, role, dst) => self.set_child(resolve(src)?, role, resolve(dst)?),
                Edit::RemoveChild(src, role) => {
                    self.remove_child(resolve(src)?, role);
                }
                Edit::PushItem(src, dst) => {
                    self.push_item(resolve(src)?, resolve(dst)?);
                }
                Edit::ClearItems(src) => self.clear_items(resolve(src)?),
                Edit::Replace(old, new) => {
                    self.replace(resolve(old)?, resolve(new)?);
                }
                Edit::Detach(node) => self.detach(resolve(node)?),
                Edit::SetKind(node, kind) => self.set_kind(resolve(node)?, kind),
                Edit::SetPayload(node, payload) => self.set_payload(resolve(node)?, payload),
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::kind::{ExprKind, StmtKind};

    #[test]
    fn test_patch_creates_and_links_nodes() {
        let mut g = Graph::new();
        let stmt = g.add(NodeKind::Stmt(StmtKind::ExprStmt));
        let old = g.add_with(NodeKind::Expr(ExprKind::Ident), "xs");
        g.set_child(stmt, Role::Value, old);

        let mut patch = GraphPatch::new();
        let len = patch.node(NodeKind::Expr(ExprKind::Len));
        patch.replace(old, len).set_child(len, Role::Operand, old);
        let created = g.apply_patch(patch).unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(g.child(stmt, Role::Value), Some(created[0]));
        assert_eq!(g.child(created[0], Role::Operand), Some(old));
    }

    #[test]
    fn test_retire_detaches_old_node() {
        let mut g = Graph::new();
        let stmt = g.add(NodeKind::Stmt(StmtKind::ExprStmt));
        let old = g.add(NodeKind::Expr(ExprKind::Len));
        let operand = g.add_with(NodeKind::Expr(ExprKind::Ident), "xs");
        g.set_child(stmt, Role::Value, old);
        g.set_child(old, Role::Operand, operand);

        let mut patch = GraphPatch::new();
        patch.retire(old, operand);
        g.apply_patch(patch).unwrap();

        assert_eq!(g.child(stmt, Role::Value), Some(operand));
        assert!(g.outgoing(old).is_empty());
        assert_eq!(g.incoming(operand), &[(Role::Value, stmt)]);
    }

    #[test]
    fn test_empty_patch() {
        assert!(GraphPatch::new().is_empty());
    }
}
