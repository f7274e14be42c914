//! Arena-backed program graph
//!
//! Nodes live in a single arena and are addressed by [`NodeId`]. Every edge
//! is recorded twice, as an outgoing `(role, target)` pair on its source and
//! as an incoming `(role, source)` pair on its target, so ancestor queries are
//! as cheap as descendant queries. Nodes are never freed; a node retired by
//! [`Graph::replace`] simply becomes unreachable.

use super::kind::{NodeId, NodeKind, Payload, Role};
use crate::error::GraphError;
use smallvec::SmallVec;
use std::collections::HashSet;

type Edges = SmallVec<[(Role, NodeId); 4]>;

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    payload: Payload,
    outgoing: Edges,
    incoming: Vec<(Role, NodeId)>,
}

impl Node {
    /// Syntactic category of this node
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Literal value or name carried by this node
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever added, retired ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node without payload
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.add_with(kind, Payload::None)
    }

    /// Add a node carrying `payload`
    pub fn add_with(&mut self, kind: NodeKind, payload: impl Into<Payload>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            payload: payload.into(),
            outgoing: Edges::new(),
            incoming: Vec::new(),
        });
        id
    }

    /// Node record for `id`; panics on an id from another graph
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Kind of `id`
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    /// Change the kind of `id` in place, keeping its edges
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    /// Payload of `id`
    pub fn payload(&self, id: NodeId) -> &Payload {
        &self.nodes[id.index()].payload
    }

    /// Replace the payload of `id`
    pub fn set_payload(&mut self, id: NodeId, payload: impl Into<Payload>) {
        self.nodes[id.index()].payload = payload.into();
    }

    /// String payload of a node, used for names of identifiers, calls and declarations
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.payload(id).as_str()
    }

    /// Like [`Graph::name`], but a missing name is an error
    pub fn require_name(&self, id: NodeId) -> Result<&str, GraphError> {
        self.name(id).ok_or(GraphError::MissingPayload {
            node: id,
            expected: "name",
        })
    }

    /// Outgoing `(role, target)` pairs of `id`
    pub fn outgoing(&self, id: NodeId) -> &[(Role, NodeId)] {
        &self.nodes[id.index()].outgoing
    }

    /// Incoming `(role, source)` pairs of `id`
    pub fn incoming(&self, id: NodeId) -> &[(Role, NodeId)] {
        &self.nodes[id.index()].incoming
    }

    /// Sources of the structural edges pointing at `id`
    pub fn parents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming(id)
            .iter()
            .filter(|(role, _)| role.is_structural())
            .map(|&(_, src)| src)
    }

    /// Target of the single-valued edge `role` of `id`
    pub fn child(&self, id: NodeId, role: Role) -> Option<NodeId> {
        self.outgoing(id)
            .iter()
            .find(|(r, _)| *r == role)
            .map(|&(_, dst)| dst)
    }

    /// Whether `id` has an edge labelled `role`
    pub fn has_child(&self, id: NodeId, role: Role) -> bool {
        self.child(id, role).is_some()
    }

    /// Like [`Graph::child`], but a missing edge is an error
    pub fn require_child(&self, id: NodeId, role: Role) -> Result<NodeId, GraphError> {
        self.child(id, role).ok_or_else(|| GraphError::MissingChild {
            node: id,
            role: role.to_string(),
        })
    }

    /// Set the single-valued edge `role` of `src`, replacing any previous one
    pub fn set_child(&mut self, src: NodeId, role: Role, dst: NodeId) {
        self.remove_child(src, role);
        self.link(src, role, dst);
    }

    /// Remove the edge `role` of `src`, returning its old target
    pub fn remove_child(&mut self, src: NodeId, role: Role) -> Option<NodeId> {
        let outgoing = &mut self.nodes[src.index()].outgoing;
        let pos = outgoing.iter().position(|(r, _)| *r == role)?;
        let (_, old) = outgoing.remove(pos);
        self.unlink_incoming(old, role, src);
        Some(old)
    }

    /// Append `dst` to the ordered child list of `src`
    pub fn push_item(&mut self, src: NodeId, dst: NodeId) -> u32 {
        let next = self
            .outgoing(src)
            .iter()
            .filter_map(|(role, _)| match role {
                Role::Item(i) => Some(i + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        self.link(src, Role::Item(next), dst);
        next
    }

    /// Ordered child list of `src`
    pub fn items(&self, src: NodeId) -> Vec<NodeId> {
        let mut items: Vec<(u32, NodeId)> = self
            .outgoing(src)
            .iter()
            .filter_map(|&(role, dst)| match role {
                Role::Item(i) => Some((i, dst)),
                _ => None,
            })
            .collect();
        items.sort_by_key(|&(i, _)| i);
        items.into_iter().map(|(_, dst)| dst).collect()
    }

    /// Drop the ordered child list of `src`
    pub fn clear_items(&mut self, src: NodeId) {
        let removed: Vec<(Role, NodeId)> = self.nodes[src.index()]
            .outgoing
            .iter()
            .filter(|(role, _)| role.is_item())
            .copied()
            .collect();
        self.nodes[src.index()]
            .outgoing
            .retain(|(role, _)| !role.is_item());
        for (role, dst) in removed {
            self.unlink_incoming(dst, role, src);
        }
    }

    /// Drop every outgoing edge of `id`, turning a retired node into an inert leaf
    pub fn detach(&mut self, id: NodeId) {
        let outgoing = std::mem::take(&mut self.nodes[id.index()].outgoing);
        for (role, dst) in outgoing {
            self.unlink_incoming(dst, role, id);
        }
    }

    /// Redirect every edge targeting `old` to target `new` instead
    ///
    /// Edges whose source is `new` itself are left alone, since redirecting
    /// them would create a self-loop. Returns the number of redirected edges.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> usize {
        if old == new {
            return 0;
        }
        let incoming = std::mem::take(&mut self.nodes[old.index()].incoming);
        let mut kept = Vec::new();
        let mut moved = 0;
        for (role, src) in incoming {
            if src == new {
                kept.push((role, src));
                continue;
            }
            for edge in self.nodes[src.index()].outgoing.iter_mut() {
                if edge.0 == role && edge.1 == old {
                    edge.1 = new;
                }
            }
            self.nodes[new.index()].incoming.push((role, src));
            moved += 1;
        }
        self.nodes[old.index()].incoming = kept;
        moved
    }

    /// Structural equality over kind, payload and every outgoing edge by role
    ///
    /// Pairs under comparison are assumed equal when met again, which keeps
    /// the walk finite on shared or cyclic substructure.
    pub fn deep_eq(&self, a: NodeId, b: NodeId) -> bool {
        let mut assumed = HashSet::new();
        self.deep_eq_inner(a, b, &mut assumed)
    }

    fn deep_eq_inner(&self, a: NodeId, b: NodeId, assumed: &mut HashSet<(NodeId, NodeId)>) -> bool {
        if a == b || !assumed.insert((a, b)) {
            return true;
        }
        let (na, nb) = (self.node(a), self.node(b));
        if na.kind != nb.kind || na.payload != nb.payload || na.outgoing.len() != nb.outgoing.len() {
            return false;
        }
        let mut ea: Vec<_> = na.outgoing.iter().copied().collect();
        let mut eb: Vec<_> = nb.outgoing.iter().copied().collect();
        ea.sort_by_key(|&(role, _)| role);
        eb.sort_by_key(|&(role, _)| role);
        ea.iter()
            .zip(eb.iter())
            .all(|(&(ra, ca), &(rb, cb))| ra == rb && self.deep_eq_inner(ca, cb, assumed))
    }

    fn link(&mut self, src: NodeId, role: Role, dst: NodeId) {
        self.nodes[src.index()].outgoing.push((role, dst));
        self.nodes[dst.index()].incoming.push((role, src));
    }

    fn unlink_incoming(&mut self, dst: NodeId, role: Role, src: NodeId) {
        let incoming = &mut self.nodes[dst.index()].incoming;
        if let Some(pos) = incoming.iter().position(|&(r, s)| r == role && s == src) {
            incoming.remove(pos);
        }
    }
}
