//! Predicate-driven traversal over the graph
//!
//! Downward searches walk outgoing edges depth-first in edge order, so the
//! result is in discovery (pre-)order. Upward searches walk incoming edges
//! breadth-first, so the first match is the nearest ancestor. Both keep a
//! visited set: a node reachable along several paths is reported once.

use super::graph::Graph;
use super::kind::{NodeId, Role};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

type NodePredicate<'g> = Box<dyn Fn(&Graph, NodeId) -> bool + 'g>;

pub struct Search<'g> {
    graph: &'g Graph,
    start: NodeId,
    direction: Direction,
    include_start: bool,
    follow: fn(Role) -> bool,
    prune: Option<NodePredicate<'g>>,
}

impl<'g> Search<'g> {
    /// Search descendants of `start` (including `start`) along structural edges
    pub fn down(graph: &'g Graph, start: NodeId) -> Self {
        Self {
            graph,
            start,
            direction: Direction::Down,
            include_start: true,
            follow: Role::is_structural,
            prune: None,
        }
    }

    /// Search ancestors of `start` (excluding `start`) along structural edges
    pub fn up(graph: &'g Graph, start: NodeId) -> Self {
        Self {
            graph,
            start,
            direction: Direction::Up,
            include_start: false,
            follow: Role::is_structural,
            prune: None,
        }
    }

    /// Restrict the edges the traversal may cross
    pub fn follow(mut self, follow: fn(Role) -> bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn include_start(mut self, include: bool) -> Self {
        self.include_start = include;
        self
    }

    /// Do not continue past nodes matching `prune` (they are still reported)
    pub fn prune(mut self, prune: impl Fn(&Graph, NodeId) -> bool + 'g) -> Self {
        self.prune = Some(Box::new(prune));
        self
    }

    pub fn collect(self, filter: impl FnMut(&Graph, NodeId) -> bool) -> Vec<NodeId> {
        self.collect_until(filter, |_, _| false)
    }

    /// Collect matches, stopping as soon as `stop` holds for the latest match
    pub fn collect_until(
        self,
        mut filter: impl FnMut(&Graph, NodeId) -> bool,
        mut stop: impl FnMut(&Graph, NodeId) -> bool,
    ) -> Vec<NodeId> {
        let graph = self.graph;
        let mut found = Vec::new();
        let mut visit = |node: NodeId, found: &mut Vec<NodeId>| -> bool {
            if filter(graph, node) {
                found.push(node);
                return stop(graph, node);
            }
            false
        };
        match self.direction {
            Direction::Down => self.walk_down(&mut found, &mut visit),
            Direction::Up => self.walk_up(&mut found, &mut visit),
        }
        found
    }

    pub fn first(self, filter: impl FnMut(&Graph, NodeId) -> bool) -> Option<NodeId> {
        self.collect_until(filter, |_, _| true).into_iter().next()
    }

    fn should_expand(&self, node: NodeId) -> bool {
        node == self.start || !self.prune.as_ref().is_some_and(|prune| prune(self.graph, node))
    }

    fn walk_down(
        &self,
        found: &mut Vec<NodeId>,
        visit: &mut impl FnMut(NodeId, &mut Vec<NodeId>) -> bool,
    ) {
        let mut visited = HashSet::new();
        let mut stack = vec![self.start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if (node != self.start || self.include_start) && visit(node, found) {
                return;
            }
            if !self.should_expand(node) {
                continue;
            }
            let mut children: Vec<(Role, NodeId)> = self
                .graph
                .outgoing(node)
                .iter()
                .filter(|(role, _)| (self.follow)(*role))
                .copied()
                .collect();
            children.sort_by_key(|&(role, _)| role);
            stack.extend(children.into_iter().rev().map(|(_, child)| child));
        }
    }

    fn walk_up(
        &self,
        found: &mut Vec<NodeId>,
        visit: &mut impl FnMut(NodeId, &mut Vec<NodeId>) -> bool,
    ) {
        let mut visited = HashSet::from([self.start]);
        let mut queue = VecDeque::from([self.start]);
        while let Some(node) = queue.pop_front() {
            if (node != self.start || self.include_start) && visit(node, found) {
                return;
            }
            if !self.should_expand(node) {
                continue;
            }
            for &(role, parent) in self.graph.incoming(node) {
                if (self.follow)(role) && visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
    }
}

impl Graph {
    /// Nearest ancestor of `start` satisfying `pred`
    pub fn nearest_ancestor(
        &self,
        start: NodeId,
        pred: impl FnMut(&Graph, NodeId) -> bool,
    ) -> Option<NodeId> {
        Search::up(self, start).first(pred)
    }
}
