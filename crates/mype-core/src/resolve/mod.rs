//! Identifier and scope resolution
//!
//! Two passes. [`Scopes::collect`] first records every binding of every
//! scope host, so a read that textually precedes the first write of a name
//! still finds it. The resolution rules then run to a fixpoint over the
//! whole program and link each reference to its definition through a
//! [`Role::Ref`] edge:
//! - identifiers resolve to locals, parameters or class fields
//! - `self.field` resolves to the field of the enclosing class
//! - calls become system calls, dynamic calls, function calls or object constructions
//! - named types resolve to base types or classes

mod builtins;
mod scope;

pub use builtins::{is_builtin, BUILTINS};
pub use scope::{ScopeTable, Scopes};

use crate::error::{MypeError, Result};
use crate::ir::{
    DeclKind, ExprKind, Graph, GraphPatch, NodeId, NodeKind, Role, Search, TypeKind,
};
use crate::lattice::BaseType;
use crate::rewrite::{FixpointStats, RewriteContext, Rewriter, Rule, RuleSet};
use tracing::{debug, info};

/// Graph plus the symbol tables the resolution rules consult
pub struct Resolution<'g> {
    graph: &'g mut Graph,
    scopes: Scopes,
}

impl<'g> Resolution<'g> {
    /// Symbol tables collected before the rules run
    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }
}

impl RewriteContext for Resolution<'_> {
    type Patch = GraphPatch;

    fn graph(&self) -> &Graph {
        self.graph
    }

    fn commit(&mut self, patch: GraphPatch) -> Result<()> {
        self.graph.apply_patch(patch)?;
        Ok(())
    }
}

/// Symbol counts and rule statistics of one resolution run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub definitions: usize,
    pub functions: usize,
    pub classes: usize,
    pub stats: FixpointStats,
}

/// Links every reference in a program to its definition
pub struct Resolver {
    rewriter: Rewriter,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Rewriter::new())
    }
}

impl Resolver {
    /// Resolver driving its rules with `rewriter`
    pub fn new(rewriter: Rewriter) -> Self {
        Self { rewriter }
    }

    /// Resolve every identifier, call and named type under `root`
    pub fn run(&self, graph: &mut Graph, root: NodeId) -> Result<ResolveReport> {
        info!(root = %root, "resolving identifiers");
        let scopes = Scopes::collect(graph, root)?;
        let report = ResolveReport {
            definitions: scopes.definitions(),
            functions: scopes.functions().count(),
            classes: scopes.classes().count(),
            stats: FixpointStats::default(),
        };
        debug!(
            definitions = report.definitions,
            functions = report.functions,
            classes = report.classes,
            "symbol tables collected"
        );

        let candidates = Search::down(graph, root).collect(|_, _| true);
        let rules: RuleSet<Resolution<'_>> = vec![
            Box::new(ResolveIdent),
            Box::new(ResolveSelfField),
            Box::new(ResolveCall),
            Box::new(ResolveNamedType),
        ];
        let mut cx = Resolution { graph, scopes };
        let stats = self.rewriter.fixpoint(&mut cx, &rules, &candidates)?;

        check_resolved(cx.graph, root)?;
        Ok(ResolveReport { stats, ..report })
    }
}

/// Anything still unresolved once the rules are quiet is an error
fn check_resolved(graph: &Graph, root: NodeId) -> Result<()> {
    let unresolved = Search::down(graph, root).first(|g, n| {
        matches!(
            g.kind(n),
            NodeKind::Expr(ExprKind::Call) | NodeKind::Type(TypeKind::Named)
        ) && !g.has_child(n, Role::Ref)
    });
    let Some(node) = unresolved else {
        return Ok(());
    };
    let name = graph.require_name(node)?.to_string();
    Err(match graph.kind(node) {
        NodeKind::Type(_) => MypeError::UnknownClass { name, node },
        _ => MypeError::UnknownFunction { name, node },
    })
}

fn unresolved(g: &Graph, node: NodeId, kind: NodeKind) -> bool {
    g.kind(node) == kind && !g.has_child(node, Role::Ref)
}

fn link(node: NodeId, def: NodeId) -> GraphPatch {
    let mut patch = GraphPatch::new();
    patch.set_child(node, Role::Ref, def);
    patch
}

/// Identifier → nearest visible definition, else a top-level function
pub struct ResolveIdent;

impl<'g> Rule<Resolution<'g>> for ResolveIdent {
    fn name(&self) -> &'static str {
        "resolve-ident"
    }

    fn applies(&self, cx: &Resolution<'g>, node: NodeId) -> bool {
        unresolved(cx.graph(), node, NodeKind::Expr(ExprKind::Ident))
    }

    fn rewrite(&self, cx: &Resolution<'g>, node: NodeId) -> Result<Option<GraphPatch>> {
        let g = cx.graph();
        let name = g.require_name(node)?;
        let def = cx
            .scopes
            .lookup_var(g, node, name)
            .or_else(|| cx.scopes.function(name))
            .ok_or_else(|| MypeError::UnknownIdentifier {
                name: name.to_string(),
                node,
            })?;
        Ok(Some(link(node, def)))
    }
}

/// `self.field` → field of the enclosing class
pub struct ResolveSelfField;

impl<'g> Rule<Resolution<'g>> for ResolveSelfField {
    fn name(&self) -> &'static str {
        "resolve-self-field"
    }

    fn applies(&self, cx: &Resolution<'g>, node: NodeId) -> bool {
        let g = cx.graph();
        unresolved(g, node, NodeKind::Expr(ExprKind::FieldGet))
            && g.child(node, Role::Receiver)
                .is_some_and(|r| g.kind(r) == NodeKind::Expr(ExprKind::SelfRef))
    }

    fn rewrite(&self, cx: &Resolution<'g>, node: NodeId) -> Result<Option<GraphPatch>> {
        let g = cx.graph();
        let name = g.require_name(node)?;
        let unknown = || MypeError::UnknownIdentifier {
            name: format!("self.{name}"),
            node,
        };
        let class = g
            .nearest_ancestor(node, |g, n| g.kind(n) == NodeKind::Decl(DeclKind::Class))
            .ok_or_else(unknown)?;
        let field = cx
            .scopes
            .table(class)
            .and_then(|table| table.get(name))
            .ok_or_else(unknown)?;
        Ok(Some(link(node, field)))
    }
}

/// Named calls: builtin, variable holding a callable, function or class
pub struct ResolveCall;

impl<'g> Rule<Resolution<'g>> for ResolveCall {
    fn name(&self) -> &'static str {
        "resolve-call"
    }

    fn applies(&self, cx: &Resolution<'g>, node: NodeId) -> bool {
        unresolved(cx.graph(), node, NodeKind::Expr(ExprKind::Call))
    }

    fn rewrite(&self, cx: &Resolution<'g>, node: NodeId) -> Result<Option<GraphPatch>> {
        let g = cx.graph();
        let name = g.require_name(node)?;
        let mut patch = GraphPatch::new();
        if is_builtin(name) {
            patch.set_kind(node, NodeKind::Expr(ExprKind::SysCall));
        } else if let Some(var) = cx.scopes.lookup_var(g, node, name) {
            patch
                .set_kind(node, NodeKind::Expr(ExprKind::DynCall))
                .set_child(node, Role::Ref, var);
        } else if let Some(func) = cx.scopes.function(name) {
            patch.set_child(node, Role::Ref, func);
        } else if let Some(class) = cx.scopes.class(name) {
            patch
                .set_kind(node, NodeKind::Expr(ExprKind::ObjectInit))
                .set_child(node, Role::Ref, class);
        } else {
            // left for the final check
            return Ok(None);
        }
        Ok(Some(patch))
    }
}

/// Type names: base types become base type nodes, class names link to the class
pub struct ResolveNamedType;

impl<'g> Rule<Resolution<'g>> for ResolveNamedType {
    fn name(&self) -> &'static str {
        "resolve-named-type"
    }

    fn applies(&self, cx: &Resolution<'g>, node: NodeId) -> bool {
        unresolved(cx.graph(), node, NodeKind::Type(TypeKind::Named))
    }

    fn rewrite(&self, cx: &Resolution<'g>, node: NodeId) -> Result<Option<GraphPatch>> {
        let name = cx.graph().require_name(node)?;
        let mut patch = GraphPatch::new();
        if let Some(base) = BaseType::from_name(name) {
            patch.set_kind(node, NodeKind::Type(TypeKind::Base(base)));
        } else if name == "dyn" {
            patch.set_kind(node, NodeKind::Type(TypeKind::Dynamic));
        } else if let Some(class) = cx.scopes.class(name) {
            patch.set_child(node, Role::Ref, class);
        } else {
            return Ok(None);
        }
        Ok(Some(patch))
    }
}
