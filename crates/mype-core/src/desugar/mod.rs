//! Lowering of surface sugar to primitive constructs
//!
//! Every rule here fires at most once per node and none produces sugar, so
//! a single pass of each rule in order is enough:
//! 1. flat operator sequences fold into binary trees
//! 2. dot-pipes become nested calls
//! 3. dotted chains become field reads and method calls
//! 4. keyword arguments collect into a trailing map literal
//! 5. `for … in` loops become index-driven `while` loops
//!
//! Afterwards no [`SyntaxKind`] node may remain reachable.

mod operators;

pub use operators::FoldOperators;

use crate::error::{MypeError, Result};
use crate::ir::{
    BinOp, ExprKind, Graph, GraphPatch, Handle, NodeId, NodeKind, Payload, Role, Search, StmtKind,
    SyntaxKind,
};
use crate::rewrite::{Rewriter, Rule, RuleSet};
use tracing::{debug, info};

/// A node still hanging in the tree; retired nodes have no parents
fn is_attached(g: &Graph, node: NodeId) -> bool {
    g.parents(node).next().is_some()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DesugarReport {
    pub firings: usize,
}

pub struct Desugarer {
    rewriter: Rewriter,
    rules: RuleSet<Graph>,
}

impl Default for Desugarer {
    fn default() -> Self {
        Self::new(Rewriter::new())
    }
}

impl Desugarer {
    pub fn new(rewriter: Rewriter) -> Self {
        let rules: RuleSet<Graph> = vec![
            Box::new(FoldOperators),
            Box::new(LowerDotPipe),
            Box::new(LowerDotted),
            Box::new(CollectKeywordArgs),
            Box::new(LowerForIn),
        ];
        Self { rewriter, rules }
    }

    pub fn run(&self, graph: &mut Graph, root: NodeId) -> Result<DesugarReport> {
        info!(root = %root, "desugaring");
        let firings = self.rewriter.apply_once(graph, &self.rules, root)?;

        let residue = Search::down(graph, root)
            .first(|g, n| matches!(g.kind(n), NodeKind::Syntax(_)));
        if let Some(node) = residue {
            return Err(MypeError::desugar(
                node,
                format!("{} left after desugaring", graph.kind(node)),
            ));
        }

        debug!(firings, "desugaring complete");
        Ok(DesugarReport { firings })
    }
}

/// `head .f(a) .g()` → `g(f(head, a))`
pub struct LowerDotPipe;

impl Rule<Graph> for LowerDotPipe {
    fn name(&self) -> &'static str {
        "dot-pipe"
    }

    fn applies(&self, g: &Graph, node: NodeId) -> bool {
        g.kind(node) == NodeKind::Syntax(SyntaxKind::DotPipe) && is_attached(g, node)
    }

    fn rewrite(&self, g: &Graph, node: NodeId) -> Result<Option<GraphPatch>> {
        let items = g.items(node);
        let Some((&head, calls)) = items.split_first() else {
            return Err(MypeError::desugar(node, "empty dot-pipe"));
        };

        let mut patch = GraphPatch::new();
        let mut acc = head;
        for &call in calls {
            if g.kind(call) != NodeKind::Expr(ExprKind::Call) {
                return Err(MypeError::desugar(call, "dot-pipe stage is not a call"));
            }
            patch.clear_items(call).push_item(call, acc);
            for arg in g.items(call) {
                patch.push_item(call, arg);
            }
            acc = call;
        }
        patch.retire(node, acc);
        Ok(Some(patch))
    }
}

/// `base.field.method(a)` → `MethodCall(FieldGet(base, field), method, a)`
pub struct LowerDotted;

impl Rule<Graph> for LowerDotted {
    fn name(&self) -> &'static str {
        "dotted-access"
    }

    fn applies(&self, g: &Graph, node: NodeId) -> bool {
        g.kind(node) == NodeKind::Syntax(SyntaxKind::Dotted) && is_attached(g, node)
    }

    fn rewrite(&self, g: &Graph, node: NodeId) -> Result<Option<GraphPatch>> {
        let items = g.items(node);
        let Some((&base, segments)) = items.split_first() else {
            return Err(MypeError::desugar(node, "empty dotted chain"));
        };

        let mut patch = GraphPatch::new();
        let mut acc = base;
        for &segment in segments {
            let lowered = match g.kind(segment) {
                NodeKind::Expr(ExprKind::Ident) => ExprKind::FieldGet,
                NodeKind::Expr(ExprKind::Call) => ExprKind::MethodCall,
                other => {
                    return Err(MypeError::desugar(
                        segment,
                        format!("{other} cannot follow a dot"),
                    ))
                }
            };
            patch
                .set_kind(segment, NodeKind::Expr(lowered))
                .set_child(segment, Role::Receiver, acc);
            acc = segment;
        }
        patch.retire(node, acc);
        Ok(Some(patch))
    }
}

/// `f(a, key: v)` → `f(a, {"key": v})`
pub struct CollectKeywordArgs;

impl CollectKeywordArgs {
    fn is_kwarg(g: &Graph, node: NodeId) -> bool {
        g.kind(node) == NodeKind::Syntax(SyntaxKind::KwArg)
    }
}

impl Rule<Graph> for CollectKeywordArgs {
    fn name(&self) -> &'static str {
        "keyword-args"
    }

    fn applies(&self, g: &Graph, node: NodeId) -> bool {
        matches!(
            g.kind(node),
            NodeKind::Expr(ExprKind::Call | ExprKind::MethodCall)
        ) && is_attached(g, node)
            && g.items(node).into_iter().any(|arg| Self::is_kwarg(g, arg))
    }

    fn rewrite(&self, g: &Graph, node: NodeId) -> Result<Option<GraphPatch>> {
        let (keywords, positional): (Vec<NodeId>, Vec<NodeId>) =
            g.items(node).into_iter().partition(|&arg| Self::is_kwarg(g, arg));

        let mut patch = GraphPatch::new();
        patch.clear_items(node);
        for arg in positional {
            patch.push_item(node, arg);
        }

        let map = patch.node(NodeKind::Expr(ExprKind::MapLit));
        for kw in keywords {
            let name = g.require_name(kw)?;
            let value = g.require_child(kw, Role::Value)?;
            let entry = patch.node(NodeKind::Expr(ExprKind::MapEntry));
            let key = patch.node_with(NodeKind::Expr(ExprKind::StrLit), name);
            patch
                .set_child(entry, Role::Key, key)
                .set_child(entry, Role::Value, value)
                .push_item(map, entry)
                .detach(kw);
        }
        patch.push_item(node, map);
        Ok(Some(patch))
    }
}

/// `for v in xs { body }` →
///
/// ```text
/// __itN : xs
/// __ixN : -1
/// while (__ixN + 1) < len(__itN) {
///     __ixN : __ixN + 1
///     v : __itN[__ixN]
///     body
/// }
/// ```
///
/// The counter advances before the body runs, so `continue` cannot skip it.
pub struct LowerForIn;

impl LowerForIn {
    fn ident(patch: &mut GraphPatch, name: &str) -> Handle {
        patch.node_with(NodeKind::Expr(ExprKind::Ident), name)
    }

    fn plus_one(patch: &mut GraphPatch, name: &str) -> Handle {
        let sum = patch.node(NodeKind::Expr(ExprKind::Binary(BinOp::Add)));
        let var = Self::ident(patch, name);
        let one = patch.node_with(NodeKind::Expr(ExprKind::IntLit), Payload::Int(1));
        patch.set_child(sum, Role::Left, var).set_child(sum, Role::Right, one);
        sum
    }

    fn stmt(patch: &mut GraphPatch, kind: StmtKind, target: Handle, value: Handle) -> Handle {
        let stmt = patch.node(NodeKind::Stmt(kind));
        patch
            .set_child(stmt, Role::Target, target)
            .set_child(stmt, Role::Value, value);
        stmt
    }
}

impl Rule<Graph> for LowerForIn {
    fn name(&self) -> &'static str {
        "for-in"
    }

    fn applies(&self, g: &Graph, node: NodeId) -> bool {
        g.kind(node) == NodeKind::Syntax(SyntaxKind::ForIn) && is_attached(g, node)
    }

    fn rewrite(&self, g: &Graph, node: NodeId) -> Result<Option<GraphPatch>> {
        let var = g.require_name(node)?;
        let iter = g.require_child(node, Role::Iter)?;
        let body = g.require_child(node, Role::Body)?;
        let it = format!("__it{}", node.0);
        let ix = format!("__ix{}", node.0);

        let mut patch = GraphPatch::new();
        let outer = patch.node(NodeKind::Stmt(StmtKind::Block));

        let it_target = Self::ident(&mut patch, &it);
        let init_it = Self::stmt(&mut patch, StmtKind::VarInit, it_target, iter.into());
        let ix_target = Self::ident(&mut patch, &ix);
        let minus_one = patch.node_with(NodeKind::Expr(ExprKind::IntLit), Payload::Int(-1));
        let init_ix = Self::stmt(&mut patch, StmtKind::VarInit, ix_target, minus_one);

        let cond = patch.node(NodeKind::Expr(ExprKind::Binary(BinOp::Lt)));
        let next = Self::plus_one(&mut patch, &ix);
        let len = patch.node(NodeKind::Expr(ExprKind::Len));
        let it_read = Self::ident(&mut patch, &it);
        patch
            .set_child(len, Role::Operand, it_read)
            .set_child(cond, Role::Left, next)
            .set_child(cond, Role::Right, len);

        let ix_step_target = Self::ident(&mut patch, &ix);
        let ix_step_value = Self::plus_one(&mut patch, &ix);
        let step = Self::stmt(&mut patch, StmtKind::Assign, ix_step_target, ix_step_value);

        let element = patch.node(NodeKind::Expr(ExprKind::Index));
        let it_index = Self::ident(&mut patch, &it);
        let ix_index = Self::ident(&mut patch, &ix);
        patch
            .set_child(element, Role::Value, it_index)
            .set_child(element, Role::Key, ix_index);
        let var_target = Self::ident(&mut patch, var);
        let bind = Self::stmt(&mut patch, StmtKind::Assign, var_target, element);

        let loop_body = patch.node(NodeKind::Stmt(StmtKind::Block));
        patch
            .push_item(loop_body, step)
            .push_item(loop_body, bind)
            .push_item(loop_body, body);

        let while_loop = patch.node(NodeKind::Stmt(StmtKind::While));
        patch
            .set_child(while_loop, Role::Cond, cond)
            .set_child(while_loop, Role::Body, loop_body);

        patch
            .push_item(outer, init_it)
            .push_item(outer, init_ix)
            .push_item(outer, while_loop)
            .retire(node, outer);
        Ok(Some(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ProgramBuilder;

    fn run(b: ProgramBuilder) -> Result<(Graph, NodeId)> {
        let (mut g, root) = b.finish();
        Desugarer::default().run(&mut g, root)?;
        Ok((g, root))
    }

    #[test]
    fn test_dot_pipe_threads_value_as_first_argument() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let xs = b.ident("xs");
        let two = b.int(2);
        let scale = b.call("scale", &[two]);
        let show = b.call("show", &[]);
        let pipe = b.dot_pipe(xs, &[scale, show]);
        let stmt = b.expr_stmt(body, pipe);
        let (g, _) = run(b).unwrap();

        let outer = g.child(stmt, Role::Value).unwrap();
        assert_eq!(outer, show);
        let inner = g.items(show);
        assert_eq!(inner, vec![scale]);
        assert_eq!(g.items(scale), vec![xs, two]);
    }

    #[test]
    fn test_dotted_chain_lowers_to_field_and_method() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let p = b.ident("p");
        let pos = b.ident("pos");
        let one = b.int(1);
        let shift = b.call("shift", &[one]);
        let chain = b.dotted(p, &[pos, shift]);
        let stmt = b.expr_stmt(body, chain);
        let (g, _) = run(b).unwrap();

        let call = g.child(stmt, Role::Value).unwrap();
        assert_eq!(g.kind(call), NodeKind::Expr(ExprKind::MethodCall));
        assert_eq!(g.name(call), Some("shift"));
        let field = g.child(call, Role::Receiver).unwrap();
        assert_eq!(g.kind(field), NodeKind::Expr(ExprKind::FieldGet));
        assert_eq!(g.child(field, Role::Receiver), Some(p));
        assert_eq!(g.items(call), vec![one]);
    }

    #[test]
    fn test_keyword_args_become_trailing_map() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let a = b.int(1);
        let v = b.string("red");
        let kw = b.kwarg("color", v);
        let call = b.call("paint", &[kw, a]);
        b.expr_stmt(body, call);
        let (g, _) = run(b).unwrap();

        let args = g.items(call);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], a);
        let map = args[1];
        assert_eq!(g.kind(map), NodeKind::Expr(ExprKind::MapLit));
        let entry = g.items(map)[0];
        let key = g.child(entry, Role::Key).unwrap();
        assert_eq!(g.name(key), Some("color"));
        assert_eq!(g.child(entry, Role::Value), Some(v));
    }

    #[test]
    fn test_for_in_lowers_to_while() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let xs = b.ident("xs");
        let loop_body = b.for_in(body, "x", xs);
        let x = b.ident("x");
        let print = b.call("print", &[x]);
        b.expr_stmt(loop_body, print);
        let (g, _) = run(b).unwrap();

        let lowered = g.items(body)[0];
        assert_eq!(g.kind(lowered), NodeKind::Stmt(StmtKind::Block));
        let stmts = g.items(lowered);
        assert_eq!(stmts.len(), 3);
        assert_eq!(g.child(stmts[0], Role::Value), Some(xs));
        let while_loop = stmts[2];
        assert_eq!(g.kind(while_loop), NodeKind::Stmt(StmtKind::While));
        let inner = g.items(g.child(while_loop, Role::Body).unwrap());
        assert_eq!(inner.len(), 3);
        assert_eq!(inner[2], loop_body);
        let bind_target = g.child(inner[1], Role::Target).unwrap();
        assert_eq!(g.name(bind_target), Some("x"));
    }

    #[test]
    fn test_sugar_inside_for_body_is_lowered() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let xs = b.ident("xs");
        let outer_body = b.for_in(body, "row", xs);
        let row = b.ident("row");
        let inner_body = b.for_in(outer_body, "cell", row);
        let cell = b.ident("cell");
        let one = b.int(1);
        let sum = b.op_seq(cell, &[("+", one)]);
        b.expr_stmt(inner_body, sum);
        let (g, root) = run(b).unwrap();

        let leftover = Search::down(&g, root).first(|g, n| matches!(g.kind(n), NodeKind::Syntax(_)));
        assert_eq!(leftover, None);
    }
}
