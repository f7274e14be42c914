//! Folding of flat operator sequences into binary expression trees

use crate::error::{MypeError, Result};
use crate::ir::{BinOp, ExprKind, Graph, GraphPatch, Handle, NodeId, NodeKind, Role, SyntaxKind};
use crate::rewrite::Rule;

/// `a + b * c < d` arrives as one flat list of operands and tokens and
/// leaves as a tree of `Binary` nodes, built by precedence climbing
pub struct FoldOperators;

impl Rule<Graph> for FoldOperators {
    fn name(&self) -> &'static str {
        "fold-operators"
    }

    fn applies(&self, g: &Graph, node: NodeId) -> bool {
        g.kind(node) == NodeKind::Syntax(SyntaxKind::OperatorSeq) && super::is_attached(g, node)
    }

    fn rewrite(&self, g: &Graph, node: NodeId) -> Result<Option<GraphPatch>> {
        let (operands, ops) = split_sequence(g, node)?;
        let mut patch = GraphPatch::new();
        let root = fold(&mut patch, node, &operands, &ops)?;
        patch.retire(node, root);
        Ok(Some(patch))
    }
}

/// Separate `x0 op1 x1 … opN xN` into its operands and operators
fn split_sequence(g: &Graph, seq: NodeId) -> Result<(Vec<NodeId>, Vec<BinOp>)> {
    let items = g.items(seq);
    if items.len() % 2 == 0 {
        return Err(MypeError::desugar(
            seq,
            format!("operator sequence of {} items does not end in an operand", items.len()),
        ));
    }

    let mut operands = Vec::with_capacity(items.len() / 2 + 1);
    let mut ops = Vec::with_capacity(items.len() / 2);
    for (i, &item) in items.iter().enumerate() {
        let is_token = g.kind(item) == NodeKind::Syntax(SyntaxKind::OpToken);
        if i % 2 == 0 {
            if is_token {
                return Err(MypeError::desugar(item, "operator found where an operand was expected"));
            }
            operands.push(item);
        } else {
            if !is_token {
                return Err(MypeError::desugar(item, "operand found where an operator was expected"));
            }
            let token = g.require_name(item)?;
            let op = BinOp::from_token(token)
                .ok_or_else(|| MypeError::desugar(item, format!("unknown operator `{token}`")))?;
            ops.push(op);
        }
    }
    Ok((operands, ops))
}

fn fold(patch: &mut GraphPatch, seq: NodeId, operands: &[NodeId], ops: &[BinOp]) -> Result<Handle> {
    let mut output: Vec<Handle> = Vec::with_capacity(operands.len());
    let mut pending: Vec<BinOp> = Vec::with_capacity(ops.len());

    let mut operands = operands.iter();
    if let Some(&first) = operands.next() {
        output.push(first.into());
    }
    for (&op, &operand) in ops.iter().zip(operands) {
        // left associativity: reduce equal precedence before pushing
        while pending.last().is_some_and(|top| top.precedence() >= op.precedence()) {
            reduce(patch, seq, &mut output, &mut pending)?;
        }
        pending.push(op);
        output.push(operand.into());
    }
    while !pending.is_empty() {
        reduce(patch, seq, &mut output, &mut pending)?;
    }

    match output.as_slice() {
        [root] => Ok(*root),
        _ => Err(MypeError::desugar(seq, "operator sequence did not fold to a single expression")),
    }
}

fn reduce(
    patch: &mut GraphPatch,
    seq: NodeId,
    output: &mut Vec<Handle>,
    pending: &mut Vec<BinOp>,
) -> Result<()> {
    let underflow = || MypeError::desugar(seq, "operator is missing an operand");
    let op = pending.pop().ok_or_else(underflow)?;
    let right = output.pop().ok_or_else(underflow)?;
    let left = output.pop().ok_or_else(underflow)?;
    let binary = patch.node(NodeKind::Expr(ExprKind::Binary(op)));
    patch
        .set_child(binary, Role::Left, left)
        .set_child(binary, Role::Right, right);
    output.push(binary);
    Ok(())
}
