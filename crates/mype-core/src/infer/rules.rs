//! Bound propagation rules
//!
//! Positive rules push what an expression is shown capable of producing
//! outward to its consumers. Negative rules push what a consumer still
//! accepts inward to its producers. Every rule only queues updates that
//! would change a bound, which is what lets the fixpoint driver stop.

use super::bounds::{annotation_set, BoundsPatch, BoundsTable};
use super::Inference;
use crate::error::Result;
use crate::ir::{DeclKind, ExprKind, Graph, NodeId, NodeKind, Role, StmtKind};
use crate::lattice::{BaseType, MypeArged};
use crate::rewrite::{RewriteContext, Rule, RuleSet};

/// Rules in firing order: producers before consumers, positive before negative
pub fn catalog<'g>() -> RuleSet<Inference<'g>> {
    vec![
        Box::new(LiteralRule),
        Box::new(CollectionRule),
        Box::new(SelfRule),
        Box::new(CallResultRule),
        Box::new(CallArgsRule),
        Box::new(BinaryRule),
        Box::new(UnaryRule),
        Box::new(LenRule),
        Box::new(IndexRule),
        Box::new(FieldGetRule),
        Box::new(AssignPosRule),
        Box::new(ReturnRule),
        Box::new(AssignNegRule),
        Box::new(OperatorNegRule),
        Box::new(ConditionRule),
    ]
}

fn expr_kind(g: &Graph, node: NodeId) -> Option<ExprKind> {
    match g.kind(node) {
        NodeKind::Expr(kind) => Some(kind),
        _ => None,
    }
}

fn enclosing(g: &Graph, node: NodeId, kind: DeclKind) -> Option<NodeId> {
    g.nearest_ancestor(node, |g, n| g.kind(n) == NodeKind::Decl(kind))
}

fn members(g: &Graph, host: NodeId, kind: DeclKind) -> Vec<NodeId> {
    g.items(host)
        .into_iter()
        .filter(|&m| g.kind(m) == NodeKind::Decl(kind))
        .collect()
}

fn member(g: &Graph, class: NodeId, kind: DeclKind, name: &str) -> Option<NodeId> {
    members(g, class, kind)
        .into_iter()
        .find(|&m| g.name(m) == Some(name))
}

/// What a call of `func` yields: its declared return type, else whatever
/// its return statements have produced so far
fn callee_result(cx: &Inference<'_>, func: NodeId) -> Result<MypeArged> {
    let g = cx.graph();
    if let Some(ty) = g.child(func, Role::ReturnType) {
        return annotation_set(g, ty);
    }
    Ok(g.child(func, Role::ReturnSlot)
        .map(|slot| cx.bounds().pos(slot).clone())
        .unwrap_or(MypeArged::Empty))
}

/// Classes a receiver may hold, as far as its POS tells
enum Receiver {
    /// Nothing known yet
    Pending,
    /// Not (only) a user class: members are untyped
    Dynamic,
    Classes(Vec<NodeId>),
}

fn receiver(bounds: &BoundsTable, node: NodeId) -> Receiver {
    let pos = bounds.pos(node);
    if pos.is_empty() {
        return Receiver::Pending;
    }
    let mut classes = Vec::new();
    for leaf in pos.leaves() {
        match leaf {
            MypeArged::Class(class) => classes.push(*class),
            _ => return Receiver::Dynamic,
        }
    }
    Receiver::Classes(classes)
}

/// Union of `sets`, or `None` when nothing was produced
fn join(sets: impl IntoIterator<Item = MypeArged>) -> Result<Option<MypeArged>> {
    let mut acc = MypeArged::Empty;
    for set in sets {
        acc = acc.try_union(&set)?;
    }
    Ok((!acc.is_empty()).then_some(acc))
}

fn widen_one(cx: &Inference<'_>, node: NodeId, with: MypeArged) -> Option<BoundsPatch> {
    let mut patch = BoundsPatch::new();
    patch.widen(cx.bounds(), node, with);
    patch.into_option()
}

fn narrow_one(cx: &Inference<'_>, node: NodeId, with: MypeArged) -> Option<BoundsPatch> {
    let mut patch = BoundsPatch::new();
    patch.narrow(cx.bounds(), node, with);
    patch.into_option()
}

// ----- positive rules -----

pub struct LiteralRule;

impl<'g> Rule<Inference<'g>> for LiteralRule {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(
            expr_kind(cx.graph(), node),
            Some(ExprKind::IntLit | ExprKind::FloatLit | ExprKind::StrLit | ExprKind::BoolLit)
        )
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let base = match expr_kind(cx.graph(), node) {
            Some(ExprKind::IntLit) => BaseType::Int,
            Some(ExprKind::FloatLit) => BaseType::Float,
            Some(ExprKind::StrLit) => BaseType::String,
            _ => BaseType::Bool,
        };
        Ok(widen_one(cx, node, base.into()))
    }
}

/// `[a, b]` → `list<stem(a ∪ b)>`, waiting until every element is known
pub struct CollectionRule;

impl<'g> Rule<Inference<'g>> for CollectionRule {
    fn name(&self) -> &'static str {
        "collection-literal"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(
            expr_kind(cx.graph(), node),
            Some(ExprKind::ListLit | ExprKind::SetLit | ExprKind::MapLit)
        )
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let (base, elements) = match expr_kind(g, node) {
            Some(ExprKind::MapLit) => (
                BaseType::Map,
                g.items(node)
                    .into_iter()
                    .filter_map(|entry| g.child(entry, Role::Value))
                    .collect(),
            ),
            Some(ExprKind::SetLit) => (BaseType::Set, g.items(node)),
            _ => (BaseType::List, g.items(node)),
        };

        if elements.is_empty() {
            return Ok(widen_one(cx, node, base.into()));
        }
        let mut joined = MypeArged::Empty;
        for element in elements {
            let pos = cx.bounds().pos(element);
            if pos.is_empty() {
                return Ok(None);
            }
            joined = joined.try_union(pos)?;
        }
        let contribution = match joined.stem() {
            Some(stem) => MypeArged::arged(base, stem),
            None => MypeArged::SingleBase(base),
        };
        Ok(widen_one(cx, node, contribution))
    }
}

pub struct SelfRule;

impl<'g> Rule<Inference<'g>> for SelfRule {
    fn name(&self) -> &'static str {
        "self"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        expr_kind(cx.graph(), node) == Some(ExprKind::SelfRef)
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        Ok(enclosing(cx.graph(), node, DeclKind::Class)
            .and_then(|class| widen_one(cx, node, MypeArged::Class(class))))
    }
}

pub struct CallResultRule;

impl<'g> Rule<Inference<'g>> for CallResultRule {
    fn name(&self) -> &'static str {
        "call-result"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(
            expr_kind(cx.graph(), node),
            Some(
                ExprKind::SysCall
                    | ExprKind::DynCall
                    | ExprKind::Call
                    | ExprKind::ObjectInit
                    | ExprKind::MethodCall
            )
        )
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let result = match expr_kind(g, node) {
            Some(ExprKind::Call) => callee_result(cx, g.require_child(node, Role::Ref)?)?,
            Some(ExprKind::ObjectInit) => MypeArged::Class(g.require_child(node, Role::Ref)?),
            Some(ExprKind::MethodCall) => {
                let name = g.require_name(node)?;
                match receiver(cx.bounds(), g.require_child(node, Role::Receiver)?) {
                    Receiver::Pending => return Ok(None),
                    Receiver::Dynamic => MypeArged::All,
                    Receiver::Classes(classes) => {
                        let methods: Vec<NodeId> = classes
                            .into_iter()
                            .filter_map(|c| member(g, c, DeclKind::Function, name))
                            .collect();
                        if methods.is_empty() {
                            MypeArged::All
                        } else {
                            let results = methods
                                .into_iter()
                                .map(|m| callee_result(cx, m))
                                .collect::<Result<Vec<_>>>()?;
                            match join(results)? {
                                Some(result) => result,
                                None => return Ok(None),
                            }
                        }
                    }
                }
            }
            // system and dynamic calls are unconstrained
            _ => MypeArged::All,
        };
        if result.is_empty() {
            return Ok(None);
        }
        Ok(widen_one(cx, node, result))
    }
}

/// Arguments flow into the parameters (or fields) they bind, and the
/// binding site's NEG flows back into the argument
pub struct CallArgsRule;

impl<'g> Rule<Inference<'g>> for CallArgsRule {
    fn name(&self) -> &'static str {
        "call-args"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        let g = cx.graph();
        match expr_kind(g, node) {
            Some(ExprKind::Call) => g
                .child(node, Role::Ref)
                .is_some_and(|f| g.kind(f) == NodeKind::Decl(DeclKind::Function)),
            Some(ExprKind::ObjectInit | ExprKind::MethodCall) => true,
            _ => false,
        }
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let targets: Vec<Vec<NodeId>> = match expr_kind(g, node) {
            Some(ExprKind::Call) => {
                vec![members(g, g.require_child(node, Role::Ref)?, DeclKind::Param)]
            }
            Some(ExprKind::ObjectInit) => {
                vec![members(g, g.require_child(node, Role::Ref)?, DeclKind::Field)]
            }
            _ => {
                let name = g.require_name(node)?;
                match receiver(cx.bounds(), g.require_child(node, Role::Receiver)?) {
                    Receiver::Pending => return Ok(None),
                    Receiver::Dynamic => return Ok(dynamic_method_args(cx, node, name)),
                    Receiver::Classes(classes) => classes
                        .into_iter()
                        .filter_map(|c| member(g, c, DeclKind::Function, name))
                        .map(|m| members(g, m, DeclKind::Param))
                        .collect(),
                }
            }
        };

        let args = g.items(node);
        let mut patch = BoundsPatch::new();
        for params in targets {
            for (&param, &arg) in params.iter().zip(&args) {
                let pos = cx.bounds().pos(arg);
                if !pos.is_empty() {
                    patch.widen(cx.bounds(), param, pos.clone());
                }
                patch.narrow(cx.bounds(), arg, cx.bounds().neg(param).clone());
            }
        }
        Ok(patch.into_option())
    }
}

/// A receiver of unknown class may dispatch to any method of that name, so
/// arguments widen every such method's parameters. Their NEG says nothing
/// about this call and is not fed back.
fn dynamic_method_args(cx: &Inference<'_>, node: NodeId, name: &str) -> Option<BoundsPatch> {
    let g = cx.graph();
    let args = g.items(node);
    let mut patch = BoundsPatch::new();
    for &method in cx.methods_named(name) {
        for (&param, &arg) in members(g, method, DeclKind::Param).iter().zip(&args) {
            let pos = cx.bounds().pos(arg);
            if !pos.is_empty() {
                patch.widen(cx.bounds(), param, pos.clone());
            }
        }
    }
    patch.into_option()
}

pub struct BinaryRule;

impl<'g> Rule<Inference<'g>> for BinaryRule {
    fn name(&self) -> &'static str {
        "binary-op"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(expr_kind(cx.graph(), node), Some(ExprKind::Binary(_)))
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let Some(ExprKind::Binary(op)) = expr_kind(g, node) else {
            return Ok(None);
        };
        let left = cx.bounds().pos(g.require_child(node, Role::Left)?);
        let right = cx.bounds().pos(g.require_child(node, Role::Right)?);
        if left.is_empty() || right.is_empty() {
            return Ok(None);
        }

        let result = if left.is_all() || right.is_all() {
            cx.operators().domain(op).clone()
        } else {
            let mut results = Vec::new();
            for a in left.leaves().iter().filter_map(MypeArged::base) {
                for b in right.leaves().iter().filter_map(MypeArged::base) {
                    results.extend(cx.operators().lookup(op, a, b).map(MypeArged::from));
                }
            }
            MypeArged::from_leaves(results)
        };
        if result.is_empty() {
            return Ok(None);
        }
        Ok(widen_one(cx, node, result))
    }
}

pub struct UnaryRule;

impl<'g> Rule<Inference<'g>> for UnaryRule {
    fn name(&self) -> &'static str {
        "unary-op"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(expr_kind(cx.graph(), node), Some(ExprKind::Unary(_)))
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let Some(ExprKind::Unary(op)) = expr_kind(g, node) else {
            return Ok(None);
        };
        let operand = cx.bounds().pos(g.require_child(node, Role::Operand)?);
        let result = if operand.is_all() {
            cx.operators().unary_domain(op)
        } else {
            MypeArged::from_leaves(
                operand
                    .leaves()
                    .iter()
                    .filter_map(MypeArged::base)
                    .filter_map(|b| cx.operators().unary(op, b))
                    .map(MypeArged::from),
            )
        };
        if result.is_empty() {
            return Ok(None);
        }
        Ok(widen_one(cx, node, result))
    }
}

pub struct LenRule;

impl<'g> Rule<Inference<'g>> for LenRule {
    fn name(&self) -> &'static str {
        "len"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        expr_kind(cx.graph(), node) == Some(ExprKind::Len)
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let operand = cx.bounds().pos(cx.graph().require_child(node, Role::Operand)?);
        let measurable = operand.is_all()
            || operand
                .leaves()
                .iter()
                .filter_map(MypeArged::base)
                .any(|b| cx.operators().len_of(b).is_some());
        if !measurable {
            return Ok(None);
        }
        Ok(widen_one(cx, node, BaseType::Int.into()))
    }
}

/// `xs[i]`: element type of the container
pub struct IndexRule;

impl<'g> Rule<Inference<'g>> for IndexRule {
    fn name(&self) -> &'static str {
        "index"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        expr_kind(cx.graph(), node) == Some(ExprKind::Index)
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let container = cx.bounds().pos(cx.graph().require_child(node, Role::Value)?);
        let result = if container.is_all() {
            MypeArged::All
        } else {
            let elements = container.leaves().iter().filter_map(|leaf| match leaf {
                MypeArged::SingleArged(base, arg) if base.is_container() => Some((**arg).clone()),
                MypeArged::SingleBase(base) if base.is_container() => Some(MypeArged::All),
                MypeArged::SingleBase(BaseType::String) => Some(BaseType::String.into()),
                _ => None,
            });
            match join(elements)? {
                Some(result) => result,
                None => return Ok(None),
            }
        };
        Ok(widen_one(cx, node, result))
    }
}

/// `obj.field` on a receiver that is not `self`
pub struct FieldGetRule;

impl<'g> Rule<Inference<'g>> for FieldGetRule {
    fn name(&self) -> &'static str {
        "field-get"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        let g = cx.graph();
        expr_kind(g, node) == Some(ExprKind::FieldGet) && !g.has_child(node, Role::Ref)
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let name = g.require_name(node)?;
        let result = match receiver(cx.bounds(), g.require_child(node, Role::Receiver)?) {
            Receiver::Pending => return Ok(None),
            Receiver::Dynamic => MypeArged::All,
            Receiver::Classes(classes) => {
                let fields: Vec<NodeId> = classes
                    .into_iter()
                    .filter_map(|c| member(g, c, DeclKind::Field, name))
                    .collect();
                if fields.is_empty() {
                    MypeArged::All
                } else {
                    match join(fields.into_iter().map(|f| cx.bounds().pos(f).clone()))? {
                        Some(result) => result,
                        None => return Ok(None),
                    }
                }
            }
        };
        Ok(widen_one(cx, node, result))
    }
}

/// `target : value` and field defaults: the target can hold what the value produces
pub struct AssignPosRule;

fn assignment(g: &Graph, node: NodeId) -> Option<(NodeId, NodeId)> {
    match g.kind(node) {
        NodeKind::Stmt(StmtKind::VarInit | StmtKind::Assign) => {
            Some((g.child(node, Role::Target)?, g.child(node, Role::Value)?))
        }
        NodeKind::Decl(DeclKind::Field) => Some((node, g.child(node, Role::Value)?)),
        _ => None,
    }
}

impl<'g> Rule<Inference<'g>> for AssignPosRule {
    fn name(&self) -> &'static str {
        "assign-pos"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        assignment(cx.graph(), node).is_some()
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let Some((target, value)) = assignment(g, node) else {
            return Ok(None);
        };
        let pos = cx.bounds().pos(value);
        if pos.is_empty() {
            return Ok(None);
        }

        let mut patch = BoundsPatch::new();
        patch.widen(cx.bounds(), target, pos.clone());
        // writes through `obj.field` also reach the field itself
        if expr_kind(g, target) == Some(ExprKind::FieldGet) && !g.has_child(target, Role::Ref) {
            let name = g.require_name(target)?;
            if let Receiver::Classes(classes) =
                receiver(cx.bounds(), g.require_child(target, Role::Receiver)?)
            {
                for field in classes
                    .into_iter()
                    .filter_map(|c| member(g, c, DeclKind::Field, name))
                {
                    patch.widen(cx.bounds(), field, pos.clone());
                }
            }
        }
        Ok(patch.into_option())
    }
}

/// `return v` feeds the enclosing function's return placeholder
pub struct ReturnRule;

fn returned(g: &Graph, node: NodeId) -> Option<(NodeId, NodeId)> {
    if g.kind(node) != NodeKind::Stmt(StmtKind::Return) {
        return None;
    }
    let value = g.child(node, Role::Value)?;
    let func = enclosing(g, node, DeclKind::Function)?;
    Some((g.child(func, Role::ReturnSlot)?, value))
}

impl<'g> Rule<Inference<'g>> for ReturnRule {
    fn name(&self) -> &'static str {
        "return"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        returned(cx.graph(), node).is_some()
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let Some((slot, value)) = returned(cx.graph(), node) else {
            return Ok(None);
        };
        let pos = cx.bounds().pos(value);
        if pos.is_empty() {
            return Ok(None);
        }
        Ok(widen_one(cx, slot, pos.clone()))
    }
}

// ----- negative rules -----

/// A value may only produce what its destination still accepts
pub struct AssignNegRule;

impl<'g> Rule<Inference<'g>> for AssignNegRule {
    fn name(&self) -> &'static str {
        "assign-neg"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        let g = cx.graph();
        assignment(g, node).is_some() || returned(g, node).is_some()
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let g = cx.graph();
        let Some((dest, value)) = assignment(g, node).or_else(|| returned(g, node)) else {
            return Ok(None);
        };
        Ok(narrow_one(cx, value, cx.bounds().neg(dest).clone()))
    }
}

/// An operator can never be asked for a result outside its table
pub struct OperatorNegRule;

impl<'g> Rule<Inference<'g>> for OperatorNegRule {
    fn name(&self) -> &'static str {
        "operator-neg"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(
            expr_kind(cx.graph(), node),
            Some(ExprKind::Binary(_) | ExprKind::Unary(_) | ExprKind::Len)
        )
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let domain = match expr_kind(cx.graph(), node) {
            Some(ExprKind::Binary(op)) => cx.operators().domain(op).clone(),
            Some(ExprKind::Unary(op)) => cx.operators().unary_domain(op),
            _ => BaseType::Int.into(),
        };
        Ok(narrow_one(cx, node, domain))
    }
}

/// Branch and loop conditions are booleans
pub struct ConditionRule;

impl<'g> Rule<Inference<'g>> for ConditionRule {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn applies(&self, cx: &Inference<'g>, node: NodeId) -> bool {
        matches!(
            cx.graph().kind(node),
            NodeKind::Stmt(StmtKind::If | StmtKind::While)
        )
    }

    fn rewrite(&self, cx: &Inference<'g>, node: NodeId) -> Result<Option<BoundsPatch>> {
        let cond = cx.graph().require_child(node, Role::Cond)?;
        Ok(narrow_one(cx, cond, BaseType::Bool.into()))
    }
}
