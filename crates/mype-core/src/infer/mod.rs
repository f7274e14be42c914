//! Bidirectional type inference
//!
//! Every typable node carries two type-sets:
//! - POS, what it has been shown to possibly produce (grows by union)
//! - NEG, what its consumers can still accept (shrinks by intersection)
//!
//! Seeding places declared types into NEG and, for parameters, POS. The
//! rule catalog then runs to a fixpoint, and coloring picks one concrete
//! type per node from `POS ∩ NEG`.

mod bounds;
mod color;
mod optable;
mod rules;

pub use bounds::{annotation_set, Bounds, BoundsPatch, BoundsTable, SlotId};
pub use color::{colored_type, describe_type, ColorStats};
pub use optable::OperatorTable;

use crate::error::Result;
use crate::ir::{DeclKind, ExprKind, Graph, NodeId, NodeKind, Role, Search, StmtKind};
use crate::lattice::MypeArged;
use crate::rewrite::{FixpointStats, RewriteContext, Rewriter};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace};

/// Read-only graph plus the bounds the inference rules grow and shrink
pub struct Inference<'g> {
    graph: &'g Graph,
    bounds: BoundsTable,
    ops: OperatorTable,
    methods: HashMap<String, Vec<NodeId>>,
}

impl<'g> Inference<'g> {
    pub fn new(graph: &'g Graph, root: NodeId, bounds: BoundsTable) -> Self {
        let mut methods: HashMap<String, Vec<NodeId>> = HashMap::new();
        for method in class_methods(graph, root) {
            if let Some(name) = graph.name(method) {
                methods.entry(name.to_string()).or_default().push(method);
            }
        }
        Self {
            graph,
            bounds,
            ops: OperatorTable::standard(),
            methods,
        }
    }

    pub fn bounds(&self) -> &BoundsTable {
        &self.bounds
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.ops
    }

    /// Methods of any class named `name`, in declaration order
    pub fn methods_named(&self, name: &str) -> &[NodeId] {
        self.methods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_bounds(self) -> BoundsTable {
        self.bounds
    }
}

impl RewriteContext for Inference<'_> {
    type Patch = BoundsPatch;

    fn graph(&self) -> &Graph {
        self.graph
    }

    fn commit(&mut self, patch: BoundsPatch) -> Result<()> {
        self.bounds.apply(patch)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceReport {
    pub stats: FixpointStats,
    /// Distinct POS/NEG pairs
    pub slots: usize,
    pub colors: ColorStats,
}

pub struct InferenceEngine {
    rewriter: Rewriter,
    allow_untyped_params: bool,
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new(Rewriter::new())
    }
}

impl InferenceEngine {
    pub fn new(rewriter: Rewriter) -> Self {
        Self {
            rewriter,
            allow_untyped_params: true,
        }
    }

    /// Whether an undeclared parameter of a function nobody calls directly
    /// is assumed to accept anything
    pub fn with_untyped_params(mut self, allow: bool) -> Self {
        self.allow_untyped_params = allow;
        self
    }

    /// Infer and color every typable node under `root`
    ///
    /// Expects a desugared, resolved program.
    pub fn run(&self, graph: &mut Graph, root: NodeId) -> Result<InferenceReport> {
        info!(root = %root, "inferring types");
        add_return_slots(graph, root);

        let typable = Search::down(graph, root).collect(|g, n| g.kind(n).is_typable());
        let candidates = Search::down(graph, root).collect(|_, _| true);
        let bounds = self.seed(graph, root, &typable)?;
        debug!(nodes = typable.len(), slots = bounds.len(), "bounds seeded");

        let mut cx = Inference::new(graph, root, bounds);
        let rules = rules::catalog();
        let stats = self.rewriter.fixpoint(&mut cx, &rules, &candidates)?;
        drop(rules);
        let bounds = cx.into_bounds();
        debug!(rounds = stats.rounds, firings = stats.firings, "bounds stable");

        let colors = color::color_all(graph, &bounds, &typable)?;
        info!(
            colored = colors.colored,
            dynamic = colors.dynamic,
            void = colors.void,
            "types assigned"
        );
        Ok(InferenceReport {
            stats,
            slots: bounds.len(),
            colors,
        })
    }

    fn seed(&self, graph: &Graph, root: NodeId, typable: &[NodeId]) -> Result<BoundsTable> {
        let mut table = BoundsTable::new();
        for &node in typable {
            if alias_target(graph, node).is_none() {
                table.fresh(node);
            }
        }
        for &node in typable {
            if let Some(def) = alias_target(graph, node) {
                match table.slot(def) {
                    Some(slot) => table.alias(node, slot),
                    None => {
                        table.fresh(node);
                    }
                }
            }
        }

        let called = directly_called(graph, root);
        let mut patch = BoundsPatch::new();
        for &node in typable {
            match graph.kind(node) {
                NodeKind::Decl(DeclKind::Param) => {
                    if let Some(ty) = graph.child(node, Role::DeclaredType) {
                        let set = annotation_set(graph, ty)?;
                        patch.widen(&table, node, set.clone());
                        patch.narrow(&table, node, set);
                    } else if self.allow_untyped_params {
                        let func = graph.parents(node).next();
                        if func.is_some_and(|f| !called.contains(&f)) {
                            trace!(param = %node, "untyped parameter of an uncalled function");
                            patch.widen(&table, node, MypeArged::All);
                        }
                    }
                }
                NodeKind::Decl(DeclKind::Field) => {
                    if let Some(ty) = graph.child(node, Role::DeclaredType) {
                        patch.narrow(&table, node, annotation_set(graph, ty)?);
                    }
                }
                NodeKind::Decl(DeclKind::ReturnSlot) => {
                    let declared = graph
                        .parents(node)
                        .find_map(|f| graph.child(f, Role::ReturnType));
                    if let Some(ty) = declared {
                        patch.narrow(&table, node, annotation_set(graph, ty)?);
                    }
                }
                // a function used as a value can hold anything callable
                NodeKind::Expr(ExprKind::Ident) => {
                    let is_function = graph
                        .child(node, Role::Ref)
                        .is_some_and(|r| graph.kind(r) == NodeKind::Decl(DeclKind::Function));
                    if is_function {
                        patch.widen(&table, node, MypeArged::All);
                    }
                }
                _ => {}
            }
        }

        let inits = Search::down(graph, root)
            .collect(|g, n| g.kind(n) == NodeKind::Stmt(StmtKind::VarInit));
        for init in inits {
            let (Some(target), Some(ty)) = (
                graph.child(init, Role::Target),
                graph.child(init, Role::DeclaredType),
            ) else {
                continue;
            };
            patch.narrow(&table, target, annotation_set(graph, ty)?);
        }

        table.apply(patch)?;
        Ok(table)
    }
}

/// Give every function a placeholder for what its returns produce
fn add_return_slots(graph: &mut Graph, root: NodeId) {
    let functions = Search::down(graph, root)
        .collect(|g, n| g.kind(n) == NodeKind::Decl(DeclKind::Function));
    for func in functions {
        if !graph.has_child(func, Role::ReturnSlot) {
            let slot = graph.add(NodeKind::Decl(DeclKind::ReturnSlot));
            graph.set_child(func, Role::ReturnSlot, slot);
        }
    }
}

/// Definition a reference shares its bounds with
fn alias_target(graph: &Graph, node: NodeId) -> Option<NodeId> {
    match graph.kind(node) {
        NodeKind::Expr(ExprKind::Ident | ExprKind::FieldGet) => graph
            .child(node, Role::Ref)
            .filter(|&def| graph.kind(def).is_typable()),
        _ => None,
    }
}

fn class_methods(graph: &Graph, root: NodeId) -> Vec<NodeId> {
    Search::down(graph, root).collect(|g, n| {
        g.kind(n) == NodeKind::Decl(DeclKind::Function)
            && g.parents(n).any(|p| g.kind(p) == NodeKind::Decl(DeclKind::Class))
    })
}

/// Functions with at least one known call site that never escape as values
fn directly_called(graph: &Graph, root: NodeId) -> HashSet<NodeId> {
    let mut called = HashSet::new();
    let mut escaping = HashSet::new();
    let mut method_names = HashSet::new();

    for node in Search::down(graph, root).collect(|_, _| true) {
        match graph.kind(node) {
            NodeKind::Expr(ExprKind::Call) => {
                called.extend(graph.child(node, Role::Ref));
            }
            NodeKind::Expr(ExprKind::MethodCall) => {
                method_names.extend(graph.name(node).map(str::to_string));
            }
            NodeKind::Expr(ExprKind::Ident) => {
                escaping.extend(graph.child(node, Role::Ref));
            }
            _ => {}
        }
    }

    called.extend(
        class_methods(graph, root)
            .into_iter()
            .filter(|&m| graph.name(m).is_some_and(|name| method_names.contains(name))),
    );
    called.retain(|f| !escaping.contains(f));
    called
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MypeError;
    use crate::ir::{BinOp, ProgramBuilder};
    use crate::lattice::BaseType;
    use crate::resolve::Resolver;

    fn infer(b: ProgramBuilder) -> (Graph, Result<InferenceReport>) {
        let (mut g, root) = b.finish();
        Resolver::default().run(&mut g, root).unwrap();
        let report = InferenceEngine::default().run(&mut g, root);
        (g, report)
    }

    fn type_of(g: &Graph, node: NodeId) -> String {
        describe_type(g, colored_type(g, node).unwrap())
    }

    #[test]
    fn test_return_type_flows_through_local() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f");
        let int = b.base_type(BaseType::Int);
        b.return_type(f, int);
        let body = b.body(f).unwrap();
        let three = b.int(3);
        let init = b.var_init(body, "x", None, three);
        let x = b.ident("x");
        b.ret(body, Some(x));
        let (g, report) = infer(b);
        report.unwrap();

        let target = g.child(init, Role::Target).unwrap();
        assert_eq!(type_of(&g, target), "int");
        assert_eq!(type_of(&g, x), "int");
        assert_eq!(type_of(&g, g.child(f, Role::ReturnSlot).unwrap()), "int");
    }

    #[test]
    fn test_list_literal_of_ints() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let items = [b.int(1), b.int(2), b.int(3)];
        let list = b.list(&items);
        b.var_init(body, "xs", None, list);
        let (g, report) = infer(b);
        report.unwrap();
        assert_eq!(type_of(&g, list), "list<int>");
    }

    #[test]
    fn test_mixed_list_widens_to_bare_container() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let (one, two) = (b.int(1), b.string("two"));
        let inner_a = b.list(&[one]);
        let inner_b = b.list(&[two]);
        let outer = b.list(&[inner_a, inner_b]);
        b.var_init(body, "xs", None, outer);
        let (g, report) = infer(b);
        report.unwrap();
        assert_eq!(type_of(&g, outer), "list<list>");
    }

    #[test]
    fn test_declared_type_mismatch_is_reported() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let int = b.base_type(BaseType::Int);
        let hello = b.string("hello");
        b.var_init(body, "x", Some(int), hello);
        let (_, report) = infer(b);
        assert!(matches!(
            report.unwrap_err(),
            MypeError::NoConsistentType { .. }
        ));
    }

    #[test]
    fn test_arguments_flow_into_parameters() {
        let mut b = ProgramBuilder::new();
        let inc = b.function("inc");
        let n = b.param(inc, "n", None);
        let inc_body = b.body(inc).unwrap();
        let (read, one) = (b.ident("n"), b.int(1));
        let sum = b.binary(BinOp::Add, read, one);
        b.ret(inc_body, Some(sum));

        let main = b.function("main");
        let body = b.body(main).unwrap();
        let arg = b.float(1.5);
        let call = b.call("inc", &[arg]);
        b.var_init(body, "y", None, call);
        let (g, report) = infer(b);
        report.unwrap();

        assert_eq!(type_of(&g, n), "float");
        assert_eq!(type_of(&g, sum), "float");
        assert_eq!(type_of(&g, call), "float");
    }

    #[test]
    fn test_uncalled_untyped_parameter_is_dynamic() {
        let mut b = ProgramBuilder::new();
        let f = b.function("entry");
        let p = b.param(f, "arg", None);
        let (g, report) = infer(b);
        assert_eq!(report.unwrap().colors.dynamic, 1);
        assert_eq!(type_of(&g, p), "dyn");
    }

    #[test]
    fn test_fields_through_objects() {
        let mut b = ProgramBuilder::new();
        let class = b.class("Point");
        let int = b.base_type(BaseType::Int);
        let x = b.field(class, "x", Some(int), None);

        let main = b.function("main");
        let body = b.body(main).unwrap();
        let five = b.int(5);
        let new = b.call("Point", &[five]);
        b.var_init(body, "p", None, new);
        let p = b.ident("p");
        let get = b.field_get(p, "x");
        b.var_init(body, "v", None, get);
        let (g, report) = infer(b);
        report.unwrap();

        assert_eq!(type_of(&g, new), "Point");
        assert_eq!(type_of(&g, x), "int");
        assert_eq!(type_of(&g, get), "int");
    }

    #[test]
    fn test_discarded_procedure_call_is_void() {
        let mut b = ProgramBuilder::new();
        let noop = b.function("noop");
        let main = b.function("main");
        let body = b.body(main).unwrap();
        let call = b.call("noop", &[]);
        b.expr_stmt(body, call);
        let (g, report) = infer(b);
        report.unwrap();

        assert_eq!(type_of(&g, call), "void");
        assert_eq!(type_of(&g, g.child(noop, Role::ReturnSlot).unwrap()), "void");
    }
}
