//! Symbol tables per scope host
//!
//! The collect pass walks every function and class once and records, in
//! order, the definitions visible directly inside it: parameters, class
//! fields and one implicit local per name whose first appearance is a
//! write. Implicit locals are materialized as `VarDef` nodes hanging off the
//! function through a `Scope` node, so later passes and the code generator
//! see them like any other declaration.

use crate::error::Result;
use crate::ir::{DeclKind, ExprKind, Graph, NodeId, NodeKind, Role, Search, StmtKind};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    defs: IndexMap<String, NodeId>,
    /// Enclosing host consulted when a name is not found here
    parent: Option<NodeId>,
}

impl ScopeTable {
    fn with_parent(parent: NodeId) -> Self {
        Self {
            defs: IndexMap::new(),
            parent: Some(parent),
        }
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.defs.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Definitions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.defs.iter().map(|(name, &def)| (name.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    fn insert(&mut self, name: &str, def: NodeId) {
        self.defs.entry(name.to_string()).or_insert(def);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scopes {
    tables: HashMap<NodeId, ScopeTable>,
    functions: IndexMap<String, NodeId>,
    classes: IndexMap<String, NodeId>,
}

impl Scopes {
    /// Build the tables of every host under the program `root`
    pub fn collect(graph: &mut Graph, root: NodeId) -> Result<Scopes> {
        let mut scopes = Scopes::default();
        scopes.tables.insert(root, ScopeTable::default());

        for item in graph.items(root) {
            match graph.kind(item) {
                NodeKind::Decl(DeclKind::Function) => {
                    let name = graph.require_name(item)?.to_string();
                    scopes.functions.entry(name).or_insert(item);
                    scopes.collect_function(graph, item, root)?;
                }
                NodeKind::Decl(DeclKind::Class) => {
                    let name = graph.require_name(item)?.to_string();
                    scopes.classes.entry(name).or_insert(item);
                    scopes.collect_class(graph, item, root)?;
                }
                _ => {}
            }
        }
        Ok(scopes)
    }

    fn collect_class(&mut self, graph: &mut Graph, class: NodeId, parent: NodeId) -> Result<()> {
        let mut table = ScopeTable::with_parent(parent);
        let members = graph.items(class);
        for &member in &members {
            if graph.kind(member) == NodeKind::Decl(DeclKind::Field) {
                table.insert(graph.require_name(member)?, member);
            }
        }
        self.tables.insert(class, table);

        for member in members {
            if graph.kind(member) == NodeKind::Decl(DeclKind::Function) {
                self.collect_function(graph, member, class)?;
            }
        }
        Ok(())
    }

    fn collect_function(&mut self, graph: &mut Graph, func: NodeId, parent: NodeId) -> Result<()> {
        let mut table = ScopeTable::with_parent(parent);
        for param in graph.items(func) {
            if graph.kind(param) == NodeKind::Decl(DeclKind::Param) {
                table.insert(graph.require_name(param)?, param);
            }
        }

        let body = graph.require_child(func, Role::Body)?;
        let writes = Search::down(graph, body)
            .prune(|g, n| g.kind(n).is_scope_host())
            .collect(|g, n| {
                matches!(
                    g.kind(n),
                    NodeKind::Stmt(StmtKind::VarInit | StmtKind::Assign)
                )
            });

        let mut scope_node = None;
        for stmt in writes {
            let Some(target) = graph.child(stmt, Role::Target) else {
                continue;
            };
            let Some(name) = graph.name(target).map(str::to_string) else {
                continue;
            };
            if graph.kind(target) != NodeKind::Expr(ExprKind::Ident)
                || table.contains(&name)
                || self.visible_in(parent, &name)
            {
                continue;
            }

            let scope = *scope_node.get_or_insert_with(|| {
                let scope = graph.add(NodeKind::Decl(DeclKind::Scope));
                graph.set_child(func, Role::Locals, scope);
                scope
            });
            let def = graph.add_with(NodeKind::Decl(DeclKind::VarDef), name.as_str());
            graph.push_item(scope, def);
            trace!(%func, %def, name = %name, "implicit local");
            table.insert(&name, def);
        }

        self.tables.insert(func, table);
        Ok(())
    }

    /// Whether `name` is a variable of `host` or of one of its enclosing class hosts
    fn visible_in(&self, host: NodeId, name: &str) -> bool {
        let mut current = Some(host);
        while let Some(host) = current {
            let Some(table) = self.tables.get(&host) else {
                return false;
            };
            if table.contains(name) {
                return true;
            }
            current = table.parent;
        }
        false
    }

    pub fn table(&self, host: NodeId) -> Option<&ScopeTable> {
        self.tables.get(&host)
    }

    pub fn function(&self, name: &str) -> Option<NodeId> {
        self.functions.get(name).copied()
    }

    pub fn class(&self, name: &str) -> Option<NodeId> {
        self.classes.get(name).copied()
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.functions.iter().map(|(name, &f)| (name.as_str(), f))
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.classes.iter().map(|(name, &c)| (name.as_str(), c))
    }

    /// Resolve a variable name as seen from `at`: the nearest host's table
    /// first, then its enclosing hosts
    pub fn lookup_var(&self, graph: &Graph, at: NodeId, name: &str) -> Option<NodeId> {
        let mut current = graph.nearest_ancestor(at, |g, n| g.kind(n).is_scope_host());
        while let Some(host) = current {
            let table = self.tables.get(&host)?;
            if let Some(def) = table.get(name) {
                return Some(def);
            }
            current = table.parent;
        }
        None
    }

    /// Total number of recorded definitions
    pub fn definitions(&self) -> usize {
        self.tables.values().map(ScopeTable::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ProgramBuilder;

    #[test]
    fn test_first_write_declares_once() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let p = b.param(f, "n", None);
        let body = b.body(f).unwrap();
        let three = b.int(3);
        b.var_init(body, "x", None, three);
        let four = b.int(4);
        let x = b.ident("x");
        b.assign(body, x, four);
        let five = b.int(5);
        let n = b.ident("n");
        b.assign(body, n, five);
        let (mut g, root) = b.finish();

        let scopes = Scopes::collect(&mut g, root).unwrap();
        let table = scopes.table(f).unwrap();
        let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["n", "x"]);
        assert_eq!(table.get("n"), Some(p));

        let locals = g.child(f, Role::Locals).unwrap();
        assert_eq!(g.items(locals).len(), 1);
        assert_eq!(scopes.function("main"), Some(f));
    }

    #[test]
    fn test_method_writes_to_fields_are_not_redeclared() {
        let mut b = ProgramBuilder::new();
        let class = b.class("Counter");
        let field = b.field(class, "count", None, None);
        let m = b.method(class, "reset");
        let body = b.body(m).unwrap();
        let zero = b.int(0);
        b.var_init(body, "count", None, zero);
        let (mut g, root) = b.finish();

        let scopes = Scopes::collect(&mut g, root).unwrap();
        assert!(scopes.table(m).unwrap().is_empty());
        assert!(!g.has_child(m, Role::Locals));
        assert_eq!(scopes.table(class).unwrap().get("count"), Some(field));
        assert_eq!(scopes.class("Counter"), Some(class));
        assert_eq!(scopes.function("reset"), None);
    }

    #[test]
    fn test_lookup_falls_back_to_enclosing_class() {
        let mut b = ProgramBuilder::new();
        let class = b.class("Counter");
        let field = b.field(class, "count", None, None);
        let m = b.method(class, "get");
        let body = b.body(m).unwrap();
        let read = b.ident("count");
        b.ret(body, Some(read));
        let (mut g, root) = b.finish();

        let scopes = Scopes::collect(&mut g, root).unwrap();
        assert_eq!(scopes.lookup_var(&g, read, "count"), Some(field));
        assert_eq!(scopes.lookup_var(&g, read, "missing"), None);
    }
}
