//! Programmatic construction of parser-shaped graphs
//!
//! [`ProgramBuilder`] produces exactly the shapes the upstream parser hands
//! to the core: flat operator sequences, dotted chains, dot-pipes, keyword
//! arguments and `for … in` loops are left unlowered.

use super::graph::Graph;
use crate::error::GraphError;
use super::kind::{
    BinOp, DeclKind, ExprKind, NodeId, NodeKind, Payload, Role, StmtKind, SyntaxKind, TypeKind, UnOp,
};
use crate::lattice::BaseType;

/// Incremental builder for a program graph rooted at a `Program` node
pub struct ProgramBuilder {
    graph: Graph,
    program: NodeId,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// Builder holding an empty program
    pub fn new() -> Self {
        let mut graph = Graph::new();
        let program = graph.add(NodeKind::Decl(DeclKind::Program));
        Self { graph, program }
    }

    /// Root `Program` node
    pub fn program(&self) -> NodeId {
        self.program
    }

    /// Graph built so far
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Finished graph and its root
    pub fn finish(self) -> (Graph, NodeId) {
        (self.graph, self.program)
    }

    // ----- declarations -----

    /// Top-level function with an empty body
    pub fn function(&mut self, name: &str) -> NodeId {
        let func = self.new_function(name);
        self.graph.push_item(self.program, func);
        func
    }

    /// Top-level class with no members
    pub fn class(&mut self, name: &str) -> NodeId {
        let class = self.graph.add_with(NodeKind::Decl(DeclKind::Class), name);
        self.graph.push_item(self.program, class);
        class
    }

    /// Method of `class` with an empty body
    pub fn method(&mut self, class: NodeId, name: &str) -> NodeId {
        let func = self.new_function(name);
        self.graph.push_item(class, func);
        func
    }

    /// Field of `class`, optionally typed and initialized
    pub fn field(&mut self, class: NodeId, name: &str, ty: Option<NodeId>, default: Option<NodeId>) -> NodeId {
        let field = self.graph.add_with(NodeKind::Decl(DeclKind::Field), name);
        if let Some(ty) = ty {
            self.graph.set_child(field, Role::DeclaredType, ty);
        }
        if let Some(value) = default {
            self.graph.set_child(field, Role::Value, value);
        }
        self.graph.push_item(class, field);
        field
    }

    /// Next positional parameter of `func`
    pub fn param(&mut self, func: NodeId, name: &str, ty: Option<NodeId>) -> NodeId {
        let param = self.graph.add_with(NodeKind::Decl(DeclKind::Param), name);
        if let Some(ty) = ty {
            self.graph.set_child(param, Role::DeclaredType, ty);
        }
        self.graph.push_item(func, param);
        param
    }

    /// Declare the return type of `func`
    pub fn return_type(&mut self, func: NodeId, ty: NodeId) {
        self.graph.set_child(func, Role::ReturnType, ty);
    }

    /// Statement block of a function
    pub fn body(&self, func: NodeId) -> Result<NodeId, GraphError> {
        self.graph.require_child(func, Role::Body)
    }

    fn new_function(&mut self, name: &str) -> NodeId {
        let func = self.graph.add_with(NodeKind::Decl(DeclKind::Function), name);
        let body = self.graph.add(NodeKind::Stmt(StmtKind::Block));
        self.graph.set_child(func, Role::Body, body);
        func
    }

    // ----- type annotations -----

    pub fn base_type(&mut self, base: BaseType) -> NodeId {
        self.graph.add(NodeKind::Type(TypeKind::Base(base)))
    }

    pub fn generic_type(&mut self, base: BaseType, arg: NodeId) -> NodeId {
        let base_node = self.base_type(base);
        let generic = self.graph.add(NodeKind::Type(TypeKind::Generic));
        self.graph.set_child(generic, Role::Base, base_node);
        self.graph.set_child(generic, Role::Arg, arg);
        generic
    }

    pub fn named_type(&mut self, name: &str) -> NodeId {
        self.graph.add_with(NodeKind::Type(TypeKind::Named), name)
    }

    pub fn dynamic_type(&mut self) -> NodeId {
        self.graph.add(NodeKind::Type(TypeKind::Dynamic))
    }

    // ----- expressions -----

    pub fn int(&mut self, value: i64) -> NodeId {
        self.graph.add_with(NodeKind::Expr(ExprKind::IntLit), Payload::Int(value))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.graph.add_with(NodeKind::Expr(ExprKind::FloatLit), Payload::Float(value))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.graph.add_with(NodeKind::Expr(ExprKind::StrLit), value)
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.graph.add_with(NodeKind::Expr(ExprKind::BoolLit), Payload::Bool(value))
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.graph.add_with(NodeKind::Expr(ExprKind::Ident), name)
    }

    pub fn self_ref(&mut self) -> NodeId {
        self.graph.add(NodeKind::Expr(ExprKind::SelfRef))
    }

    pub fn list(&mut self, items: &[NodeId]) -> NodeId {
        self.collection(ExprKind::ListLit, items)
    }

    pub fn set(&mut self, items: &[NodeId]) -> NodeId {
        self.collection(ExprKind::SetLit, items)
    }

    pub fn map(&mut self, entries: &[(NodeId, NodeId)]) -> NodeId {
        let map = self.graph.add(NodeKind::Expr(ExprKind::MapLit));
        for &(key, value) in entries {
            let entry = self.graph.add(NodeKind::Expr(ExprKind::MapEntry));
            self.graph.set_child(entry, Role::Key, key);
            self.graph.set_child(entry, Role::Value, value);
            self.graph.push_item(map, entry);
        }
        map
    }

    fn collection(&mut self, kind: ExprKind, items: &[NodeId]) -> NodeId {
        let node = self.graph.add(NodeKind::Expr(kind));
        for &item in items {
            self.graph.push_item(node, item);
        }
        node
    }

    pub fn binary(&mut self, op: BinOp, left: NodeId, right: NodeId) -> NodeId {
        let node = self.graph.add(NodeKind::Expr(ExprKind::Binary(op)));
        self.graph.set_child(node, Role::Left, left);
        self.graph.set_child(node, Role::Right, right);
        node
    }

    pub fn unary(&mut self, op: UnOp, operand: NodeId) -> NodeId {
        let node = self.graph.add(NodeKind::Expr(ExprKind::Unary(op)));
        self.graph.set_child(node, Role::Operand, operand);
        node
    }

    /// Flat, unparenthesized operator sequence: `first op1 x1 op2 x2 …`
    pub fn op_seq(&mut self, first: NodeId, rest: &[(&str, NodeId)]) -> NodeId {
        let seq = self.graph.add(NodeKind::Syntax(SyntaxKind::OperatorSeq));
        self.graph.push_item(seq, first);
        for &(token, operand) in rest {
            let tok = self.graph.add_with(NodeKind::Syntax(SyntaxKind::OpToken), token);
            self.graph.push_item(seq, tok);
            self.graph.push_item(seq, operand);
        }
        seq
    }

    pub fn len(&mut self, operand: NodeId) -> NodeId {
        let node = self.graph.add(NodeKind::Expr(ExprKind::Len));
        self.graph.set_child(node, Role::Operand, operand);
        node
    }

    pub fn index(&mut self, container: NodeId, key: NodeId) -> NodeId {
        let node = self.graph.add(NodeKind::Expr(ExprKind::Index));
        self.graph.set_child(node, Role::Value, container);
        self.graph.set_child(node, Role::Key, key);
        node
    }

    /// Call by name, resolved later to a function, class or builtin
    pub fn call(&mut self, name: &str, args: &[NodeId]) -> NodeId {
        let call = self.graph.add_with(NodeKind::Expr(ExprKind::Call), name);
        for &arg in args {
            self.graph.push_item(call, arg);
        }
        call
    }

    /// `name: value` keyword argument, to be passed among a call's arguments
    pub fn kwarg(&mut self, name: &str, value: NodeId) -> NodeId {
        let kw = self.graph.add_with(NodeKind::Syntax(SyntaxKind::KwArg), name);
        self.graph.set_child(kw, Role::Value, value);
        kw
    }

    pub fn field_get(&mut self, receiver: NodeId, name: &str) -> NodeId {
        let node = self.graph.add_with(NodeKind::Expr(ExprKind::FieldGet), name);
        self.graph.set_child(node, Role::Receiver, receiver);
        node
    }

    /// `receiver.name(args)`
    pub fn method_call(&mut self, receiver: NodeId, name: &str, args: &[NodeId]) -> NodeId {
        let node = self.graph.add_with(NodeKind::Expr(ExprKind::MethodCall), name);
        self.graph.set_child(node, Role::Receiver, receiver);
        for &arg in args {
            self.graph.push_item(node, arg);
        }
        node
    }

    /// `base.seg1.seg2(…)…`: segments are identifiers or calls
    pub fn dotted(&mut self, base: NodeId, segments: &[NodeId]) -> NodeId {
        let node = self.graph.add(NodeKind::Syntax(SyntaxKind::Dotted));
        self.graph.push_item(node, base);
        for &seg in segments {
            self.graph.push_item(node, seg);
        }
        node
    }

    /// `head .f(a) .g()`: each call receives the running value as first argument
    pub fn dot_pipe(&mut self, head: NodeId, calls: &[NodeId]) -> NodeId {
        let node = self.graph.add(NodeKind::Syntax(SyntaxKind::DotPipe));
        self.graph.push_item(node, head);
        for &call in calls {
            self.graph.push_item(node, call);
        }
        node
    }

    // ----- statements (appended to `block`) -----

    /// `name [ty] : value` in `block`; returns the statement
    pub fn var_init(&mut self, block: NodeId, name: &str, ty: Option<NodeId>, value: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::VarInit));
        let target = self.ident(name);
        self.graph.set_child(stmt, Role::Target, target);
        if let Some(ty) = ty {
            self.graph.set_child(stmt, Role::DeclaredType, ty);
        }
        self.graph.set_child(stmt, Role::Value, value);
        self.graph.push_item(block, stmt);
        stmt
    }

    /// `target : value` in `block`
    pub fn assign(&mut self, block: NodeId, target: NodeId, value: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::Assign));
        self.graph.set_child(stmt, Role::Target, target);
        self.graph.set_child(stmt, Role::Value, value);
        self.graph.push_item(block, stmt);
        stmt
    }

    /// `return [value]` in `block`
    pub fn ret(&mut self, block: NodeId, value: Option<NodeId>) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::Return));
        if let Some(value) = value {
            self.graph.set_child(stmt, Role::Value, value);
        }
        self.graph.push_item(block, stmt);
        stmt
    }

    pub fn expr_stmt(&mut self, block: NodeId, expr: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::ExprStmt));
        self.graph.set_child(stmt, Role::Value, expr);
        self.graph.push_item(block, stmt);
        stmt
    }

    /// Returns the `(then, else)` blocks
    pub fn if_else(&mut self, block: NodeId, cond: NodeId) -> (NodeId, NodeId) {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::If));
        let then_block = self.graph.add(NodeKind::Stmt(StmtKind::Block));
        let else_block = self.graph.add(NodeKind::Stmt(StmtKind::Block));
        self.graph.set_child(stmt, Role::Cond, cond);
        self.graph.set_child(stmt, Role::Body, then_block);
        self.graph.set_child(stmt, Role::Else, else_block);
        self.graph.push_item(block, stmt);
        (then_block, else_block)
    }

    /// Returns the loop body
    pub fn while_loop(&mut self, block: NodeId, cond: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::While));
        let body = self.graph.add(NodeKind::Stmt(StmtKind::Block));
        self.graph.set_child(stmt, Role::Cond, cond);
        self.graph.set_child(stmt, Role::Body, body);
        self.graph.push_item(block, stmt);
        body
    }

    /// Unconditional loop; returns its body
    pub fn forever(&mut self, block: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::Loop));
        let body = self.graph.add(NodeKind::Stmt(StmtKind::Block));
        self.graph.set_child(stmt, Role::Body, body);
        self.graph.push_item(block, stmt);
        body
    }

    /// `for var in iter { … }`; returns the loop body
    pub fn for_in(&mut self, block: NodeId, var: &str, iter: NodeId) -> NodeId {
        let stmt = self.graph.add_with(NodeKind::Syntax(SyntaxKind::ForIn), var);
        let body = self.graph.add(NodeKind::Stmt(StmtKind::Block));
        self.graph.set_child(stmt, Role::Iter, iter);
        self.graph.set_child(stmt, Role::Body, body);
        self.graph.push_item(block, stmt);
        body
    }

    pub fn brk(&mut self, block: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::Break));
        self.graph.push_item(block, stmt);
        stmt
    }

    pub fn cont(&mut self, block: NodeId) -> NodeId {
        let stmt = self.graph.add(NodeKind::Stmt(StmtKind::Continue));
        self.graph.push_item(block, stmt);
        stmt
    }
}
