//! Node kinds, payloads and edge roles
//!
//! The kind of a node is a closed two-level tagged union: the outer level
//! selects the category (statement, expression, declaration, type, surface
//! syntax) and the inner level the concrete role inside it. Every pass
//! matches on these exhaustively.

use crate::lattice::BaseType;
use std::fmt;

/// Stable handle of a node inside a [`Graph`](super::Graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Stmt(StmtKind),
    Expr(ExprKind),
    Decl(DeclKind),
    Type(TypeKind),
    Syntax(SyntaxKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Block,
    VarInit,
    Assign,
    Return,
    If,
    While,
    Loop,
    Break,
    Continue,
    ExprStmt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    IntLit,
    FloatLit,
    StrLit,
    BoolLit,
    ListLit,
    SetLit,
    MapLit,
    MapEntry,
    Ident,
    SelfRef,
    Binary(BinOp),
    Unary(UnOp),
    Len,
    Index,
    /// Call by name, not yet resolved
    Call,
    SysCall,
    /// Call through a variable
    DynCall,
    MethodCall,
    ObjectInit,
    FieldGet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Program,
    Function,
    Class,
    Param,
    Field,
    VarDef,
    /// Holder of the implicit local definitions of a scope host
    Scope,
    ReturnSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Base(BaseType),
    /// Generic container: `Base` child plus one `Arg` child
    Generic,
    /// Class type referenced by name; resolved through `Ref`
    Named,
    Dynamic,
    Void,
}

/// Sugar produced by the parser and lowered before resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    OperatorSeq,
    OpToken,
    DotPipe,
    Dotted,
    KwArg,
    ForIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Statement,
    Expression,
    Declaration,
    Type,
    Syntax,
}

impl NodeKind {
    pub fn category(self) -> Category {
        match self {
            NodeKind::Stmt(_) => Category::Statement,
            NodeKind::Expr(_) => Category::Expression,
            NodeKind::Decl(_) => Category::Declaration,
            NodeKind::Type(_) => Category::Type,
            NodeKind::Syntax(_) => Category::Syntax,
        }
    }

    /// Whether inference attaches bounds to nodes of this kind
    pub fn is_typable(self) -> bool {
        match self {
            NodeKind::Expr(ExprKind::MapEntry) => false,
            NodeKind::Expr(_) => true,
            NodeKind::Decl(kind) => matches!(
                kind,
                DeclKind::Param | DeclKind::Field | DeclKind::VarDef | DeclKind::ReturnSlot
            ),
            NodeKind::Stmt(_) | NodeKind::Type(_) | NodeKind::Syntax(_) => false,
        }
    }

    pub fn is_scope_host(self) -> bool {
        matches!(
            self,
            NodeKind::Decl(DeclKind::Program | DeclKind::Function | DeclKind::Class)
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Stmt(k) => write!(f, "{k:?}"),
            NodeKind::Expr(ExprKind::Binary(op)) => write!(f, "Binary({})", op.token()),
            NodeKind::Expr(ExprKind::Unary(op)) => write!(f, "Unary({})", op.token()),
            NodeKind::Expr(k) => write!(f, "{k:?}"),
            NodeKind::Decl(k) => write!(f, "{k:?}"),
            NodeKind::Type(TypeKind::Base(b)) => write!(f, "Type({b})"),
            NodeKind::Type(k) => write!(f, "Type({k:?})"),
            NodeKind::Syntax(k) => write!(f, "{k:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub const ALL: [BinOp; 13] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::Mod,
        BinOp::Eq,
        BinOp::Ne,
        BinOp::Lt,
        BinOp::Le,
        BinOp::Gt,
        BinOp::Ge,
        BinOp::And,
        BinOp::Or,
    ];

    pub fn from_token(token: &str) -> Option<BinOp> {
        BinOp::ALL.into_iter().find(|op| op.token() == token)
    }

    pub fn token(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    /// Binding strength; all levels associate to the left
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    Neg,
}

impl UnOp {
    pub fn token(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
        }
    }
}

/// Value carried by a node besides its edges
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Node(NodeId),
}

impl Payload {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Str(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Str(s)
    }
}

/// Role of an edge, as seen from its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Value,
    Target,
    Left,
    Right,
    Operand,
    Cond,
    Body,
    Else,
    Iter,
    Receiver,
    Key,
    DeclaredType,
    ReturnType,
    ReturnSlot,
    Locals,
    Base,
    Arg,
    /// Resolved definition of a reference, call or named type
    Ref,
    /// Concrete type chosen by inference
    Colored,
    /// Position inside an ordered list
    Item(u32),
}

impl Role {
    /// Syntactic containment, as opposed to semantic links
    pub fn is_structural(self) -> bool {
        !matches!(self, Role::Ref | Role::Colored)
    }

    pub fn is_item(self) -> bool {
        matches!(self, Role::Item(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Item(i) => write!(f, "item[{i}]"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tokens_round_trip() {
        for op in BinOp::ALL {
            assert_eq!(BinOp::from_token(op.token()), Some(op));
        }
        assert_eq!(BinOp::from_token("**"), None);
    }

    #[test]
    fn test_precedence_orders_arithmetic_above_comparison() {
        assert!(BinOp::Mul.precedence() > BinOp::Add.precedence());
        assert!(BinOp::Add.precedence() > BinOp::Lt.precedence());
        assert!(BinOp::Lt.precedence() > BinOp::And.precedence());
        assert!(BinOp::And.precedence() > BinOp::Or.precedence());
    }

    #[test]
    fn test_typable_kinds() {
        assert!(NodeKind::Expr(ExprKind::IntLit).is_typable());
        assert!(NodeKind::Decl(DeclKind::ReturnSlot).is_typable());
        assert!(!NodeKind::Expr(ExprKind::MapEntry).is_typable());
        assert!(!NodeKind::Stmt(StmtKind::Assign).is_typable());
        assert!(!NodeKind::Decl(DeclKind::Function).is_typable());
    }

    #[test]
    fn test_semantic_roles_are_not_structural() {
        assert!(Role::Body.is_structural());
        assert!(Role::Item(3).is_structural());
        assert!(!Role::Ref.is_structural());
        assert!(!Role::Colored.is_structural());
    }
}
