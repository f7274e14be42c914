//! Graph-based intermediate representation
//!
//! One arena-backed graph carries the program from parser output through
//! desugaring, resolution and inference. Rewrites mutate it in place.

mod builder;
mod graph;
mod kind;
mod patch;
mod search;

pub use builder::ProgramBuilder;
pub use graph::{Graph, Node};
pub use kind::{
    BinOp, Category, DeclKind, ExprKind, NodeId, NodeKind, Payload, Role, StmtKind, SyntaxKind,
    TypeKind, UnOp,
};
pub use patch::{GraphPatch, Handle};
pub use search::{Direction, Search};
