//! Error taxonomy for the semantic core
//!
//! Every error is fatal: the pipeline has no partial-success mode, so each
//! variant aborts the compilation that raised it.

use crate::ir::NodeId;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MypeError>;

/// Violations of the IR store's own invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {node} has no `{role}` child")]
    MissingChild { node: NodeId, role: String },

    #[error("node {node} carries no {expected} payload")]
    MissingPayload { node: NodeId, expected: &'static str },

    #[error("patch handle #{0} does not name a node created by the patch")]
    StaleHandle(usize),
}

/// Internal invariant violations of the type-set algebras
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatticeError {
    #[error("union operand `{0}` is not a leaf (nested unions are forbidden)")]
    NestedUnion(String),

    #[error("generic argument `{0}` is not a single leaf type")]
    MalformedArgument(String),

    #[error("cannot decide whether `{sub}` is a subset of `{container}`: operand nested past one level")]
    UndeterminedSubset { container: String, sub: String },

    #[error("incompatible operand shapes `{left}` and `{right}`")]
    IncompatibleShapes { left: String, right: String },
}

/// Fatal conditions raised by desugaring, resolution and inference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MypeError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("lattice invariant violated: {0}")]
    Lattice(#[from] LatticeError),

    #[error("malformed syntax at {node}: {reason}")]
    Desugar { node: NodeId, reason: String },

    #[error("unknown identifier `{name}` at {node}")]
    UnknownIdentifier { name: String, node: NodeId },

    #[error("unknown function `{name}` at {node}")]
    UnknownFunction { name: String, node: NodeId },

    #[error("unknown class `{name}` at {node}")]
    UnknownClass { name: String, node: NodeId },

    #[error("rewrite did not converge after {rounds} rounds; rule `{rule}` still firing at {node}")]
    FixpointDiverged {
        rule: String,
        node: NodeId,
        rounds: usize,
    },

    #[error("no consistent type for {kind} at {node}: shown capable of `{pos}`, permitted `{neg}`")]
    NoConsistentType {
        node: NodeId,
        kind: String,
        pos: String,
        neg: String,
    },
}

impl MypeError {
    pub(crate) fn desugar(node: NodeId, reason: impl Into<String>) -> Self {
        MypeError::Desugar {
            node,
            reason: reason.into(),
        }
    }

    /// Node the error is anchored at, when there is one
    pub fn node(&self) -> Option<NodeId> {
        match self {
            MypeError::Graph(GraphError::MissingChild { node, .. })
            | MypeError::Graph(GraphError::MissingPayload { node, .. })
            | MypeError::Desugar { node, .. }
            | MypeError::UnknownIdentifier { node, .. }
            | MypeError::UnknownFunction { node, .. }
            | MypeError::UnknownClass { node, .. }
            | MypeError::FixpointDiverged { node, .. }
            | MypeError::NoConsistentType { node, .. } => Some(*node),
            MypeError::Graph(GraphError::StaleHandle(_)) | MypeError::Lattice(_) => None,
        }
    }
}
