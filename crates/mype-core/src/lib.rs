//! # Mype Core
//!
//! Semantic core of the Mype compiler. A parsed program lives in a single
//! [`Graph`] of typed nodes connected by role-labelled edges, and every
//! pass after parsing is a set of condition/action rules run over it.
//!
//! ## Modules
//!
//! - **[`ir`]** - node arena, edges, searches and pure graph patches
//! - **[`rewrite`]** - rule trait plus the single-pass and fixpoint drivers
//! - **[`lattice`]** - the `Dype` and `MypeArged` type-set lattices
//! - **[`desugar`]** - lowering of operator sequences, pipes, dotted chains,
//!   keyword arguments and `for` loops
//! - **[`resolve`]** - scope tables and identifier/call/type resolution
//! - **[`infer`]** - POS/NEG bound propagation and concrete type coloring
//! - **[`pipeline`]** - the passes above, in order
//!
//! ## Quick Start
//!
//! ```rust
//! use mype_core::{MypePipeline, ProgramBuilder};
//! use mype_core::infer::{colored_type, describe_type};
//!
//! let mut b = ProgramBuilder::new();
//! let func = b.function("main");
//! let body = b.body(func).unwrap();
//! let items = [b.int(1), b.int(2)];
//! let list = b.list(&items);
//! b.var_init(body, "xs", None, list);
//! let (mut graph, root) = b.finish();
//!
//! MypePipeline::default().run(&mut graph, root).unwrap();
//! let ty = colored_type(&graph, list).unwrap();
//! assert_eq!(describe_type(&graph, ty), "list<int>");
//! ```

pub mod config;
pub mod desugar;
pub mod error;
pub mod infer;
pub mod ir;
pub mod lattice;
pub mod pipeline;
pub mod resolve;
pub mod rewrite;

pub use config::PipelineConfig;
pub use error::{GraphError, LatticeError, MypeError, Result};
pub use ir::{Graph, NodeId, NodeKind, ProgramBuilder, Role};
pub use lattice::{BaseType, Dype, MypeArged};
pub use pipeline::{MypePipeline, PipelineReport};
pub use rewrite::{Rewriter, Rule};
