//! The semantic passes, in order
//!
//! `desugar → resolve → infer` over one program graph. Each pass leaves the
//! graph in the shape the next one expects; the first failure stops the run.

use crate::config::PipelineConfig;
use crate::desugar::{DesugarReport, Desugarer};
use crate::error::Result;
use crate::infer::{InferenceEngine, InferenceReport};
use crate::ir::{Graph, NodeId};
use crate::resolve::{ResolveReport, Resolver};
use tracing::info;

/// What each pass did during one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// `None` when desugaring is switched off
    pub desugar: Option<DesugarReport>,
    pub resolve: ResolveReport,
    pub infer: InferenceReport,
}

/// Desugaring, resolution and inference driven by one [`PipelineConfig`]
#[derive(Debug, Clone, Default)]
pub struct MypePipeline {
    config: PipelineConfig,
}

impl MypePipeline {
    /// Pipeline using `config`
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Settings this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every enabled pass over the program at `root`, stopping at the first error
    pub fn run(&self, graph: &mut Graph, root: NodeId) -> Result<PipelineReport> {
        let rewriter = self.config.rewriter();

        let desugar = if self.config.desugar {
            Some(Desugarer::new(rewriter.clone()).run(graph, root)?)
        } else {
            None
        };
        let resolve = Resolver::new(rewriter.clone()).run(graph, root)?;
        let infer = InferenceEngine::new(rewriter)
            .with_untyped_params(self.config.allow_untyped_params)
            .run(graph, root)?;

        info!(
            nodes = graph.len(),
            rounds = resolve.stats.rounds + infer.stats.rounds,
            "semantic passes complete"
        );
        Ok(PipelineReport {
            desugar,
            resolve,
            infer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MypeError;
    use crate::infer::{colored_type, describe_type};
    use crate::ir::{ProgramBuilder, Role};

    #[test]
    fn test_sugar_is_lowered_before_inference() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let (one, two, three) = (b.int(1), b.int(2), b.int(3));
        let seq = b.op_seq(one, &[("+", two), ("*", three)]);
        b.var_init(body, "x", None, seq);
        let (mut g, root) = b.finish();

        let report = MypePipeline::default().run(&mut g, root).unwrap();
        assert_eq!(report.desugar.map(|d| d.firings), Some(1));

        let init = g.items(body)[0];
        let value = g.child(init, Role::Value).unwrap();
        assert_eq!(describe_type(&g, colored_type(&g, value).unwrap()), "int");
    }

    #[test]
    fn test_desugar_can_be_switched_off() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let flag = b.boolean(true);
        let init = b.var_init(body, "ok", None, flag);
        let (mut g, root) = b.finish();

        let pipeline = MypePipeline::new(PipelineConfig::default().with_desugar(false));
        let report = pipeline.run(&mut g, root).unwrap();
        assert!(report.desugar.is_none());
        let target = g.child(init, Role::Target).unwrap();
        assert_eq!(describe_type(&g, colored_type(&g, target).unwrap()), "bool");
    }

    #[test]
    fn test_unknown_identifier_stops_the_run() {
        let mut b = ProgramBuilder::new();
        let f = b.function("main");
        let body = b.body(f).unwrap();
        let ghost = b.ident("ghost");
        b.expr_stmt(body, ghost);
        let (mut g, root) = b.finish();

        let err = MypePipeline::default().run(&mut g, root).unwrap_err();
        assert!(matches!(err, MypeError::UnknownIdentifier { ref name, .. } if name == "ghost"));
    }
}
