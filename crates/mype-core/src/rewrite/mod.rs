//! Condition/action rewrite engine
//!
//! A [`Rule`] is a pure pair of functions over a read-only context: a cheap
//! `applies` test and a `rewrite` that describes its effect as a patch.
//! Patches are committed through [`RewriteContext::commit`], the only place
//! the graph (or any side table) is written.
//!
//! Two drivers:
//! - [`Rewriter::apply_once`] runs each rule once over a freshly searched match set
//! - [`Rewriter::fixpoint`] repeats all rules over a fixed candidate list until
//!   a round fires nothing, failing loudly past the round ceiling

use crate::error::{MypeError, Result};
use crate::ir::{Graph, GraphPatch, NodeId, Search};
use tracing::{debug, trace};

/// State a rule set reads from and commits patches into
pub trait RewriteContext {
    type Patch;

    fn graph(&self) -> &Graph;

    fn commit(&mut self, patch: Self::Patch) -> Result<()>;
}

pub trait Rule<C: RewriteContext> {
    fn name(&self) -> &'static str;

    /// Whether the rule may fire at `node`
    fn applies(&self, cx: &C, node: NodeId) -> bool;

    /// Effect of firing at `node`; `None` when there turns out to be nothing to do
    fn rewrite(&self, cx: &C, node: NodeId) -> Result<Option<C::Patch>>;
}

pub type RuleSet<C> = Vec<Box<dyn Rule<C>>>;

impl RewriteContext for Graph {
    type Patch = GraphPatch;

    fn graph(&self) -> &Graph {
        self
    }

    fn commit(&mut self, patch: GraphPatch) -> Result<()> {
        self.apply_patch(patch)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixpointStats {
    /// Rounds run, including the final quiet one
    pub rounds: usize,
    /// Rounds in which at least one rule fired
    pub productive_rounds: usize,
    pub firings: usize,
}

#[derive(Debug, Clone)]
pub struct Rewriter {
    max_rounds: usize,
    trace_rules: bool,
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Rewriter {
    pub const DEFAULT_MAX_ROUNDS: usize = 20;

    pub fn new() -> Self {
        Self {
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
            trace_rules: false,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Log every individual firing
    pub fn with_trace_rules(mut self, trace_rules: bool) -> Self {
        self.trace_rules = trace_rules;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Run each rule once, in order, over the nodes below `root` it applies to
    ///
    /// The match set is searched afresh for every rule, so a rule sees the
    /// output of the rules before it. Matches are visited in discovery order
    /// and re-checked before firing. Returns the number of firings.
    pub fn apply_once<C: RewriteContext>(
        &self,
        cx: &mut C,
        rules: &[Box<dyn Rule<C>>],
        root: NodeId,
    ) -> Result<usize> {
        let mut firings = 0;
        for rule in rules {
            let matches = {
                let view: &C = cx;
                Search::down(view.graph(), root).collect(|_, node| rule.applies(view, node))
            };
            let mut fired = 0;
            for node in matches {
                if !rule.applies(cx, node) {
                    continue;
                }
                if let Some(patch) = rule.rewrite(cx, node)? {
                    cx.commit(patch)?;
                    fired += 1;
                    if self.trace_rules {
                        trace!(rule = rule.name(), %node, "rule fired");
                    }
                }
            }
            debug!(rule = rule.name(), fired, "single pass");
            firings += fired;
        }
        Ok(firings)
    }

    /// Repeat `rules` over `candidates` until a full round fires nothing
    ///
    /// Within a round rules run in list order and candidates in list order.
    pub fn fixpoint<C: RewriteContext>(
        &self,
        cx: &mut C,
        rules: &[Box<dyn Rule<C>>],
        candidates: &[NodeId],
    ) -> Result<FixpointStats> {
        let mut stats = FixpointStats::default();
        loop {
            stats.rounds += 1;
            let mut fired = 0;
            let mut last = None;
            for rule in rules {
                for &node in candidates {
                    if !rule.applies(cx, node) {
                        continue;
                    }
                    if let Some(patch) = rule.rewrite(cx, node)? {
                        cx.commit(patch)?;
                        fired += 1;
                        last = Some((rule.name(), node));
                        if self.trace_rules {
                            trace!(round = stats.rounds, rule = rule.name(), %node, "rule fired");
                        }
                    }
                }
            }
            debug!(round = stats.rounds, fired, "fixpoint round");

            let Some((rule, node)) = last else {
                return Ok(stats);
            };
            stats.productive_rounds += 1;
            stats.firings += fired;
            if stats.productive_rounds > self.max_rounds {
                return Err(MypeError::FixpointDiverged {
                    rule: rule.to_string(),
                    node,
                    rounds: stats.rounds,
                });
            }
        }
    }
}
