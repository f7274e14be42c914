//! Pipeline configuration
//!
//! Loaded from a TOML file or built in code. Missing keys take their
//! defaults, so an empty file is a valid configuration.

use crate::rewrite::Rewriter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Productive rounds a fixpoint may run before it is considered diverging
    pub max_rounds: usize,
    /// Lower surface syntax before resolution
    pub desugar: bool,
    /// Treat undeclared parameters of functions without call sites as `dyn`
    pub allow_untyped_params: bool,
    /// Log every rule firing at trace level
    pub trace_rules: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rounds: Rewriter::DEFAULT_MAX_ROUNDS,
            desugar: true,
            allow_untyped_params: true,
            trace_rules: false,
        }
    }
}

impl PipelineConfig {
    /// Parse settings from TOML text; absent keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid pipeline configuration")
    }

    /// Read settings from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("in {}", path.display()))
    }

    /// Serialize every setting as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize pipeline configuration")
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_desugar(mut self, desugar: bool) -> Self {
        self.desugar = desugar;
        self
    }

    pub fn with_untyped_params(mut self, allow: bool) -> Self {
        self.allow_untyped_params = allow;
        self
    }

    pub fn with_trace_rules(mut self, trace_rules: bool) -> Self {
        self.trace_rules = trace_rules;
        self
    }

    /// Fixpoint driver configured from these settings
    pub fn rewriter(&self) -> Rewriter {
        Rewriter::new()
            .with_max_rounds(self.max_rounds)
            .with_trace_rules(self.trace_rules)
    }
}
