//! Per-run analysis configuration.
//!
//! Everything here can come from a TOML file and be overridden on the command
//! line.  The two root heuristics that depend on naming conventions of the
//! transpiler (the collect primitive and the constructor pattern) live here
//! rather than in the rules.

use std::path::Path;
use std::str::FromStr;

use derive_more::Display;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::commons::{Error, Result};

/// Which group of derivations to run.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pipeline {
    /// MightCollect only.
    #[display(fmt = "call-graph")]
    CallGraph,
    /// MightCollect, liveness and the stack root heuristics.
    #[display(fmt = "dataflow")]
    Dataflow,
    /// Everything, including program reachability, aliasing and `root_vars`.
    #[display(fmt = "alias-aware")]
    AliasAware,
}

impl Pipeline {
    // input relations that must be present on disk for this pipeline.
    pub fn required_inputs(self) -> &'static [&'static str] {
        use Pipeline::*;

        match self {
            CallGraph => &["call"],
            Dataflow => &["call", "assign", "use", "cf_edge"],
            AliasAware => &["call", "assign", "use", "cf_edge", "bind", "collect", "def"],
        }
    }

    pub fn includes_liveness(self) -> bool {
        self != Pipeline::CallGraph
    }

    pub fn includes_alias(self) -> bool {
        self == Pipeline::AliasAware
    }
}

impl FromStr for Pipeline {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "call-graph" => Ok(Pipeline::CallGraph),
            "dataflow" => Ok(Pipeline::Dataflow),
            "alias-aware" => Ok(Pipeline::AliasAware),
            _ => Err(format!(
                "unknown pipeline `{s}`; expected one of: call-graph, dataflow, alias-aware"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub pipeline: Pipeline,
    /// Callee name whose call sites trigger a collection.
    pub collect_primitive: String,
    /// Functions whose whole name matches this are treated as constructors of
    /// scope guards: every field they write through `self_name` is a root.
    pub constructor_pattern: String,
    pub self_name: String,
    /// Drop intermediate relations as soon as their last consumer finished.
    pub prune_intermediates: bool,
    /// Evaluate the rules of a round on the rayon thread pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            pipeline: Pipeline::AliasAware,
            collect_primitive: "mylib.MaybeCollect".to_owned(),
            constructor_pattern: ".*ctx_.*__init__".to_owned(),
            self_name: "self".to_owned(),
            prune_intermediates: true,
            parallel: false,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    // the constructor pattern must match the entire function name.
    pub fn constructor_regex(&self) -> Result<Regex> {
        Regex::new(&format!("^(?:{})$", self.constructor_pattern)).map_err(|e| Error::Config {
            message: format!("bad constructor pattern: {e}"),
        })
    }
}
