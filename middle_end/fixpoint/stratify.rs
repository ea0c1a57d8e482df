//! Splitting a rule set into strata.
//!
//! Relations are the nodes of a dependency graph with an edge from every body
//! relation to the rule's head.  Each strongly connected component that has
//! rules is a stratum, and the components are run in topological order, so a
//! stratum only starts once every relation it reads from outside itself is
//! final.

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use super::{Database, RelId, Rule};
use crate::commons::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stratum {
    pub name: String,
    // relations computed by this stratum
    pub relations: Vec<RelId>,
    // indices into the program's rule list
    pub rules: Vec<usize>,
    pub recursive: bool,
}

impl Stratum {
    pub fn computes(&self, rel: RelId) -> bool {
        self.relations.contains(&rel)
    }
}

/// A rule set together with its evaluation plan.
#[derive(Debug)]
pub struct Program {
    rules: Vec<Rule>,
    strata: Vec<Stratum>,
    intermediates: Set<RelId>,
    // last stratum that reads (or computes) each relation
    last_use: Map<RelId, usize>,
}

impl Program {
    pub fn new(db: &Database, rules: Vec<Rule>) -> Result<Self> {
        let mut graph: DiGraph<RelId, bool> = DiGraph::new();
        let nodes: Vec<NodeIndex> = db.relations().map(|(id, _)| graph.add_node(id)).collect();

        for rule in &rules {
            for atom in &rule.body {
                graph.add_edge(nodes[atom.0], nodes[rule.head.0], false);
            }
            for atom in &rule.negated {
                graph.add_edge(nodes[atom.0], nodes[rule.head.0], true);
            }
        }

        let mut components = tarjan_scc(&graph);
        // tarjan_scc yields components in reverse topological order.
        components.reverse();

        let mut strata = vec![];
        for component in components {
            let mut relations: Vec<RelId> = component.iter().map(|n| graph[*n]).collect();
            relations.sort();

            let stratum_rules: Vec<usize> = rules
                .iter()
                .enumerate()
                .filter(|(_, r)| relations.contains(&r.head))
                .map(|(i, _)| i)
                .collect();
            if stratum_rules.is_empty() {
                // base relations
                continue;
            }

            let mut recursive = false;
            for &i in &stratum_rules {
                let rule = &rules[i];
                if let Some(neg) = rule.negated.iter().find(|a| relations.contains(a)) {
                    return Err(Error::Unstratifiable {
                        relation: db.get(*neg).name().to_owned(),
                    });
                }
                recursive |= rule.body.iter().any(|a| relations.contains(a));
            }

            let name = relations
                .iter()
                .map(|r| db.get(*r).name())
                .collect::<Vec<_>>()
                .join(",");
            debug!(stratum = %name, recursive, rules = stratum_rules.len(), "planned stratum");

            strata.push(Stratum {
                name,
                relations,
                rules: stratum_rules,
                recursive,
            });
        }

        let mut last_use = Map::new();
        for (i, stratum) in strata.iter().enumerate() {
            for &rel in &stratum.relations {
                last_use.insert(rel, i);
            }
            for &r in &stratum.rules {
                let rule = &rules[r];
                for atom in rule.body.iter().chain(&rule.negated) {
                    last_use.insert(*atom, i);
                }
            }
        }

        Ok(Program {
            rules,
            strata,
            intermediates: Set::new(),
            last_use,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }

    /// Mark `rel` as intermediate: it may be cleared once no later stratum
    /// reads it.
    pub fn mark_intermediate(&mut self, rel: RelId) {
        self.intermediates.insert(rel);
    }

    pub fn is_intermediate(&self, rel: RelId) -> bool {
        self.intermediates.contains(&rel)
    }

    /// Intermediate relations whose last reader is stratum `index`.
    pub fn prunable_after(&self, index: usize) -> impl Iterator<Item = RelId> + '_ {
        self.intermediates
            .iter()
            .copied()
            .filter(move |rel| self.last_use.get(rel) == Some(&index))
    }
}
