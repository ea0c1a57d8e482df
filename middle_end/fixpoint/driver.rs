//! Running a planned program to its fixpoint.

use std::collections::BTreeMap as Map;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, debug_span, trace};

use super::stratify::{Program, Stratum};
use super::{Database, Emitter, RelId, RuleContext};
use crate::middle_end::relation::{Accumulator, Relation};
use crate::middle_end::universe::Universe;

/// What happened while one stratum ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StratumStats {
    pub name: String,
    pub recursive: bool,
    // recursive rounds, including the final round that derived nothing
    pub rounds: usize,
    // size of each computed relation after the non-recursive rules, then
    // after every round
    pub sizes: Vec<Map<String, usize>>,
}

// One rule evaluation: a rule, and for recursive rounds the body atom read
// from `delta`.
struct Job<'a> {
    rule: usize,
    delta: Option<(usize, &'a Relation)>,
}

pub struct Evaluator<'p> {
    program: &'p Program,
    parallel: bool,
    prune: bool,
}

impl<'p> Evaluator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Evaluator {
            program,
            parallel: false,
            prune: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Clear intermediate relations once their last reader is done.
    pub fn prune_intermediates(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Run every stratum in order.
    pub fn run(&self, db: &mut Database, universe: &Universe) -> Vec<StratumStats> {
        let mut stats = vec![];

        for (i, stratum) in self.program.strata().iter().enumerate() {
            let span = debug_span!("stratum", name = %stratum.name);
            let _enter = span.enter();

            stats.push(self.run_stratum(stratum, db, universe));

            if self.prune {
                for rel in self.program.prunable_after(i) {
                    trace!(relation = db.get(rel).name(), "pruning intermediate relation");
                    db.get_mut(rel).clear();
                }
            }
        }

        stats
    }

    fn run_stratum(&self, stratum: &Stratum, db: &mut Database, universe: &Universe) -> StratumStats {
        let rules = self.program.rules();
        let mut stats = StratumStats {
            name: stratum.name.clone(),
            recursive: stratum.recursive,
            ..StratumStats::default()
        };

        // rules that read nothing computed by this stratum run exactly once.
        let (base, recursive): (Vec<usize>, Vec<usize>) = stratum
            .rules
            .iter()
            .partition(|&&r| !rules[r].body.iter().any(|a| stratum.computes(*a)));

        let base_jobs: Vec<Job> = base.iter().map(|&rule| Job { rule, delta: None }).collect();
        let new = self.evaluate(&base_jobs, stratum, db, universe);
        for (rel, tuples) in &new {
            db.get_mut(*rel).merge(tuples);
        }
        stats.sizes.push(sizes(stratum, db));

        if !stratum.recursive {
            debug!(sizes = ?stats.sizes.last(), "stratum done");
            return stats;
        }

        let mut delta: Map<RelId, Relation> = stratum
            .relations
            .iter()
            .map(|&rel| (rel, db.get(rel).clone()))
            .collect();

        loop {
            stats.rounds += 1;

            let jobs: Vec<Job> = recursive
                .iter()
                .flat_map(|&rule| {
                    let body = &rules[rule].body;
                    let delta = &delta;
                    body.iter()
                        .enumerate()
                        .filter(|(_, atom)| stratum.computes(**atom))
                        .map(move |(pos, atom)| Job {
                            rule,
                            delta: Some((pos, &delta[atom])),
                        })
                })
                .collect();

            let new = self.evaluate(&jobs, stratum, db, universe);
            drop(jobs);

            let derived: usize = new.values().map(Relation::len).sum();
            trace!(round = stats.rounds, derived, "round done");
            if derived == 0 {
                break;
            }

            for (rel, tuples) in &new {
                db.get_mut(*rel).merge(tuples);
            }
            stats.sizes.push(sizes(stratum, db));
            delta = new;
        }

        debug!(rounds = stats.rounds, sizes = ?stats.sizes.last(), "stratum reached fixpoint");
        stats
    }

    // Evaluate `jobs` against the current database and return the `new`
    // relation of every relation the stratum computes.
    fn evaluate(
        &self,
        jobs: &[Job<'_>],
        stratum: &Stratum,
        db: &Database,
        universe: &Universe,
    ) -> Map<RelId, Relation> {
        let accumulators: Map<RelId, Accumulator> = stratum
            .relations
            .iter()
            .map(|&rel| (rel, Accumulator::new()))
            .collect();

        let run = |job: &Job<'_>| {
            let rule = &self.program.rules()[job.rule];
            let ctx = RuleContext::new(db, &rule.body, job.delta, universe);
            let out = Emitter::new(db.get(rule.head), &accumulators[&rule.head]);
            rule.run(&ctx, &out);
        };

        if self.parallel {
            jobs.par_iter().for_each(run);
        } else {
            jobs.iter().for_each(run);
        }

        accumulators
            .into_iter()
            .map(|(rel, acc)| (rel, acc.into_relation(db.get(rel))))
            .collect()
    }

    /// Re-run every rule of stratum `index` against the final contents of the
    /// database and count the tuples that would still be new.  Zero for every
    /// stratum once `run` has finished.
    pub fn residual(&self, index: usize, db: &Database, universe: &Universe) -> usize {
        let stratum = &self.program.strata()[index];
        let jobs: Vec<Job> = stratum
            .rules
            .iter()
            .map(|&rule| Job { rule, delta: None })
            .collect();
        self.evaluate(&jobs, stratum, db, universe)
            .values()
            .map(Relation::len)
            .sum()
    }
}

fn sizes(stratum: &Stratum, db: &Database) -> Map<String, usize> {
    stratum
        .relations
        .iter()
        .map(|&rel| (db.get(rel).name().to_owned(), db.get(rel).len()))
        .collect()
}
