//! Root inference as fixpoint rules.
//!
//! Each stage contributes rules over the shared [`Relations`]:
//!
//! - [`program_graph`]: the whole-program graph and its reachability closure,
//! - [`call_graph`]: call sites that might collect,
//! - [`liveness`]: backward liveness of references,
//! - [`alias`]: flow of references between locations,
//! - [`roots`]: the final root sets.
//!
//! [`run`] loads the facts, plans the rules of the selected pipeline into
//! strata once, and evaluates them.

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use tracing::{debug, info, warn};

use super::fixpoint::{Database, Evaluator, Program, RelId, Rule, StratumStats};
use super::universe::{Domain, Record, Universe};
use crate::commons::{Result, Valid};
use crate::config::{AnalysisConfig, Pipeline};
use crate::front_end::schema::{self, ColumnType, Schema};
use crate::front_end::{Facts, Reference, Statement};

pub mod alias;
pub mod call_graph;
pub mod liveness;
pub mod program_graph;
pub mod roots;

#[cfg(test)]
mod tests;

/// A decoded location.
pub type Loc = (String, Statement);

/// Ids of every relation the rules read or write.
///
/// Locations and references are stored as record ids, functions and names as
/// symbol ids, statements as themselves.
#[derive(Clone, Copy, Debug)]
pub struct Relations {
    // inputs
    pub call: RelId,
    pub assign: RelId,
    pub uses: RelId,
    pub cf_edge: RelId,
    pub bind: RelId,
    pub collect: RelId,
    pub def: RelId,

    // intermediates
    pub location: RelId,
    pub graph_edge: RelId,
    pub reachable: RelId,

    // outputs
    pub might_collect: RelId,
    pub live_in: RelId,
    pub live_out: RelId,
    pub stack_root_vars: RelId,
    pub alias: RelId,
    pub alias_used: RelId,
    pub root_vars: RelId,
}

impl Relations {
    /// Declare every relation together with the indices its rules look up
    /// through.  Index 0 is always the column order of the schema.
    pub fn declare(db: &mut Database) -> Self {
        let mut declare =
            |s: &Schema, indices: &[&[usize]]| db.declare(s.name, s.arity(), indices);

        Relations {
            // 1: by callee
            call: declare(&schema::CALL, &[&[2, 0, 1]]),
            assign: declare(&schema::ASSIGN, &[]),
            // 1: by (function, reference), 2: by reference
            uses: declare(&schema::USE, &[&[0, 2, 1], &[2, 0, 1]]),
            // 1: by (function, target)
            cf_edge: declare(&schema::CF_EDGE, &[&[0, 2, 1]]),
            bind: declare(&schema::BIND, &[]),
            collect: declare(&schema::COLLECT, &[]),
            // 1: by (function, reference)
            def: declare(&schema::DEF, &[&[0, 2, 1]]),

            location: declare(&schema::LOCATION, &[]),
            // 1: by target location
            graph_edge: declare(&schema::GRAPH_EDGE, &[&[2, 3, 0, 1]]),
            // 1: by target
            reachable: declare(&schema::REACHABLE, &[&[1, 0]]),

            might_collect: declare(&schema::MIGHT_COLLECT, &[]),
            live_in: declare(&schema::LIVE_VARS_IN, &[]),
            live_out: declare(&schema::LIVE_VARS_OUT, &[]),
            stack_root_vars: declare(&schema::STACK_ROOT_VARS, &[]),
            // 1: by target (location, reference)
            alias: declare(&schema::ALIAS, &[&[2, 3, 0, 1]]),
            alias_used: declare(&schema::ALIAS_USED, &[]),
            root_vars: declare(&schema::ROOT_VARS, &[]),
        }
    }

    pub fn intermediates(&self) -> [RelId; 3] {
        [self.location, self.graph_edge, self.reachable]
    }
}

/// Interned configuration values the rules compare against.  `None` when the
/// name never occurs in the facts, in which case no rule can match it.
#[derive(Clone, Debug, Default)]
pub struct Constants {
    pub collect_primitive: Option<Domain>,
    pub self_name: Option<Domain>,
    pub empty: Option<Domain>,
    // symbols whose whole name matches the constructor pattern
    pub constructors: Set<Domain>,
}

impl Constants {
    pub fn new(config: &AnalysisConfig, universe: &Universe) -> Result<Self> {
        let pattern = config.constructor_regex()?;
        let constructors = universe
            .symbols
            .iter()
            .filter(|(_, name)| pattern.is_match(name))
            .map(|(id, _)| id)
            .collect();

        Ok(Constants {
            collect_primitive: universe.symbols.lookup(&config.collect_primitive),
            self_name: universe.symbols.lookup(&config.self_name),
            empty: universe.records.find(&Record::Empty),
            constructors,
        })
    }
}

/// The rules of `pipeline`, in no particular order.
pub fn rules(pipeline: Pipeline, rel: &Relations, consts: &Constants) -> Vec<Rule> {
    let mut rules = call_graph::rules(rel, consts);

    if pipeline.includes_liveness() {
        rules.extend(liveness::rules(rel));
        rules.extend(roots::stack_rules(rel, consts));
    }

    if pipeline.includes_alias() {
        rules.extend(program_graph::rules(rel));
        rules.extend(alias::rules(rel));
        rules.extend(roots::alias_rules(rel));
    }

    rules
}

// SECTION: running

/// The derived relations of one run, plus what is needed to decode them.
pub struct Analysis {
    pipeline: Pipeline,
    retained: bool,
    db: Database,
    universe: Universe,
    rel: Relations,
    stats: Vec<StratumStats>,
}

/// Run the whole analysis on `facts`.
pub fn run(facts: &Valid<Facts>, config: &AnalysisConfig) -> Result<Analysis> {
    info!(pipeline = %config.pipeline, "starting analysis");

    let mut db = Database::new();
    let rel = Relations::declare(&mut db);
    let mut universe = Universe::new();
    load(facts, &mut db, &mut universe, &rel);
    warn_external_callees(facts, config);

    let consts = Constants::new(config, &universe)?;
    let mut program = Program::new(&db, rules(config.pipeline, &rel, &consts))?;
    for r in rel.intermediates() {
        program.mark_intermediate(r);
    }

    let stats = Evaluator::new(&program)
        .parallel(config.parallel)
        .prune_intermediates(config.prune_intermediates)
        .run(&mut db, &universe);
    debug!(?stats, "evaluation statistics");

    let analysis = Analysis {
        pipeline: config.pipeline,
        retained: !config.prune_intermediates,
        db,
        universe,
        rel,
        stats,
    };

    for s in analysis.schemas() {
        info!(relation = s.name, tuples = analysis.len(&s), "derived");
    }
    info!(records = analysis.universe.records.len(), "analysis finished");

    Ok(analysis)
}

// Intern every input fact into the database.
fn load(facts: &Facts, db: &mut Database, universe: &mut Universe, rel: &Relations) {
    for (f, s, g) in &facts.call {
        let t = [universe.symbols.intern(f), *s, universe.symbols.intern(g)];
        db.insert(rel.call, t);
    }
    for (f, s, r, v) in &facts.assign {
        let t = [
            universe.symbols.intern(f),
            *s,
            universe.pack_reference(r),
            universe.pack_value(v),
        ];
        db.insert(rel.assign, t);
    }
    for (f, s, r) in &facts.uses {
        let t = [universe.symbols.intern(f), *s, universe.pack_reference(r)];
        db.insert(rel.uses, t);
    }
    for (f, s1, s2) in &facts.cf_edge {
        db.insert(rel.cf_edge, [universe.symbols.intern(f), *s1, *s2]);
    }
    for (f, s, r, g, p) in &facts.bind {
        let t = [
            universe.symbols.intern(f),
            *s,
            universe.pack_reference(r),
            universe.symbols.intern(g),
            universe.symbols.intern(p),
        ];
        db.insert(rel.bind, t);
    }
    for (f, s) in &facts.collect {
        db.insert(rel.collect, [universe.symbols.intern(f), *s]);
    }
    for (f, s, r) in &facts.defs {
        let t = [universe.symbols.intern(f), *s, universe.pack_reference(r)];
        db.insert(rel.def, t);
    }
}

// Callees without facts of their own are external: nothing flows out of them
// and they never count as collecting.
fn warn_external_callees(facts: &Facts, config: &AnalysisConfig) {
    let defined = facts.defined_functions();
    let callees: Set<&str> = facts.call.iter().map(|(_, _, g)| g.as_str()).collect();

    for callee in callees {
        if !defined.contains(callee) && callee != config.collect_primitive {
            warn!(callee, "callee has no facts of its own; treating it as external");
        }
    }
}

impl Analysis {
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    pub fn stats(&self) -> &[StratumStats] {
        &self.stats
    }

    /// The relations this run produced: the pipeline's outputs, and the
    /// program graph when it was retained.
    pub fn schemas(&self) -> Vec<Schema> {
        let mut out = vec![schema::MIGHT_COLLECT];
        if self.pipeline.includes_liveness() {
            out.extend([
                schema::LIVE_VARS_IN,
                schema::LIVE_VARS_OUT,
                schema::STACK_ROOT_VARS,
            ]);
        }
        if self.pipeline.includes_alias() {
            out.extend([schema::ALIAS, schema::ALIAS_USED, schema::ROOT_VARS]);
            if self.retained {
                out.extend(schema::INTERMEDIATES);
            }
        }
        out
    }

    pub fn len(&self, s: &Schema) -> usize {
        self.db.by_name(s.name).map_or(0, |r| r.len())
    }

    /// The rows of relation `s`, decoded to text and sorted.
    pub fn rows(&self, s: &Schema) -> Vec<Vec<String>> {
        let Some(relation) = self.db.by_name(s.name) else {
            return vec![];
        };

        let mut rows: Vec<Vec<String>> = relation
            .iter()
            .filter_map(|t| {
                s.columns
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| self.cell(*ty, t[i]))
                    .collect::<Option<Vec<String>>>()
            })
            .collect();
        rows.sort();
        rows
    }

    fn cell(&self, ty: ColumnType, id: Domain) -> Option<String> {
        use ColumnType as C;

        match ty {
            C::Symbol => self.universe.symbol(id),
            C::Statement => Some(id.to_string()),
            C::Reference => self.universe.reference(id).map(|r| r.to_string()),
            C::Value => self.universe.value(id).map(|v| v.to_string()),
            C::Location => self
                .universe
                .location(id)
                .map(|(f, s)| format!("$Location({f}, {s})")),
        }
    }

    // SECTION: typed views

    pub fn might_collect(&self) -> Set<Loc> {
        self.decode(self.rel.might_collect, |u, t| {
            Some((u.symbol(t[0])?, t[1]))
        })
    }

    pub fn live_vars_in(&self) -> Set<(String, Statement, Reference)> {
        self.decode(self.rel.live_in, |u, t| {
            Some((u.symbol(t[0])?, t[1], u.reference(t[2])?))
        })
    }

    pub fn live_vars_out(&self) -> Set<(String, Statement, Reference)> {
        self.decode(self.rel.live_out, |u, t| {
            Some((u.symbol(t[0])?, t[1], u.reference(t[2])?))
        })
    }

    pub fn stack_root_vars(&self) -> Set<(String, Reference)> {
        self.function_references(self.rel.stack_root_vars)
    }

    pub fn alias(&self) -> Set<(Loc, Reference, Loc, Reference)> {
        self.decode(self.rel.alias, |u, t| {
            Some((
                u.location(t[0])?,
                u.reference(t[1])?,
                u.location(t[2])?,
                u.reference(t[3])?,
            ))
        })
    }

    pub fn alias_used(&self) -> Set<(String, Reference)> {
        self.function_references(self.rel.alias_used)
    }

    pub fn root_vars(&self) -> Set<(String, Reference)> {
        self.function_references(self.rel.root_vars)
    }

    /// Empty unless the program graph was retained.
    pub fn reachable(&self) -> Set<(Loc, Loc)> {
        self.decode(self.rel.reachable, |u, t| {
            Some((u.location(t[0])?, u.location(t[1])?))
        })
    }

    fn function_references(&self, rel: RelId) -> Set<(String, Reference)> {
        self.decode(rel, |u, t| Some((u.symbol(t[0])?, u.reference(t[1])?)))
    }

    fn decode<T: Ord>(&self, rel: RelId, f: impl Fn(&Universe, &[Domain]) -> Option<T>) -> Set<T> {
        self.db
            .get(rel)
            .iter()
            .filter_map(|row| f(&self.universe, &row.to_vec()))
            .collect()
    }

    /// Size of every relation in the database, by name.
    pub fn sizes(&self) -> Map<String, usize> {
        self.db
            .relations()
            .map(|(_, r)| (r.name().to_owned(), r.len()))
            .collect()
    }
}
