//! Stratified semi-naive fixpoint evaluation.
//!
//! Relations live in a [`Database`].  Derivations are [`Rule`]s: a head
//! relation, the body relations the rule reads, and a Rust closure that joins
//! them.  A [`Program`] groups the rules into strata once, in dependency
//! order; the [`Evaluator`] runs the strata one after the other.
//!
//! Inside a recursive stratum each round evaluates every rule once per body
//! atom that belongs to the stratum, reading that atom from `delta` and every
//! other atom from `total`.  Rule heads never write to `total` directly: they
//! go through an [`Emitter`] into the round's `new` accumulator, which is
//! folded into `total` only after the round.

use std::collections::HashMap;

use super::relation::{Accumulator, Relation, Tuple};
use super::universe::{RecordTable, SymbolTable, Universe};

pub mod driver;
pub mod stratify;

pub use driver::{Evaluator, StratumStats};
pub use stratify::{Program, Stratum};


#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelId(pub usize);

// SECTION: database

#[derive(Clone, Debug, Default)]
pub struct Database {
    relations: Vec<Relation>,
    names: HashMap<String, RelId>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a relation.  `indices` lists extra column orders besides the
    /// identity order every relation gets.
    pub fn declare(&mut self, name: &str, arity: usize, indices: &[&[usize]]) -> RelId {
        assert!(
            !self.names.contains_key(name),
            "relation `{name}` declared twice"
        );
        let id = RelId(self.relations.len());
        self.relations.push(Relation::new(name, arity, indices));
        self.names.insert(name.to_owned(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<RelId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, rel: RelId) -> &Relation {
        &self.relations[rel.0]
    }

    pub fn get_mut(&mut self, rel: RelId) -> &mut Relation {
        &mut self.relations[rel.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Relation> {
        self.id(name).map(|id| self.get(id))
    }

    pub fn insert(&mut self, rel: RelId, tuple: impl Into<Tuple>) -> bool {
        self.get_mut(rel).insert(&tuple.into())
    }

    pub fn is_empty(&self, rel: RelId) -> bool {
        self.get(rel).is_empty()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn relations(&self) -> impl Iterator<Item = (RelId, &Relation)> {
        self.relations
            .iter()
            .enumerate()
            .map(|(i, r)| (RelId(i), r))
    }
}

// SECTION: rules

type RuleFn = dyn Fn(&RuleContext<'_>, &Emitter<'_>) + Send + Sync;

fn no_derivations(_: &RuleContext<'_>, _: &Emitter<'_>) {}

/// One derivation rule.  `text` is the rule in Datalog notation, used for
/// logging only.
pub struct Rule {
    pub text: String,
    pub head: RelId,
    pub body: Vec<RelId>,
    pub negated: Vec<RelId>,
    eval: Box<RuleFn>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("text", &self.text)
            .field("head", &self.head)
            .field("body", &self.body)
            .field("negated", &self.negated)
            .finish()
    }
}

impl Rule {
    pub fn new(text: impl Into<String>, head: RelId) -> Self {
        Rule {
            text: text.into(),
            head,
            body: vec![],
            negated: vec![],
            eval: Box::new(no_derivations),
        }
    }

    /// Positive body atoms, in the order the closure reads them with
    /// [`RuleContext::atom`].
    pub fn body(mut self, atoms: impl IntoIterator<Item = RelId>) -> Self {
        self.body = atoms.into_iter().collect();
        self
    }

    pub fn negates(mut self, atoms: impl IntoIterator<Item = RelId>) -> Self {
        self.negated = atoms.into_iter().collect();
        self
    }

    pub fn eval(mut self, f: impl Fn(&RuleContext<'_>, &Emitter<'_>) + Send + Sync + 'static) -> Self {
        self.eval = Box::new(f);
        self
    }

    pub(crate) fn run(&self, ctx: &RuleContext<'_>, out: &Emitter<'_>) {
        (self.eval)(ctx, out)
    }
}

/// What a rule body sees during evaluation: a read-only snapshot of the
/// database plus, in recursive rounds, the `delta` standing in for one atom.
pub struct RuleContext<'a> {
    db: &'a Database,
    body: &'a [RelId],
    delta: Option<(usize, &'a Relation)>,
    universe: &'a Universe,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        db: &'a Database,
        body: &'a [RelId],
        delta: Option<(usize, &'a Relation)>,
        universe: &'a Universe,
    ) -> Self {
        RuleContext {
            db,
            body,
            delta,
            universe,
        }
    }

    /// The relation standing for positive body atom `i`.
    pub fn atom(&self, i: usize) -> &'a Relation {
        match self.delta {
            Some((pos, delta)) if pos == i => delta,
            _ => self.db.get(self.body[i]),
        }
    }

    /// Whether body atom `i` reads this round's `delta`.  Rules with several
    /// atoms of their own stratum use this to pick the side that drives the
    /// join.
    pub fn is_delta(&self, i: usize) -> bool {
        matches!(self.delta, Some((pos, _)) if pos == i)
    }

    /// The complete contents of `rel`.  Negated atoms are read through this;
    /// stratification guarantees they are final.
    pub fn total(&self, rel: RelId) -> &'a Relation {
        self.db.get(rel)
    }

    pub fn symbols(&self) -> &'a SymbolTable {
        &self.universe.symbols
    }

    pub fn records(&self) -> &'a RecordTable {
        &self.universe.records
    }
}

/// Where a rule writes its head tuples.  Tuples already in `total` are
/// dropped, so `new` only ever holds tuples that were not known at the start
/// of the round.
pub struct Emitter<'a> {
    total: &'a Relation,
    new: &'a Accumulator,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(total: &'a Relation, new: &'a Accumulator) -> Self {
        Emitter { total, new }
    }

    /// Returns true iff the tuple was not derived before.
    pub fn emit(&self, tuple: impl Into<Tuple>) -> bool {
        let tuple = tuple.into();
        !self.total.contains(&tuple) && self.new.insert(tuple)
    }
}
