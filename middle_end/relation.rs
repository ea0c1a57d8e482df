//! Named, fixed-arity, indexed fact tables.

use dashmap::DashSet;

use super::universe::Domain;

pub mod index;

pub use index::{Index, Row};


/// A tuple in relation column order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple(Box<[Domain]>);

impl std::ops::Deref for Tuple {
    type Target = [Domain];

    fn deref(&self) -> &[Domain] {
        &self.0
    }
}

impl<const N: usize> From<[Domain; N]> for Tuple {
    fn from(cols: [Domain; N]) -> Self {
        Tuple(cols.into())
    }
}

impl From<Vec<Domain>> for Tuple {
    fn from(cols: Vec<Domain>) -> Self {
        Tuple(cols.into())
    }
}

impl From<&[Domain]> for Tuple {
    fn from(cols: &[Domain]) -> Self {
        Tuple(cols.into())
    }
}

impl From<Row<'_>> for Tuple {
    fn from(row: Row<'_>) -> Self {
        Tuple(row.to_vec().into())
    }
}

/// A relation and all of its indices.  Index 0 is always the identity order;
/// every other index is a permutation of the columns declared up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    name: String,
    arity: usize,
    indices: Vec<Index>,
}

impl Relation {
    pub fn new(name: &str, arity: usize, extra_orders: &[&[usize]]) -> Self {
        let identity: Vec<usize> = (0..arity).collect();
        let mut indices = vec![Index::new(&identity)];
        for order in extra_orders {
            assert_eq!(
                order.len(),
                arity,
                "index {order:?} of `{name}` does not cover all {arity} columns"
            );
            let index = Index::new(order);
            if !index.is_identity() {
                indices.push(index);
            }
        }

        Relation {
            name: name.to_owned(),
            arity,
            indices,
        }
    }

    /// An empty relation with the same name, arity and indices.  Used for
    /// the per-round `delta` and `new` scratch relations.
    pub fn scratch(&self) -> Self {
        let mut r = self.clone();
        r.clear();
        r
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn index_orders(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.iter().map(Index::order)
    }

    pub fn len(&self) -> usize {
        self.indices[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a tuple into every index.  Returns false, and changes nothing,
    /// when the tuple is already present.
    pub fn insert(&mut self, tuple: &[Domain]) -> bool {
        assert_eq!(
            tuple.len(),
            self.arity,
            "arity mismatch inserting into `{}`",
            self.name
        );
        if !self.indices[0].insert(tuple) {
            return false;
        }
        for index in &mut self.indices[1..] {
            index.insert(tuple);
        }
        true
    }

    pub fn contains(&self, tuple: &[Domain]) -> bool {
        tuple.len() == self.arity && self.indices[0].contains(tuple)
    }

    /// Fold `other` into `self`, returning how many tuples were new.
    pub fn merge(&mut self, other: &Relation) -> usize {
        other.iter().filter(|t| self.insert(&t.to_vec())).count()
    }

    pub fn clear(&mut self) {
        for index in &mut self.indices {
            index.clear();
        }
    }

    /// Every tuple in identity order.
    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.indices[0].rows()
    }

    /// Lazy scan over the tuples of index `index` whose key lies between
    /// `lower` and `upper` (both full keys in that index's column order).
    pub fn range_scan<'a>(
        &'a self,
        index: usize,
        lower: &[Domain],
        upper: &[Domain],
    ) -> impl Iterator<Item = Row<'a>> + 'a {
        self.indices[index].range(lower, upper)
    }

    /// Lazy scan over the tuples of index `index` whose leading key columns
    /// equal `prefix`.
    pub fn lookup<'a>(&'a self, index: usize, prefix: &[Domain]) -> impl Iterator<Item = Row<'a>> + 'a {
        self.indices[index].prefix(prefix)
    }

    pub fn exists(&self, index: usize, prefix: &[Domain]) -> bool {
        self.lookup(index, prefix).next().is_some()
    }

    pub fn tuples(&self) -> Vec<Tuple> {
        self.iter().map(Tuple::from).collect()
    }
}

/// The `new` side of a round: a set that several rule evaluations may insert
/// into at the same time.  `insert` reports whether this call added the
/// tuple, which stays exact under contention.
#[derive(Debug, Default)]
pub struct Accumulator {
    set: DashSet<Tuple>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tuple: Tuple) -> bool {
        self.set.insert(tuple)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Move the accumulated tuples into a fresh relation shaped like `like`.
    pub fn into_relation(self, like: &Relation) -> Relation {
        let mut out = like.scratch();
        for tuple in self.set {
            out.insert(&tuple);
        }
        out
    }
}
