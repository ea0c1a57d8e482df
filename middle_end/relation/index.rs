//! One total-order index of a relation.
//!
//! An index stores every tuple of its relation with the columns permuted into
//! the index order, so that a BTree range over a key prefix is a scan over
//! every tuple agreeing on the leading indexed columns.

use std::collections::BTreeSet as Set;
use std::ops::Bound;

use crate::middle_end::universe::Domain;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    // order[i] is the tuple column stored at key position i
    order: Box<[usize]>,
    // inverse[c] is the key position holding tuple column c
    inverse: Box<[usize]>,
    tree: Set<Box<[Domain]>>,
}

impl Index {
    /// `order` must be a permutation of `0..arity`.
    pub fn new(order: &[usize]) -> Self {
        let mut inverse = vec![usize::MAX; order.len()];
        for (pos, &col) in order.iter().enumerate() {
            assert!(
                col < order.len() && inverse[col] == usize::MAX,
                "index order {order:?} is not a permutation"
            );
            inverse[col] = pos;
        }

        Index {
            order: order.into(),
            inverse: inverse.into(),
            tree: Set::new(),
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(i, &c)| i == c)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    // `tuple` is in relation column order.
    pub fn insert(&mut self, tuple: &[Domain]) -> bool {
        let key: Box<[Domain]> = self.order.iter().map(|&c| tuple[c]).collect();
        self.tree.insert(key)
    }

    pub fn contains(&self, tuple: &[Domain]) -> bool {
        let key: Vec<Domain> = self.order.iter().map(|&c| tuple[c]).collect();
        self.tree.contains(key.as_slice())
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// All tuples whose key lies in `lower..=upper`.  Both bounds are full
    /// keys in index order.  An empty range (lower > upper) yields nothing.
    pub fn range<'a>(
        &'a self,
        lower: &[Domain],
        upper: &[Domain],
    ) -> impl Iterator<Item = Row<'a>> + 'a {
        let range = (lower <= upper).then(|| {
            self.tree
                .range::<[Domain], _>((Bound::Included(lower), Bound::Included(upper)))
        });
        let inverse: &'a [usize] = &self.inverse;

        range
            .into_iter()
            .flatten()
            .map(move |key| Row { key, inverse })
    }

    /// All tuples whose leading key columns equal `prefix`.
    pub fn prefix<'a>(&'a self, prefix: &[Domain]) -> impl Iterator<Item = Row<'a>> + 'a {
        let arity = self.order.len();
        let mut lower = prefix.to_vec();
        let mut upper = prefix.to_vec();
        lower.resize(arity, Domain::MIN);
        upper.resize(arity, Domain::MAX);
        self.range(&lower, &upper)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        let inverse: &[usize] = &self.inverse;
        self.tree.iter().map(move |key| Row { key, inverse })
    }
}

/// A tuple read through an index.  Indexing a row by column number undoes
/// the index permutation, so rows read the same whichever index produced
/// them.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    key: &'a [Domain],
    inverse: &'a [usize],
}

impl<'a> Row<'a> {
    pub fn get(&self, col: usize) -> Domain {
        self.key[self.inverse[col]]
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Domain> {
        (0..self.key.len()).map(|c| self.get(c)).collect()
    }
}

impl std::ops::Index<usize> for Row<'_> {
    type Output = Domain;

    fn index(&self, col: usize) -> &Domain {
        &self.key[self.inverse[col]]
    }
}
