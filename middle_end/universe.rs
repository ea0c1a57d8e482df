//! Interning of everything that ends up in a tuple column.
//!
//! Symbols live in a [`SymbolTable`]; packed tagged-sum values (references,
//! values, locations) live in a [`RecordTable`], an arena of records keyed by
//! constructor tag and field ids.  Tuples only ever hold the resulting
//! [`Domain`] ids.

use std::sync::RwLock;

use indexmap::IndexSet;

use crate::front_end::{Reference, Statement, Value};

/// The scalar type of every tuple column.
pub type Domain = u32;

/// Record id that never denotes a record.
pub const NIL: Domain = 0;

// SECTION: symbols

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: IndexSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Domain {
        match self.names.get_index_of(name) {
            Some(i) => i as Domain,
            None => self.names.insert_full(name.to_owned()).0 as Domain,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Domain> {
        self.names.get_index_of(name).map(|i| i as Domain)
    }

    pub fn resolve(&self, id: Domain) -> Option<&str> {
        self.names.get_index(id as usize).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Domain, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (i as Domain, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// SECTION: records

/// A packed record: constructor tag plus field ids.  Symbol fields hold
/// symbol ids, statement fields hold the statement itself, and nested
/// records hold record ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Record {
    // (function, statement)
    Location(Domain, Statement),
    // (function, name)
    LocalVariable(Domain, Domain),
    // (base, field)
    ObjectMember(Domain, Domain),
    Empty,
    HeapObject(Domain),
    // reference record id
    Ref(Domain),
}

/// The record arena.  Rules may pack new records while a round is being
/// evaluated in parallel, so the arena sits behind a read-write lock; lookups
/// of existing records only take the read lock.
#[derive(Debug, Default)]
pub struct RecordTable {
    // record id - 1 is the position in the set
    records: RwLock<IndexSet<Record>>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `record`, returning its id.  Ids start at 1.
    pub fn pack(&self, record: Record) -> Domain {
        if let Some(id) = self.find(&record) {
            return id;
        }
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert_full(record).0 as Domain + 1
    }

    /// The id of `record` if it was packed before.
    pub fn find(&self, record: &Record) -> Option<Domain> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get_index_of(record).map(|i| i as Domain + 1)
    }

    /// The record behind `id`; `None` for [`NIL`] or ids that were never
    /// handed out.
    pub fn unpack(&self, id: Domain) -> Option<Record> {
        if id == NIL {
            return None;
        }
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get_index(id as usize - 1).copied()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // SECTION: locations

    pub fn location(&self, f: Domain, s: Statement) -> Domain {
        self.pack(Record::Location(f, s))
    }

    pub fn find_location(&self, f: Domain, s: Statement) -> Option<Domain> {
        self.find(&Record::Location(f, s))
    }

    pub fn unpack_location(&self, id: Domain) -> Option<(Domain, Statement)> {
        match self.unpack(id)? {
            Record::Location(f, s) => Some((f, s)),
            _ => None,
        }
    }
}

/// Symbols and records of one analysis run.
///
/// Symbols are interned while facts are loaded and rules are set up, and are
/// read-only during evaluation.  Records can still grow during evaluation.
#[derive(Debug, Default)]
pub struct Universe {
    pub symbols: SymbolTable,
    pub records: RecordTable,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pack_reference(&mut self, r: &Reference) -> Domain {
        let record = match r {
            Reference::LocalVariable(f, v) => {
                Record::LocalVariable(self.symbols.intern(f), self.symbols.intern(v))
            }
            Reference::ObjectMember(base, field) => {
                Record::ObjectMember(self.symbols.intern(base), self.symbols.intern(field))
            }
        };
        self.records.pack(record)
    }

    pub fn pack_value(&mut self, v: &Value) -> Domain {
        let record = match v {
            Value::Empty => Record::Empty,
            Value::HeapObject(t) => Record::HeapObject(self.symbols.intern(t)),
            Value::Ref(r) => Record::Ref(self.pack_reference(r)),
        };
        self.records.pack(record)
    }

    pub fn symbol(&self, id: Domain) -> Option<String> {
        self.symbols.resolve(id).map(str::to_owned)
    }

    pub fn reference(&self, id: Domain) -> Option<Reference> {
        match self.records.unpack(id)? {
            Record::LocalVariable(f, v) => {
                Some(Reference::LocalVariable(self.symbol(f)?, self.symbol(v)?))
            }
            Record::ObjectMember(base, field) => {
                Some(Reference::ObjectMember(self.symbol(base)?, self.symbol(field)?))
            }
            _ => None,
        }
    }

    pub fn value(&self, id: Domain) -> Option<Value> {
        match self.records.unpack(id)? {
            Record::Empty => Some(Value::Empty),
            Record::HeapObject(t) => Some(Value::HeapObject(self.symbol(t)?)),
            Record::Ref(r) => Some(Value::Ref(self.reference(r)?)),
            _ => None,
        }
    }

    pub fn location(&self, id: Domain) -> Option<(String, Statement)> {
        let (f, s) = self.records.unpack_location(id)?;
        Some((self.symbol(f)?, s))
    }
}
