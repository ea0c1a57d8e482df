//! The raw program-structure facts the analysis starts from.
//!
//! Everything is kept as owned strings here; interning happens when the facts
//! are loaded into the relation store.

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::commons::{Error, Result, Valid};

/// Function-local statement number.  Statement 0 is the function entry.
pub type Statement = u32;

#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Reference {
    // (function, variable name)
    #[display(fmt = "$LocalVariable({}, {})", _0, _1)]
    LocalVariable(String, String),
    // (base, field name)
    #[display(fmt = "$ObjectMember({}, {})", _0, _1)]
    ObjectMember(String, String),
}

impl Reference {
    pub fn local(func: &str, name: &str) -> Self {
        Reference::LocalVariable(func.to_owned(), name.to_owned())
    }

    pub fn member(base: &str, field: &str) -> Self {
        Reference::ObjectMember(base.to_owned(), field.to_owned())
    }

    fn symbols(&self) -> [&str; 2] {
        match self {
            Reference::LocalVariable(a, b) | Reference::ObjectMember(a, b) => [a.as_str(), b.as_str()],
        }
    }
}

#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    #[display(fmt = "$Empty")]
    Empty,
    // allocation of the given type
    #[display(fmt = "$HeapObject({})", _0)]
    HeapObject(String),
    #[display(fmt = "$Ref({})", _0)]
    Ref(Reference),
}

/// One in-memory fact set, one field per input relation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facts {
    pub call: Set<(String, Statement, String)>,
    pub assign: Set<(String, Statement, Reference, Value)>,
    pub uses: Set<(String, Statement, Reference)>,
    pub cf_edge: Set<(String, Statement, Statement)>,
    // (caller, call site, argument, callee, parameter name)
    pub bind: Set<(String, Statement, Reference, String, String)>,
    pub collect: Set<(String, Statement)>,
    pub defs: Set<(String, Statement, Reference)>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call(&mut self, caller: &str, s: Statement, callee: &str) -> &mut Self {
        self.call.insert((caller.to_owned(), s, callee.to_owned()));
        self
    }

    pub fn assign(&mut self, f: &str, s: Statement, r: Reference, v: Value) -> &mut Self {
        self.assign.insert((f.to_owned(), s, r, v));
        self
    }

    pub fn use_(&mut self, f: &str, s: Statement, r: Reference) -> &mut Self {
        self.uses.insert((f.to_owned(), s, r));
        self
    }

    pub fn cf_edge(&mut self, f: &str, s1: Statement, s2: Statement) -> &mut Self {
        self.cf_edge.insert((f.to_owned(), s1, s2));
        self
    }

    pub fn bind(
        &mut self,
        f: &str,
        s: Statement,
        arg: Reference,
        callee: &str,
        param: &str,
    ) -> &mut Self {
        self.bind
            .insert((f.to_owned(), s, arg, callee.to_owned(), param.to_owned()));
        self
    }

    pub fn collect(&mut self, f: &str, s: Statement) -> &mut Self {
        self.collect.insert((f.to_owned(), s));
        self
    }

    pub fn def(&mut self, f: &str, s: Statement, r: Reference) -> &mut Self {
        self.defs.insert((f.to_owned(), s, r));
        self
    }

    // add a straight-line chain of control flow edges s -> s + 1 for s in range.
    pub fn straight_line(&mut self, f: &str, statements: std::ops::Range<Statement>) -> &mut Self {
        for s in statements {
            self.cf_edge(f, s, s + 1);
        }
        self
    }

    /// Tuple count of each input relation, by relation name.
    pub fn sizes(&self) -> Map<&'static str, usize> {
        Map::from([
            ("call", self.call.len()),
            ("assign", self.assign.len()),
            ("use", self.uses.len()),
            ("cf_edge", self.cf_edge.len()),
            ("bind", self.bind.len()),
            ("collect", self.collect.len()),
            ("def", self.defs.len()),
        ])
    }

    // functions that have at least one fact of their own.
    pub fn defined_functions(&self) -> Set<&str> {
        let mut fs: Set<&str> = Set::new();
        fs.extend(self.call.iter().map(|(f, ..)| f.as_str()));
        fs.extend(self.assign.iter().map(|(f, ..)| f.as_str()));
        fs.extend(self.uses.iter().map(|(f, ..)| f.as_str()));
        fs.extend(self.cf_edge.iter().map(|(f, ..)| f.as_str()));
        fs.extend(self.bind.iter().map(|(f, ..)| f.as_str()));
        fs.extend(self.collect.iter().map(|(f, _)| f.as_str()));
        fs.extend(self.defs.iter().map(|(f, ..)| f.as_str()));
        fs
    }

    /// Check the facts and wrap them.  Names must be non-empty; nothing else
    /// about the program is assumed.
    pub fn validate(self) -> Result<Valid<Facts>> {
        fn check(relation: &str, names: &[&str]) -> Result<()> {
            if names.iter().any(|n| n.is_empty()) {
                return Err(Error::InvalidFacts {
                    relation: relation.to_owned(),
                    message: "empty symbol".to_owned(),
                });
            }
            Ok(())
        }

        fn value_symbols(v: &Value) -> Vec<&str> {
            match v {
                Value::Empty => vec![],
                Value::HeapObject(t) => vec![t.as_str()],
                Value::Ref(r) => r.symbols().to_vec(),
            }
        }

        for (f, _, g) in &self.call {
            check("call", &[f.as_str(), g.as_str()])?;
        }
        for (f, _, r, v) in &self.assign {
            let mut names = vec![f.as_str()];
            names.extend(r.symbols());
            names.extend(value_symbols(v));
            check("assign", &names)?;
        }
        for (f, _, r) in &self.uses {
            let [a, b] = r.symbols();
            check("use", &[f.as_str(), a, b])?;
        }
        for (f, ..) in &self.cf_edge {
            check("cf_edge", &[f.as_str()])?;
        }
        for (f, _, r, g, p) in &self.bind {
            let [a, b] = r.symbols();
            check("bind", &[f.as_str(), a, b, g.as_str(), p.as_str()])?;
        }
        for (f, _) in &self.collect {
            check("collect", &[f.as_str()])?;
        }
        for (f, _, r) in &self.defs {
            let [a, b] = r.symbols();
            check("def", &[f.as_str(), a, b])?;
        }

        Ok(Valid(self))
    }
}
