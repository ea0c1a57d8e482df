//! Column layouts of the relations that cross the crate boundary.

use derive_more::Display;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ColumnType {
    Symbol,
    Statement,
    Reference,
    Value,
    // packed (function, statement) pair
    Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub columns: &'static [ColumnType],
}

impl Schema {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn file_name(&self) -> String {
        format!("{}.facts", self.name)
    }
}

use ColumnType::*;

pub const CALL: Schema = Schema {
    name: "call",
    columns: &[Symbol, Statement, Symbol],
};
pub const ASSIGN: Schema = Schema {
    name: "assign",
    columns: &[Symbol, Statement, Reference, Value],
};
pub const USE: Schema = Schema {
    name: "use",
    columns: &[Symbol, Statement, Reference],
};
pub const CF_EDGE: Schema = Schema {
    name: "cf_edge",
    columns: &[Symbol, Statement, Statement],
};
pub const BIND: Schema = Schema {
    name: "bind",
    columns: &[Symbol, Statement, Reference, Symbol, Symbol],
};
pub const COLLECT: Schema = Schema {
    name: "collect",
    columns: &[Symbol, Statement],
};
pub const DEF: Schema = Schema {
    name: "def",
    columns: &[Symbol, Statement, Reference],
};

pub const INPUTS: [Schema; 7] = [CALL, ASSIGN, USE, CF_EDGE, BIND, COLLECT, DEF];

pub const MIGHT_COLLECT: Schema = Schema {
    name: "might_collect",
    columns: &[Symbol, Statement],
};
pub const LIVE_VARS_IN: Schema = Schema {
    name: "live_vars_in",
    columns: &[Symbol, Statement, Reference],
};
pub const LIVE_VARS_OUT: Schema = Schema {
    name: "live_vars_out",
    columns: &[Symbol, Statement, Reference],
};
pub const STACK_ROOT_VARS: Schema = Schema {
    name: "stack_root_vars",
    columns: &[Symbol, Reference],
};
pub const ALIAS: Schema = Schema {
    name: "alias",
    columns: &[Location, Reference, Location, Reference],
};
pub const ALIAS_USED: Schema = Schema {
    name: "aliasUsed",
    columns: &[Symbol, Reference],
};
pub const ROOT_VARS: Schema = Schema {
    name: "root_vars",
    columns: &[Symbol, Reference],
};

// intermediates, only written when retained for inspection.
pub const LOCATION: Schema = Schema {
    name: "location",
    columns: &[Location],
};
pub const GRAPH_EDGE: Schema = Schema {
    name: "graph_edge",
    columns: &[Symbol, Statement, Symbol, Statement],
};
pub const REACHABLE: Schema = Schema {
    name: "reachable",
    columns: &[Location, Location],
};

pub const OUTPUTS: [Schema; 7] = [
    MIGHT_COLLECT,
    LIVE_VARS_IN,
    LIVE_VARS_OUT,
    STACK_ROOT_VARS,
    ALIAS,
    ALIAS_USED,
    ROOT_VARS,
];

pub const INTERMEDIATES: [Schema; 3] = [LOCATION, GRAPH_EDGE, REACHABLE];

pub fn input(name: &str) -> Option<Schema> {
    INPUTS.iter().copied().find(|s| s.name == name)
}
