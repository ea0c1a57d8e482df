// Parser for fact files.
//
// A fact file holds one tuple per line with tab separated columns.  Symbol and
// statement columns are plain text; reference and value columns use the
// `$Constructor(arg, ...)` record syntax, which is what the pest grammar
// below handles.

use pest::iterators::Pair;
use pest::Parser;

use super::facts::{Reference, Statement, Value};
use super::schema::{ColumnType, Schema};
use crate::commons::{Error, Result};

#[derive(pest_derive::Parser)]
#[grammar_inline = r#"
WHITESPACE = _{ " " }

term = { SOI ~ record ~ EOI }

record = { "$" ~ ident ~ ("(" ~ (arg ~ ("," ~ arg)*)? ~ ")")? }
arg = _{ record | quoted | bare }

ident = @{ ASCII_ALPHA ~ (ASCII_ALPHANUMERIC | "_")* }
quoted = ${ "\"" ~ chars ~ "\"" }
chars = @{ ("\\" ~ ANY | !"\"" ~ ANY)* }
bare = @{ (!("," | "(" | ")" | "\"" | " " | "\t") ~ ANY)+ }
"#]
struct RecordParser;

// A parsed record before it is checked against the expected column type.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Term {
    Record(String, Vec<Term>),
    Symbol(String),
}

// One parsed column of a fact line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Symbol(String),
    Statement(Statement),
    Reference(Reference),
    Value(Value),
}

// SECTION: interface

/// Parse the contents of one fact file.  Empty lines are skipped; any other
/// problem is reported with the relation name and 1-based line number.
pub fn parse_relation(schema: &Schema, text: &str) -> Result<Vec<Vec<Cell>>> {
    let mut rows = vec![];

    for (i, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }

        let row = parse_line(schema, line).map_err(|message| Error::MalformedFact {
            relation: schema.name.to_owned(),
            line: i + 1,
            message,
        })?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn parse_line(schema: &Schema, line: &str) -> std::result::Result<Vec<Cell>, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != schema.arity() {
        return Err(format!(
            "expected {} columns, found {}",
            schema.arity(),
            fields.len()
        ));
    }

    schema
        .columns
        .iter()
        .zip(fields)
        .map(|(typ, field)| parse_cell(*typ, field))
        .collect()
}

pub fn parse_reference(field: &str) -> std::result::Result<Reference, String> {
    reference_of(&parse_term(field)?)
}

pub fn parse_value(field: &str) -> std::result::Result<Value, String> {
    value_of(&parse_term(field)?)
}

// SECTION: parser functionality

fn parse_cell(typ: ColumnType, field: &str) -> std::result::Result<Cell, String> {
    match typ {
        ColumnType::Symbol if field.is_empty() => Err("empty symbol".to_owned()),
        ColumnType::Symbol => Ok(Cell::Symbol(field.to_owned())),
        ColumnType::Statement => field
            .trim()
            .parse::<Statement>()
            .map(Cell::Statement)
            .map_err(|e| format!("bad statement `{field}`: {e}")),
        ColumnType::Reference => parse_reference(field).map(Cell::Reference),
        ColumnType::Value => parse_value(field).map(Cell::Value),
        ColumnType::Location => {
            Err("location columns are never read from fact files".to_owned())
        }
    }
}

fn parse_term(field: &str) -> std::result::Result<Term, String> {
    let mut parse_tree = RecordParser::parse(Rule::term, field.trim()).map_err(|e| e.to_string())?;
    let record = parse_tree
        .next()
        .and_then(|term| term.into_inner().next())
        .ok_or_else(|| format!("no record in `{field}`"))?;
    Ok(create_term(record))
}

fn create_term(pair: Pair<Rule>) -> Term {
    match pair.as_rule() {
        Rule::record => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| p.as_str().to_owned()).unwrap_or_default();
            Term::Record(name, inner.map(create_term).collect())
        }
        Rule::quoted => Term::Symbol(unescape(
            pair.into_inner().next().map(|p| p.as_str()).unwrap_or(""),
        )),
        Rule::bare => Term::Symbol(pair.as_str().to_owned()),
        _ => unreachable!("not a record argument: {:#?}", pair),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn symbol_of(term: &Term) -> std::result::Result<String, String> {
    match term {
        Term::Symbol(s) if !s.is_empty() => Ok(s.clone()),
        Term::Symbol(_) => Err("empty symbol".to_owned()),
        Term::Record(name, _) => Err(format!("expected a symbol, found `${name}`")),
    }
}

fn two_symbols(name: &str, args: &[Term]) -> std::result::Result<(String, String), String> {
    match args {
        [a, b] => Ok((symbol_of(a)?, symbol_of(b)?)),
        _ => Err(format!("`${name}` takes 2 arguments, found {}", args.len())),
    }
}

fn reference_of(term: &Term) -> std::result::Result<Reference, String> {
    match term {
        Term::Record(name, args) if name == "LocalVariable" => {
            let (f, v) = two_symbols(name, args)?;
            Ok(Reference::LocalVariable(f, v))
        }
        Term::Record(name, args) if name == "ObjectMember" => {
            let (base, field) = two_symbols(name, args)?;
            Ok(Reference::ObjectMember(base, field))
        }
        Term::Record(name, _) => Err(format!("`${name}` is not a Reference")),
        Term::Symbol(s) => Err(format!("expected a Reference, found `{s}`")),
    }
}

fn value_of(term: &Term) -> std::result::Result<Value, String> {
    match term {
        Term::Record(name, args) if name == "Empty" => {
            if args.is_empty() {
                Ok(Value::Empty)
            } else {
                Err("`$Empty` takes no arguments".to_owned())
            }
        }
        Term::Record(name, args) if name == "HeapObject" => match args.as_slice() {
            [typ] => Ok(Value::HeapObject(symbol_of(typ)?)),
            _ => Err(format!("`$HeapObject` takes 1 argument, found {}", args.len())),
        },
        Term::Record(name, args) if name == "Ref" => match args.as_slice() {
            [r] => Ok(Value::Ref(reference_of(r)?)),
            _ => Err(format!("`$Ref` takes 1 argument, found {}", args.len())),
        },
        Term::Record(name, _) => Err(format!("`${name}` is not a Value")),
        Term::Symbol(s) => Err(format!("expected a Value, found `{s}`")),
    }
}
