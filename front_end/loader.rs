//! Reading a fact directory (`<relation>.facts` per input relation).

use std::path::Path;

use tracing::{debug, info};

use super::facts::Facts;
use super::parser::{parse_relation, Cell};
use super::schema::{Schema, INPUTS};
use crate::commons::{Error, Result, Valid};
use crate::config::Pipeline;

/// Load every input relation the pipeline needs from `dir`.  Files for
/// relations the pipeline does not need are read when present and ignored
/// when absent.
pub fn load_dir(dir: &Path, pipeline: Pipeline) -> Result<Valid<Facts>> {
    let required = pipeline.required_inputs();
    let mut facts = Facts::new();

    for schema in INPUTS {
        let path = dir.join(schema.file_name());
        if !path.exists() {
            if required.contains(&schema.name) {
                return Err(Error::MissingFacts {
                    relation: schema.name.to_owned(),
                    path,
                });
            }
            debug!(relation = schema.name, "no fact file, treating as empty");
            continue;
        }

        let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let rows = parse_relation(&schema, &text)?;
        info!(relation = schema.name, tuples = rows.len(), "loaded facts");

        for row in rows {
            insert_row(&mut facts, &schema, row)?;
        }
    }

    facts.validate()
}

// add one parsed row to the matching field of `facts`.
pub fn insert_row(facts: &mut Facts, schema: &Schema, row: Vec<Cell>) -> Result<()> {
    use Cell::*;

    match (schema.name, row.as_slice()) {
        ("call", [Symbol(f), Statement(s), Symbol(g)]) => {
            facts.call(f, *s, g);
        }
        ("assign", [Symbol(f), Statement(s), Reference(r), Value(v)]) => {
            facts.assign(f, *s, r.clone(), v.clone());
        }
        ("use", [Symbol(f), Statement(s), Reference(r)]) => {
            facts.use_(f, *s, r.clone());
        }
        ("cf_edge", [Symbol(f), Statement(s1), Statement(s2)]) => {
            facts.cf_edge(f, *s1, *s2);
        }
        ("bind", [Symbol(f), Statement(s), Reference(r), Symbol(g), Symbol(p)]) => {
            facts.bind(f, *s, r.clone(), g, p);
        }
        ("collect", [Symbol(f), Statement(s)]) => {
            facts.collect(f, *s);
        }
        ("def", [Symbol(f), Statement(s), Reference(r)]) => {
            facts.def(f, *s, r.clone());
        }
        _ => {
            return Err(Error::InvalidFacts {
                relation: schema.name.to_owned(),
                message: format!("row does not fit the relation: {row:?}"),
            })
        }
    }

    Ok(())
}
