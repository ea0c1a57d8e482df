// Analysis tests: hand-checked scenarios and an independent Datalog oracle.

use std::path::Path;

use super::*;
use crate::front_end::{load_dir, Value};

mod scenarios;

const PRIMITIVE: &str = "mylib.MaybeCollect";

fn config(pipeline: Pipeline) -> AnalysisConfig {
    AnalysisConfig {
        pipeline,
        ..AnalysisConfig::default()
    }
}

fn analyze(facts: Facts, config: &AnalysisConfig) -> Analysis {
    run(&facts.validate().unwrap(), config).unwrap()
}

fn analyze_dir(dir: &str, config: &AnalysisConfig) -> Analysis {
    let facts = load_dir(Path::new(dir), config.pipeline).unwrap();
    run(&facts, config).unwrap()
}

fn local(f: &str, x: &str) -> Reference {
    Reference::local(f, x)
}

fn loc(f: &str, s: Statement) -> Loc {
    (f.to_owned(), s)
}

fn roots(pairs: &[(&str, Reference)]) -> Set<(String, Reference)> {
    pairs
        .iter()
        .map(|(f, r)| (f.to_string(), r.clone()))
        .collect()
}

// Every decoded row of every relation the run produced.
fn all_rows(analysis: &Analysis) -> Map<&'static str, Vec<Vec<String>>> {
    analysis
        .schemas()
        .iter()
        .map(|s| (s.name, analysis.rows(s)))
        .collect()
}

// f calls g, g calls the collect primitive; x is declared at f's entry and
// used after the call.
fn worked_facts() -> Facts {
    let mut facts = Facts::new();
    facts
        .call("f", 0, "g")
        .call("g", 0, PRIMITIVE)
        .cf_edge("f", 0, 1)
        .assign("f", 0, local("f", "x"), Value::Empty)
        .use_("f", 1, local("f", "x"));
    facts
}

// A deterministic pseudo-random program: a handful of functions with
// fall-through and jump edges, calls between them and to the collect
// primitive, declarations, definitions, copies, member writes, argument
// bindings (some without their call) and uses.
fn generated_facts(seed: u64) -> Facts {
    let mut state = seed;
    let mut next = move |bound: u32| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) % u64::from(bound)) as u32
    };

    let functions: Vec<String> = (0..6).map(|i| format!("f{i}")).collect();
    let vars = ["a", "b", "c", "d"];
    let mut facts = Facts::new();

    for f in &functions {
        let len = 4 + next(5);
        for v in vars {
            if next(2) == 0 {
                facts.assign(f, 0, local(f, v), Value::Empty);
            }
        }
        if next(2) == 0 {
            facts.use_(f, 1, local(f, "p"));
        }

        for s in 0..len {
            facts.cf_edge(f, s, s + 1);
            if next(4) == 0 {
                let target = next(len + 1);
                facts.cf_edge(f, s, target);
            }

            let v = vars[next(4) as usize];
            match next(9) {
                0 => {
                    let g = &functions[next(6) as usize];
                    facts.call(f, s, g);
                    if next(2) == 0 {
                        facts.bind(f, s, local(f, v), g, "p");
                    }
                }
                1 => {
                    facts.call(f, s, PRIMITIVE).collect(f, s);
                }
                2 => {
                    facts
                        .assign(f, s, local(f, v), Value::HeapObject("T".to_owned()))
                        .def(f, s, local(f, v));
                }
                3 | 4 => {
                    facts.use_(f, s, local(f, v));
                }
                5 => {
                    let dst = local(f, vars[next(4) as usize]);
                    facts
                        .assign(f, s, dst.clone(), Value::Ref(local(f, v)))
                        .def(f, s, dst);
                }
                6 => {
                    facts.assign(f, s, Reference::member("obj", "m"), Value::Ref(local(f, v)));
                }
                7 => {
                    // a binding whose call fact is missing
                    let g = &functions[next(6) as usize];
                    facts.bind(f, s, local(f, v), g, "p");
                }
                _ => {}
            }
        }
    }

    facts
}
