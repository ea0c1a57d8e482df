//! The whole-program graph and its reachability closure.
//!
//! `graph_edge(f, s, g, t)` has one edge per control flow edge (`g = f`) and
//! one edge from every call site to statement 0 of the callee, the only
//! entry point of a function.  `reachable` holds packed locations and is the
//! reflexive-transitive closure of the graph: paths grow by one edge inside a
//! function, and are spliced through call edges into the callee's entry.

use super::Relations;
use crate::middle_end::fixpoint::{RelId, Rule};

pub fn rules(rel: &Relations) -> Vec<Rule> {
    let Relations {
        call,
        assign,
        uses,
        cf_edge,
        bind,
        collect,
        def,
        location,
        graph_edge,
        reachable,
        ..
    } = *rel;

    vec![
        // SECTION: locations
        mentioned("location(L(f, s)) :- call(f, s, _).", location, call, 1),
        mentioned("location(L(f, s)) :- assign(f, s, _, _).", location, assign, 1),
        mentioned("location(L(f, s)) :- use(f, s, _).", location, uses, 1),
        mentioned("location(L(f, s)) :- cf_edge(f, s, _).", location, cf_edge, 1),
        mentioned("location(L(f, t)) :- cf_edge(f, _, t).", location, cf_edge, 2),
        mentioned("location(L(f, s)) :- bind(f, s, _, _, _).", location, bind, 1),
        mentioned("location(L(f, s)) :- collect(f, s).", location, collect, 1),
        mentioned("location(L(f, s)) :- def(f, s, _).", location, def, 1),
        entry("location(L(g, 0)) :- call(_, _, g).", location, call, 2),
        entry("location(L(g, 0)) :- bind(_, _, _, g, _).", location, bind, 3),
        // SECTION: edges
        Rule::new("graph_edge(f, s, f, t) :- cf_edge(f, s, t).", graph_edge)
            .body([cf_edge])
            .eval(|ctx, out| {
                for e in ctx.atom(0).iter() {
                    out.emit([e[0], e[1], e[0], e[2]]);
                }
            }),
        Rule::new("graph_edge(f, s, g, 0) :- call(f, s, g).", graph_edge)
            .body([call])
            .eval(|ctx, out| {
                for c in ctx.atom(0).iter() {
                    out.emit([c[0], c[1], c[2], 0]);
                }
            }),
        // SECTION: reachability
        Rule::new("reachable(l, l) :- location(l).", reachable)
            .body([location])
            .eval(|ctx, out| {
                for l in ctx.atom(0).iter() {
                    out.emit([l[0], l[0]]);
                }
            }),
        Rule::new(
            "reachable(L(f, s), L(f, t)) :- graph_edge(f, s, f, t).",
            reachable,
        )
        .body([graph_edge])
        .eval(|ctx, out| {
            let records = ctx.records();
            for e in ctx.atom(0).iter().filter(|e| e[0] == e[2]) {
                out.emit([records.location(e[0], e[1]), records.location(e[0], e[3])]);
            }
        }),
        Rule::new(
            "reachable(a, L(f, u)) :- reachable(a, L(f, t)), graph_edge(f, t, f, u).",
            reachable,
        )
        .body([reachable, graph_edge])
        .eval(|ctx, out| {
            let records = ctx.records();
            for p in ctx.atom(0).iter() {
                let Some((f, t)) = records.unpack_location(p[1]) else {
                    continue;
                };
                for e in ctx.atom(1).lookup(0, &[f, t]).filter(|e| e[2] == f) {
                    out.emit([p[0], records.location(f, e[3])]);
                }
            }
        }),
        Rule::new(
            "reachable(a, c) :- reachable(a, L(f, s)), graph_edge(f, s, g, 0), reachable(L(g, 0), c).",
            reachable,
        )
        .body([reachable, graph_edge, reachable])
        .eval(|ctx, out| {
            let records = ctx.records();
            if ctx.is_delta(2) {
                for q in ctx.atom(2).iter() {
                    let Some((g, 0)) = records.unpack_location(q[0]) else {
                        continue;
                    };
                    for e in ctx.atom(1).lookup(1, &[g, 0]) {
                        let Some(site) = records.find_location(e[0], e[1]) else {
                            continue;
                        };
                        for p in ctx.atom(0).lookup(1, &[site]) {
                            out.emit([p[0], q[1]]);
                        }
                    }
                }
            } else {
                for p in ctx.atom(0).iter() {
                    let Some((f, s)) = records.unpack_location(p[1]) else {
                        continue;
                    };
                    for e in ctx.atom(1).lookup(0, &[f, s]).filter(|e| e[3] == 0) {
                        let Some(entry) = records.find_location(e[2], 0) else {
                            continue;
                        };
                        for q in ctx.atom(2).lookup(0, &[entry]) {
                            out.emit([p[0], q[1]]);
                        }
                    }
                }
            }
        }),
    ]
}

// location(L(f, s)) with `f` in column 0 and `s` in column `s` of `input`.
fn mentioned(text: &str, location: RelId, input: RelId, s: usize) -> Rule {
    Rule::new(text, location)
        .body([input])
        .eval(move |ctx, out| {
            for t in ctx.atom(0).iter() {
                out.emit([ctx.records().location(t[0], t[s])]);
            }
        })
}

// location(L(g, 0)) for the callee in column `g` of `input`.
fn entry(text: &str, location: RelId, input: RelId, g: usize) -> Rule {
    Rule::new(text, location)
        .body([input])
        .eval(move |ctx, out| {
            for t in ctx.atom(0).iter() {
                out.emit([ctx.records().location(t[g], 0)]);
            }
        })
}
