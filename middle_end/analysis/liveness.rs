//! Backward liveness of references inside each function.
//!
//! A reference is live on entry to a statement if the statement uses it, or
//! if it is live on exit and the statement does not assign it.  It is live on
//! exit if it is live on entry to some control flow successor.  Both
//! relations form one recursive stratum; `assign` is a base relation, so the
//! negation reads a complete table.

use super::Relations;
use crate::middle_end::fixpoint::Rule;

pub fn rules(rel: &Relations) -> Vec<Rule> {
    let Relations {
        assign,
        uses,
        cf_edge,
        live_in,
        live_out,
        ..
    } = *rel;

    vec![
        Rule::new("live_vars_in(f, s, r) :- use(f, s, r).", live_in)
            .body([uses])
            .eval(|ctx, out| {
                for u in ctx.atom(0).iter() {
                    out.emit([u[0], u[1], u[2]]);
                }
            }),
        Rule::new(
            "live_vars_in(f, s, r) :- live_vars_out(f, s, r), !assign(f, s, r, _).",
            live_in,
        )
        .body([live_out])
        .negates([assign])
        .eval(move |ctx, out| {
            let assign = ctx.total(assign);
            for l in ctx.atom(0).iter() {
                if !assign.exists(0, &[l[0], l[1], l[2]]) {
                    out.emit([l[0], l[1], l[2]]);
                }
            }
        }),
        Rule::new(
            "live_vars_out(f, s1, r) :- cf_edge(f, s1, s2), live_vars_in(f, s2, r).",
            live_out,
        )
        .body([cf_edge, live_in])
        .eval(|ctx, out| {
            for l in ctx.atom(1).iter() {
                for e in ctx.atom(0).lookup(1, &[l[0], l[1]]) {
                    out.emit([l[0], e[1], l[2]]);
                }
            }
        }),
    ]
}
