//! Call sites after which a collection may already have happened.
//!
//! A call site might collect if it calls the collect primitive, or calls a
//! function that has a call site that might collect.  The approximation is
//! per function: where inside the callee the collection happens is not
//! tracked.

use super::{Constants, Relations};
use crate::middle_end::fixpoint::Rule;

pub fn rules(rel: &Relations, consts: &Constants) -> Vec<Rule> {
    let Relations {
        call,
        might_collect,
        ..
    } = *rel;
    let primitive = consts.collect_primitive;

    vec![
        Rule::new(
            "might_collect(f, s) :- call(f, s, <collect primitive>).",
            might_collect,
        )
        .body([call])
        .eval(move |ctx, out| {
            let Some(primitive) = primitive else {
                return;
            };
            for c in ctx.atom(0).lookup(1, &[primitive]) {
                out.emit([c[0], c[1]]);
            }
        }),
        Rule::new(
            "might_collect(f, s) :- call(f, s, g), might_collect(g, _).",
            might_collect,
        )
        .body([call, might_collect])
        .eval(|ctx, out| {
            let mut last = None;
            for m in ctx.atom(1).iter() {
                // rows of one callee are adjacent
                if last == Some(m[0]) {
                    continue;
                }
                last = Some(m[0]);
                for c in ctx.atom(0).lookup(1, &[m[0]]) {
                    out.emit([c[0], c[1]]);
                }
            }
        }),
    ]
}
