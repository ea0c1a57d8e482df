//! Flow of references between locations.
//!
//! `alias(A, ra, B, rb)` records that a value observed through `ra` at
//! location `A` can also be observed through `rb` at `B`.  It is seeded by
//! copies, member writes and argument bindings whose definition reaches the
//! copying statement, and closed transitively.  Copies and member writes are
//! also recorded in the other direction so lookups work from either end.

use super::Relations;
use crate::middle_end::fixpoint::Rule;
use crate::middle_end::universe::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Variable,
    Member,
}

impl Target {
    fn matches(self, record: Option<Record>) -> bool {
        matches!(
            (self, record),
            (Target::Variable, Some(Record::LocalVariable(..)))
                | (Target::Member, Some(Record::ObjectMember(..)))
        )
    }
}

pub fn rules(rel: &Relations) -> Vec<Rule> {
    let alias = rel.alias;

    vec![
        copy(
            "alias(L(f, d), src, L(f, s), dst) :- assign(f, s, dst: $LocalVariable, $Ref(src)), def(f, d, src), reachable(L(f, d), L(f, s)).",
            rel,
            Target::Variable,
            false,
        ),
        copy(
            "alias(L(f, s), dst, L(f, d), src) :- assign(f, s, dst: $LocalVariable, $Ref(src)), def(f, d, src), reachable(L(f, d), L(f, s)).",
            rel,
            Target::Variable,
            true,
        ),
        copy(
            "alias(L(f, d), src, L(f, s), dst) :- assign(f, s, dst: $ObjectMember, $Ref(src)), def(f, d, src), reachable(L(f, d), L(f, s)).",
            rel,
            Target::Member,
            false,
        ),
        copy(
            "alias(L(f, s), dst, L(f, d), src) :- assign(f, s, dst: $ObjectMember, $Ref(src)), def(f, d, src), reachable(L(f, d), L(f, s)).",
            rel,
            Target::Member,
            true,
        ),
        binding(rel),
        Rule::new(
            "alias(a, ra, c, rc) :- alias(a, ra, b, rb), alias(b, rb, c, rc), (a, ra) != (c, rc).",
            alias,
        )
        .body([alias, alias])
        .eval(|ctx, out| {
            if ctx.is_delta(1) {
                for r in ctx.atom(1).iter() {
                    for l in ctx.atom(0).lookup(1, &[r[0], r[1]]) {
                        if (l[0], l[1]) != (r[2], r[3]) {
                            out.emit([l[0], l[1], r[2], r[3]]);
                        }
                    }
                }
            } else {
                for l in ctx.atom(0).iter() {
                    for r in ctx.atom(1).lookup(0, &[l[2], l[3]]) {
                        if (l[0], l[1]) != (r[2], r[3]) {
                            out.emit([l[0], l[1], r[2], r[3]]);
                        }
                    }
                }
            }
        }),
    ]
}

// A copy `dst = src` at (f, s) of a reference defined at (f, d).
fn copy(text: &str, rel: &Relations, target: Target, mirror: bool) -> Rule {
    let Relations {
        assign,
        def,
        reachable,
        alias,
        ..
    } = *rel;

    Rule::new(text, alias)
        .body([assign, def, reachable])
        .eval(move |ctx, out| {
            let records = ctx.records();
            for a in ctx.atom(0).iter() {
                let (f, s, dst) = (a[0], a[1], a[2]);
                let Some(Record::Ref(src)) = records.unpack(a[3]) else {
                    continue;
                };
                if !target.matches(records.unpack(dst)) {
                    continue;
                }
                let Some(at) = records.find_location(f, s) else {
                    continue;
                };

                for d in ctx.atom(1).lookup(1, &[f, src]) {
                    let Some(defined) = records.find_location(f, d[1]) else {
                        continue;
                    };
                    if !ctx.atom(2).contains(&[defined, at]) {
                        continue;
                    }
                    if mirror {
                        out.emit([at, dst, defined, src]);
                    } else {
                        out.emit([defined, src, at, dst]);
                    }
                }
            }
        })
}

// An argument `r` of the call at (f, s) bound to parameter `p` of `g`.  The
// call edge itself must exist; a `bind` fact alone links nothing.
fn binding(rel: &Relations) -> Rule {
    let Relations {
        call,
        bind,
        def,
        reachable,
        alias,
        ..
    } = *rel;

    Rule::new(
        "alias(L(f, d), r, L(g, 0), $LocalVariable(g, p)) :- bind(f, s, r, g, p), call(f, s, g), def(f, d, r), reachable(L(f, d), L(f, s)).",
        alias,
    )
    .body([bind, call, def, reachable])
    .eval(move |ctx, out| {
        let records = ctx.records();
        for b in ctx.atom(0).iter() {
            let (f, s, r, g, p) = (b[0], b[1], b[2], b[3], b[4]);
            if !ctx.atom(1).contains(&[f, s, g]) {
                continue;
            }
            let Some(site) = records.find_location(f, s) else {
                continue;
            };

            for d in ctx.atom(2).lookup(1, &[f, r]) {
                let Some(defined) = records.find_location(f, d[1]) else {
                    continue;
                };
                if ctx.atom(3).contains(&[defined, site]) {
                    let param = records.pack(Record::LocalVariable(g, p));
                    out.emit([defined, r, records.location(g, 0), param]);
                }
            }
        }
    })
}
