//! The final root sets.
//!
//! `stack_root_vars` is the union of three rules: references live across a
//! call that might collect, every local declared empty at entry of a function
//! that might collect, and every field written through `self` inside a
//! constructor-like function.  `aliasUsed` and `root_vars` use the program
//! graph and the alias relation to require an actual later use.

use std::collections::BTreeSet as Set;

use super::{Constants, Relations};
use crate::middle_end::fixpoint::{Rule, RuleContext};
use crate::middle_end::relation::Relation;
use crate::middle_end::universe::{Domain, Record, RecordTable};

pub fn stack_rules(rel: &Relations, consts: &Constants) -> Vec<Rule> {
    let Relations {
        assign,
        might_collect,
        live_out,
        stack_root_vars,
        ..
    } = *rel;
    let empty = consts.empty;
    let self_name = consts.self_name;
    let constructors = consts.constructors.clone();

    vec![
        Rule::new(
            "stack_root_vars(f, r) :- might_collect(f, s), live_vars_out(f, s, r).",
            stack_root_vars,
        )
        .body([might_collect, live_out])
        .eval(|ctx, out| {
            for m in ctx.atom(0).iter() {
                for l in ctx.atom(1).lookup(0, &[m[0], m[1]]) {
                    out.emit([m[0], l[2]]);
                }
            }
        }),
        Rule::new(
            "stack_root_vars(f, $LocalVariable(f, v)) :- might_collect(f, _), assign(f, 0, $LocalVariable(f, v), $Empty).",
            stack_root_vars,
        )
        .body([might_collect, assign])
        .eval(move |ctx, out| {
            let Some(empty) = empty else {
                return;
            };
            let records = ctx.records();
            let functions: Set<Domain> = ctx.atom(0).iter().map(|m| m[0]).collect();

            for f in functions {
                for a in ctx.atom(1).lookup(0, &[f, 0]) {
                    let local = matches!(records.unpack(a[2]), Some(Record::LocalVariable(g, _)) if g == f);
                    if local && a[3] == empty {
                        out.emit([f, a[2]]);
                    }
                }
            }
        }),
        Rule::new(
            "stack_root_vars(f, $ObjectMember(self, m)) :- constructor(f), assign(f, _, $ObjectMember(self, m), _).",
            stack_root_vars,
        )
        .body([assign])
        .eval(move |ctx, out| {
            let Some(self_name) = self_name else {
                return;
            };
            let records = ctx.records();

            for &f in &constructors {
                for a in ctx.atom(0).lookup(0, &[f]) {
                    let through_self = matches!(records.unpack(a[2]), Some(Record::ObjectMember(base, _)) if base == self_name);
                    if through_self {
                        out.emit([f, a[2]]);
                    }
                }
            }
        }),
    ]
}

pub fn alias_rules(rel: &Relations) -> Vec<Rule> {
    let Relations {
        uses,
        def,
        collect,
        reachable,
        alias,
        alias_used,
        root_vars,
        ..
    } = *rel;

    vec![
        Rule::new(
            "aliasUsed(f, r) :- def(f, d, r), use(f, u, r), reachable(L(f, d), L(f, u)).",
            alias_used,
        )
        .body([def, uses, reachable])
        .eval(|ctx, out| {
            let records = ctx.records();
            for d in ctx.atom(0).iter() {
                let (f, r) = (d[0], d[2]);
                let Some(defined) = records.find_location(f, d[1]) else {
                    continue;
                };
                let used = ctx.atom(1).lookup(1, &[f, r]).any(|u| {
                    records
                        .find_location(f, u[1])
                        .is_some_and(|at| ctx.atom(2).contains(&[defined, at]))
                });
                if used {
                    out.emit([f, r]);
                }
            }
        }),
        Rule::new(
            "aliasUsed(f, r) :- def(f, d, r), alias(L(f, d), r, L(g, t), r2), use(g, u, r2), reachable(L(g, t), L(g, u)).",
            alias_used,
        )
        .body([def, alias, uses, reachable])
        .eval(|ctx, out| {
            let records = ctx.records();
            for d in ctx.atom(0).iter() {
                let (f, r) = (d[0], d[2]);
                let Some(defined) = records.find_location(f, d[1]) else {
                    continue;
                };
                let used = ctx.atom(1).lookup(0, &[defined, r]).any(|a| {
                    let Some((g, _)) = records.unpack_location(a[2]) else {
                        return false;
                    };
                    ctx.atom(2).lookup(1, &[g, a[3]]).any(|u| {
                        records
                            .find_location(g, u[1])
                            .is_some_and(|at| ctx.atom(3).contains(&[a[2], at]))
                    })
                });
                if used {
                    out.emit([f, r]);
                }
            }
        }),
        Rule::new(
            "root_vars(f, r) :- def(f, d, r), collect(g, c), L(f, d) != L(g, c), reachable(L(f, d), L(g, c)), used_after(L(f, d), r, L(g, c)).",
            root_vars,
        )
        .body([def, collect, reachable, uses, alias])
        .eval(|ctx, out| {
            let records = ctx.records();
            let reachable = ctx.atom(2);
            let collections: Vec<Domain> = ctx
                .atom(1)
                .iter()
                .filter_map(|c| records.find_location(c[0], c[1]))
                .collect();

            for d in ctx.atom(0).iter() {
                let (f, r) = (d[0], d[2]);
                let Some(defined) = records.find_location(f, d[1]) else {
                    continue;
                };
                let uses = uses_of(ctx, records, defined, r);

                let straddles = collections.iter().any(|&c| {
                    c != defined
                        && reachable.contains(&[defined, c])
                        && uses.iter().any(|&u| reachable.contains(&[c, u]))
                });
                if straddles {
                    out.emit([f, r]);
                }
            }
        }),
    ]
}

// Locations where `r`, defined at `defined`, is read: its own uses, and the
// uses of every alias target that the alias location reaches.  Reads the
// body of the `root_vars` rule.
fn uses_of(ctx: &RuleContext<'_>, records: &RecordTable, defined: Domain, r: Domain) -> Vec<Domain> {
    let (reachable, uses, alias) = (ctx.atom(2), ctx.atom(3), ctx.atom(4));

    let mut out: Vec<Domain> = locations_using(uses, records, r).collect();
    for a in alias.lookup(0, &[defined, r]) {
        let from = a[2];
        out.extend(locations_using(uses, records, a[3]).filter(|&u| reachable.contains(&[from, u])));
    }
    out
}

fn locations_using<'a>(
    uses: &'a Relation,
    records: &'a RecordTable,
    r: Domain,
) -> impl Iterator<Item = Domain> + 'a {
    uses.lookup(2, &[r])
        .filter_map(move |u| records.find_location(u[0], u[1]))
}
