// Small programs whose results are checked by hand.

use pretty_assertions::assert_eq;

use super::*;

// SECTION: might collect and liveness

#[test]
fn worked_scenario() {
    for pipeline in [Pipeline::Dataflow, Pipeline::AliasAware] {
        let a = analyze(worked_facts(), &config(pipeline));

        assert_eq!(a.might_collect(), Set::from([loc("f", 0), loc("g", 0)]));
        assert_eq!(
            a.live_vars_in(),
            Set::from([("f".to_owned(), 1, local("f", "x"))])
        );
        assert_eq!(
            a.live_vars_out(),
            Set::from([("f".to_owned(), 0, local("f", "x"))])
        );
        assert_eq!(a.stack_root_vars(), roots(&[("f", local("f", "x"))]));
    }
}

#[test]
fn worked_scenario_from_fact_files() {
    let config = config(Pipeline::Dataflow);
    let from_files = analyze_dir("test-data/worked", &config);
    let in_memory = analyze(worked_facts(), &config);

    assert_eq!(all_rows(&from_files), all_rows(&in_memory));
    assert_eq!(
        from_files.rows(&schema::STACK_ROOT_VARS),
        vec![vec!["f".to_owned(), "$LocalVariable(f, x)".to_owned()]]
    );
}

#[test]
fn call_graph_pipeline_stops_after_might_collect() {
    let a = analyze(worked_facts(), &config(Pipeline::CallGraph));

    assert_eq!(a.schemas(), vec![schema::MIGHT_COLLECT]);
    assert_eq!(a.might_collect(), Set::from([loc("f", 0), loc("g", 0)]));
    assert!(a.live_vars_out().is_empty());
    assert!(a.stack_root_vars().is_empty());
}

#[test]
fn might_collect_follows_call_chains() {
    let mut facts = Facts::new();
    facts
        .call("a", 1, "b")
        .call("b", 2, "c")
        .call("c", 3, PRIMITIVE)
        .call("d", 0, "a")
        .call("d", 4, "e")
        .call("e", 0, "external")
        // a recursive function that also collects
        .call("r", 0, "r")
        .call("r", 1, PRIMITIVE);

    let a = analyze(facts, &config(Pipeline::CallGraph));

    assert_eq!(
        a.might_collect(),
        Set::from([
            loc("a", 1),
            loc("b", 2),
            loc("c", 3),
            loc("d", 0),
            loc("r", 0),
            loc("r", 1),
        ])
    );
}

#[test]
fn collect_primitive_is_configurable() {
    let mut facts = Facts::new();
    facts.call("f", 2, "rt.gc").call("f", 3, PRIMITIVE);

    let config = AnalysisConfig {
        collect_primitive: "rt.gc".to_owned(),
        ..config(Pipeline::CallGraph)
    };
    let a = analyze(facts, &config);

    assert_eq!(a.might_collect(), Set::from([loc("f", 2)]));
}

#[test]
fn nothing_collects_without_the_primitive() {
    let mut facts = Facts::new();
    facts.call("f", 0, "g").call("g", 0, "h");

    let a = analyze(facts, &config(Pipeline::CallGraph));

    assert!(a.might_collect().is_empty());
}

fn liveness(a: &Analysis) -> (Vec<Statement>, Vec<Statement>) {
    let live_in = a.live_vars_in().into_iter().map(|(_, s, _)| s).collect();
    let live_out = a.live_vars_out().into_iter().map(|(_, s, _)| s).collect();
    (live_in, live_out)
}

#[test]
fn straight_line_liveness() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..5)
        .use_("f", 3, local("f", "x"));

    let a = analyze(facts, &config(Pipeline::Dataflow));

    // live on entry to every statement up to the use, dead after it.
    assert_eq!(liveness(&a), (vec![0, 1, 2, 3], vec![0, 1, 2]));
}

#[test]
fn assignment_ends_the_live_range() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..5)
        .assign("f", 2, local("f", "x"), Value::HeapObject("T".to_owned()))
        .use_("f", 3, local("f", "x"));

    let a = analyze(facts, &config(Pipeline::Dataflow));

    assert_eq!(liveness(&a), (vec![3], vec![2]));
}

#[test]
fn liveness_joins_over_branches() {
    let mut facts = Facts::new();
    facts
        .cf_edge("f", 0, 1)
        .cf_edge("f", 0, 2)
        .cf_edge("f", 1, 3)
        .cf_edge("f", 2, 3)
        .use_("f", 2, local("f", "x"));

    let a = analyze(facts, &config(Pipeline::Dataflow));

    assert_eq!(liveness(&a), (vec![0, 2], vec![0]));
}

#[test]
fn liveness_stays_inside_functions() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..2)
        .straight_line("g", 0..2)
        .call("f", 1, "g")
        .use_("g", 2, local("g", "y"));

    let a = analyze(facts, &config(Pipeline::Dataflow));

    assert!(a.live_vars_in().iter().all(|(f, ..)| f == "g"));
    assert!(a.live_vars_out().iter().all(|(f, ..)| f == "g"));
}

// SECTION: stack roots

#[test]
fn declared_locals_of_collecting_functions_are_roots() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..5)
        .call("f", 4, PRIMITIVE)
        .assign("f", 0, local("f", "a"), Value::Empty)
        .assign("f", 0, local("f", "b"), Value::Empty)
        // not declared at entry
        .assign("f", 1, local("f", "c"), Value::Empty)
        // not empty
        .assign("f", 0, local("f", "d"), Value::HeapObject("T".to_owned()))
        // someone else's local
        .assign("f", 0, local("other", "z"), Value::Empty)
        // g never collects
        .assign("g", 0, local("g", "e"), Value::Empty);

    let a = analyze(facts, &config(Pipeline::Dataflow));

    assert_eq!(
        a.stack_root_vars(),
        roots(&[("f", local("f", "a")), ("f", local("f", "b"))])
    );
}

#[test]
fn references_live_across_collecting_calls_are_roots() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..4)
        .call("f", 2, "g")
        .call("g", 0, PRIMITIVE)
        .assign("f", 1, local("f", "p"), Value::HeapObject("T".to_owned()))
        .assign("f", 1, Reference::member("q", "next"), Value::Empty)
        .use_("f", 3, local("f", "p"))
        .use_("f", 3, Reference::member("q", "next"))
        // dies before the call
        .use_("f", 2, local("f", "t"));

    let a = analyze(facts, &config(Pipeline::Dataflow));

    assert_eq!(
        a.stack_root_vars(),
        roots(&[
            ("f", local("f", "p")),
            ("f", Reference::member("q", "next")),
        ])
    );
}

#[test]
fn fields_written_by_constructors_are_roots() {
    let ctor = "state.ctx_Eval.__init__";
    let plain = "state.Mem.__init__";
    let facts = || {
        let mut facts = Facts::new();
        facts
            .assign(ctor, 1, Reference::member("self", "mem"), Value::HeapObject("Mem".to_owned()))
            .assign(ctor, 2, Reference::member("other", "x"), Value::Empty)
            .assign(plain, 1, Reference::member("self", "buf"), Value::HeapObject("Buf".to_owned()));
        facts
    };

    let a = analyze(facts(), &config(Pipeline::Dataflow));
    assert_eq!(
        a.stack_root_vars(),
        roots(&[(ctor, Reference::member("self", "mem"))])
    );

    let custom = AnalysisConfig {
        constructor_pattern: r"state\.Mem\..*".to_owned(),
        ..config(Pipeline::Dataflow)
    };
    let a = analyze(facts(), &custom);
    assert_eq!(
        a.stack_root_vars(),
        roots(&[(plain, Reference::member("self", "buf"))])
    );

    let other_self = AnalysisConfig {
        self_name: "this".to_owned(),
        ..config(Pipeline::Dataflow)
    };
    assert!(analyze(facts(), &other_self).stack_root_vars().is_empty());
}

#[test]
fn bad_constructor_pattern_is_a_config_error() {
    let config = AnalysisConfig {
        constructor_pattern: "(".to_owned(),
        ..AnalysisConfig::default()
    };
    let facts = worked_facts().validate().unwrap();

    assert!(matches!(
        run(&facts, &config),
        Err(crate::commons::Error::Config { .. })
    ));
}

// SECTION: program graph, aliasing and root_vars

fn retaining() -> AnalysisConfig {
    AnalysisConfig {
        prune_intermediates: false,
        ..AnalysisConfig::default()
    }
}

#[test]
fn alias_example() {
    let a = analyze_dir("test-data/alias", &AnalysisConfig::default());
    let (x, y, p) = (local("main", "a"), local("main", "b"), local("helper", "p"));

    assert_eq!(
        a.alias(),
        Set::from([
            (loc("main", 1), x.clone(), loc("main", 2), y.clone()),
            (loc("main", 2), y.clone(), loc("main", 1), x.clone()),
            (loc("main", 1), x.clone(), loc("helper", 0), p.clone()),
            (loc("main", 2), y.clone(), loc("helper", 0), p.clone()),
        ])
    );
    assert_eq!(
        a.alias_used(),
        roots(&[("main", x.clone()), ("main", y.clone())])
    );
    assert_eq!(
        a.root_vars(),
        roots(&[("main", x.clone()), ("main", y.clone())])
    );
    assert_eq!(a.stack_root_vars(), roots(&[("main", x), ("main", y)]));
    assert_eq!(a.might_collect(), Set::from([loc("main", 3)]));
}

#[test]
fn alias_rows_print_packed_locations() {
    let a = analyze_dir("test-data/alias", &AnalysisConfig::default());
    let rows = a.rows(&schema::ALIAS);

    assert_eq!(rows.len(), 4);
    assert!(rows.contains(&vec![
        "$Location(main, 1)".to_owned(),
        "$LocalVariable(main, a)".to_owned(),
        "$Location(helper, 0)".to_owned(),
        "$LocalVariable(helper, p)".to_owned(),
    ]));
}

#[test]
fn member_writes_alias_both_ways() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..3)
        .assign("f", 1, local("f", "a"), Value::HeapObject("T".to_owned()))
        .def("f", 1, local("f", "a"))
        .assign("f", 2, Reference::member("self", "m"), Value::Ref(local("f", "a")));

    let a = analyze(facts, &AnalysisConfig::default());
    let m = Reference::member("self", "m");

    assert_eq!(
        a.alias(),
        Set::from([
            (loc("f", 1), local("f", "a"), loc("f", 2), m.clone()),
            (loc("f", 2), m, loc("f", 1), local("f", "a")),
        ])
    );
}

#[test]
fn copies_before_the_definition_do_not_alias() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..3)
        .assign("f", 1, local("f", "b"), Value::Ref(local("f", "a")))
        .def("f", 2, local("f", "a"));

    let a = analyze(facts, &AnalysisConfig::default());

    assert!(a.alias().is_empty());
}

#[test]
fn calls_are_spliced_into_the_callee_only() {
    let mut facts = Facts::new();
    facts
        .straight_line("main", 0..3)
        .straight_line("helper", 0..2)
        .call("main", 1, "helper");

    let a = analyze(facts, &retaining());
    let reachable = a.reachable();

    assert!(reachable.contains(&(loc("main", 0), loc("helper", 2))));
    assert!(reachable.contains(&(loc("main", 0), loc("main", 3))));
    assert!(reachable.contains(&(loc("helper", 1), loc("helper", 1))));
    assert!(!reachable.contains(&(loc("helper", 0), loc("main", 2))));
    assert!(!reachable.contains(&(loc("main", 2), loc("helper", 0))));
}

#[test]
fn disconnected_functions_stay_apart() {
    let mut facts = Facts::new();
    for f in ["f", "g"] {
        facts
            .straight_line(f, 0..3)
            .assign(f, 1, local(f, "x"), Value::HeapObject("T".to_owned()))
            .def(f, 1, local(f, "x"))
            .assign(f, 2, local(f, "y"), Value::Ref(local(f, "x")))
            .def(f, 2, local(f, "y"))
            .use_(f, 3, local(f, "y"))
            .collect(f, 2);
    }

    let a = analyze(facts, &retaining());

    assert!(!a.reachable().is_empty());
    assert!(a.reachable().iter().all(|((f, _), (g, _))| f == g));
    assert_eq!(a.alias().len(), 4);
    assert!(a.alias().iter().all(|((f, _), _, (g, _), _)| f == g));
}

#[test]
fn argument_binding_needs_a_call_edge() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..3)
        .straight_line("g", 0..2)
        .def("f", 1, local("f", "x"))
        .bind("f", 2, local("f", "x"), "g", "p");

    let unbound = analyze(facts.clone(), &retaining());
    assert!(unbound.reachable().iter().all(|((f, _), (g, _))| f == g));
    assert_eq!(unbound.alias(), Set::new());

    facts.call("f", 2, "g");
    let bound = analyze(facts, &retaining());
    assert_eq!(
        bound.alias(),
        Set::from([(loc("f", 1), local("f", "x"), loc("g", 0), local("g", "p"))])
    );
}

#[test]
fn root_vars_need_a_use_after_the_collection() {
    let mut facts = Facts::new();
    facts
        .straight_line("f", 0..5)
        .def("f", 1, local("f", "kept"))
        .def("f", 1, local("f", "dropped"))
        .def("f", 3, local("f", "late"))
        .collect("f", 2)
        .use_("f", 4, local("f", "kept"))
        .use_("f", 1, local("f", "dropped"))
        .use_("f", 4, local("f", "late"));

    let a = analyze(facts, &AnalysisConfig::default());

    assert_eq!(a.root_vars(), roots(&[("f", local("f", "kept"))]));
    assert_eq!(
        a.alias_used(),
        roots(&[
            ("f", local("f", "kept")),
            ("f", local("f", "dropped")),
            ("f", local("f", "late")),
        ])
    );
}

// SECTION: whole-run properties

#[test]
fn reruns_are_identical() {
    let config = AnalysisConfig::default();
    let first = analyze_dir("test-data/alias", &config);
    let second = analyze_dir("test-data/alias", &config);

    assert_eq!(all_rows(&first), all_rows(&second));
}

#[test]
fn parallel_evaluation_is_deterministic() {
    for seed in [1, 7, 42] {
        let sequential = analyze(generated_facts(seed), &retaining());
        let parallel = analyze(
            generated_facts(seed),
            &AnalysisConfig {
                parallel: true,
                ..retaining()
            },
        );

        assert_eq!(all_rows(&sequential), all_rows(&parallel));
    }
}

#[test]
fn intermediates_are_pruned_unless_retained() {
    let pruned = analyze_dir("test-data/alias", &AnalysisConfig::default());
    assert!(pruned.reachable().is_empty());
    assert!(!pruned.schemas().contains(&schema::REACHABLE));
    assert_eq!(pruned.sizes()["location"], 0);
    assert_eq!(pruned.sizes()["call"], 2);

    let retained = analyze_dir("test-data/alias", &retaining());
    assert!(retained.schemas().contains(&schema::REACHABLE));
    assert!(retained
        .rows(&schema::LOCATION)
        .contains(&vec!["$Location(helper, 0)".to_owned()]));
    assert_eq!(all_rows(&pruned)["root_vars"], all_rows(&retained)["root_vars"]);
}

#[test]
fn relations_only_grow_between_rounds() {
    let a = analyze(generated_facts(3), &AnalysisConfig::default());

    for stratum in a.stats() {
        for w in stratum.sizes.windows(2) {
            for (name, size) in &w[0] {
                assert!(w[1][name] >= *size, "{} shrank in {}", name, stratum.name);
            }
        }
    }
    assert!(a.stats().iter().any(|s| s.recursive && s.rounds > 1));
}
