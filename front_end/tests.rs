// Fact parsing and loading tests.

use std::path::Path;

use pretty_assertions::assert_eq;

use super::parser::*;
use super::schema::*;
use super::*;
use crate::commons::Error;
use crate::config::Pipeline;

#[test]
fn references_and_values() {
    assert_eq!(
        parse_reference("$LocalVariable(f, x)"),
        Ok(Reference::local("f", "x"))
    );
    assert_eq!(
        parse_reference(r#"$ObjectMember("self", "my field")"#),
        Ok(Reference::member("self", "my field"))
    );
    assert_eq!(parse_value("$Empty"), Ok(Value::Empty));
    assert_eq!(parse_value("$Empty()"), Ok(Value::Empty));
    assert_eq!(
        parse_value("$HeapObject(mylib.BufWriter)"),
        Ok(Value::HeapObject("mylib.BufWriter".to_owned()))
    );
    assert_eq!(
        parse_value("$Ref($ObjectMember(self,buf))"),
        Ok(Value::Ref(Reference::member("self", "buf")))
    );
}

#[test]
fn wrong_constructor_is_rejected() {
    assert!(parse_reference("$Empty").is_err());
    assert!(parse_value("$LocalVariable(f, x)").is_err());
    assert!(parse_value("$HeapObject()").is_err());
    assert!(parse_reference("$LocalVariable(f)").is_err());
    assert!(parse_reference("LocalVariable(f, x)").is_err());
}

#[test]
fn display_matches_input_syntax() {
    let v = Value::Ref(Reference::local("main", "a"));
    assert_eq!(v.to_string(), "$Ref($LocalVariable(main, a))");
    assert_eq!(parse_value(&v.to_string()), Ok(v));
}

#[test]
fn relation_lines() {
    let text = "f\t0\t$LocalVariable(f, x)\t$Empty\n\nf\t3\t$ObjectMember(self, m)\t$HeapObject(T)\r\n";
    let rows = parse_relation(&ASSIGN, text).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[1],
        vec![
            Cell::Symbol("f".to_owned()),
            Cell::Statement(3),
            Cell::Reference(Reference::member("self", "m")),
            Cell::Value(Value::HeapObject("T".to_owned())),
        ]
    );
}

#[test]
fn malformed_line_names_relation_and_line() {
    let text = "f\t0\t1\nf\tzero\t1\n";
    match parse_relation(&CF_EDGE, text) {
        Err(Error::MalformedFact { relation, line, .. }) => {
            assert_eq!(relation, "cf_edge");
            assert_eq!(line, 2);
        }
        other => panic!("expected a malformed fact error, got {other:?}"),
    }

    match parse_relation(&CALL, "f\t0\n") {
        Err(Error::MalformedFact { message, .. }) => {
            assert_eq!(message, "expected 3 columns, found 2")
        }
        other => panic!("expected a malformed fact error, got {other:?}"),
    }
}

#[test]
fn validation_rejects_empty_names() {
    let mut facts = Facts::new();
    facts.use_("f", 1, Reference::local("f", ""));
    assert!(matches!(
        facts.validate(),
        Err(Error::InvalidFacts { relation, .. }) if relation == "use"
    ));
}

#[test]
fn load_worked_example() {
    let facts = load_dir(Path::new("test-data/worked"), Pipeline::Dataflow).unwrap();

    let mut expected = Facts::new();
    expected
        .call("f", 0, "g")
        .call("g", 0, "mylib.MaybeCollect")
        .cf_edge("f", 0, 1)
        .assign("f", 0, Reference::local("f", "x"), Value::Empty)
        .use_("f", 1, Reference::local("f", "x"));

    assert_eq!(facts.0, expected);
}

#[test]
fn missing_required_relation_is_fatal() {
    match load_dir(Path::new("test-data/worked"), Pipeline::AliasAware) {
        Err(Error::MissingFacts { relation, .. }) => assert_eq!(relation, "bind"),
        other => panic!("expected missing facts, got {other:?}"),
    }
}

#[test]
fn load_alias_example() {
    let facts = load_dir(Path::new("test-data/alias"), Pipeline::AliasAware).unwrap();
    let sizes = facts.sizes();

    assert_eq!(sizes["call"], 2);
    assert_eq!(sizes["cf_edge"], 7);
    assert_eq!(sizes["assign"], 4);
    assert_eq!(sizes["bind"], 1);
    assert_eq!(sizes["collect"], 1);
    assert_eq!(sizes["def"], 2);
    assert!(facts.bind.contains(&(
        "main".to_owned(),
        5,
        Reference::local("main", "a"),
        "helper".to_owned(),
        "p".to_owned()
    )));
}
