use interpreter::{
    Completion, Evaluator, Flow, Fragment, IncludeResolver, RuntimeValue, ScriptEvaluator,
    WeaveError, weave_source,
};
use mash::{Address, Parser};

/// Weave `[[[ source ]]]` and return whatever it printed.
fn run(source: &str) -> String {
    let document = format!("[[[{}]]]", source);
    let mut evaluator = ScriptEvaluator::new(Vec::new());
    let resolver = IncludeResolver::new(".");
    match weave_source(&document, "test.mash", &mut evaluator, &resolver) {
        Ok(Completion::Finished(_)) => {}
        other => panic!("run did not finish: {:?}", other),
    }
    String::from_utf8(evaluator.into_output()).unwrap()
}

fn run_trimmed(source: &str) -> String {
    run(source).trim().to_string()
}

/// Evaluate a single fragment directly, as if it started at `address`.
fn evaluate_at(source: &str, address: &Address) -> Result<(Flow, String), interpreter::EvaluationError> {
    let tree = Parser::new("placeholder", "t.mash").parse().unwrap();
    let mut evaluator = ScriptEvaluator::new(Vec::new());
    let mut emitted = String::new();
    let flow = evaluator.evaluate(Fragment {
        source,
        address,
        indents: &[],
        node: tree.root().unwrap(),
        frame_text: "",
        emitted: &mut emitted,
    })?;
    Ok((flow, emitted))
}

#[test]
fn arithmetic() {
    assert_eq!(run_trimmed("print(2 + 3)"), "5");
    assert_eq!(run_trimmed("print(10 - 4)"), "6");
    assert_eq!(run_trimmed("print(3 * 7)"), "21");
    assert_eq!(run_trimmed("print(15 / 3)"), "5");
    assert_eq!(run_trimmed("print(10 % 3)"), "1");
    assert_eq!(run_trimmed("print(7 / 2)"), "3.5");
}

#[test]
fn operator_precedence() {
    assert_eq!(run_trimmed("print(2 + 3 * 4)"), "14");
    assert_eq!(run_trimmed("print((2 + 3) * 4)"), "20");
    assert_eq!(run_trimmed("print(1 + 2 == 3 && 2 < 1 || true)"), "true");
}

#[test]
fn unary_operators() {
    assert_eq!(run_trimmed("print(-5 + 10)"), "5");
    assert_eq!(run_trimmed("print(!false)"), "true");
    assert_eq!(run_trimmed("print(!true)"), "false");
}

#[test]
fn boolean_logic() {
    assert_eq!(run_trimmed("print(true && false)"), "false");
    assert_eq!(run_trimmed("print(true || false)"), "true");
    assert_eq!(run_trimmed("print(5 == 5)"), "true");
    assert_eq!(run_trimmed("print(5 != 3)"), "true");
    assert_eq!(run_trimmed("print(3 > 5)"), "false");
    assert_eq!(run_trimmed("print(3 <= 3)"), "true");
}

#[test]
fn short_circuit_skips_the_right_side() {
    assert_eq!(run_trimmed("print(false && fail(\"boom\"))"), "false");
    assert_eq!(run_trimmed("print(true || fail(\"boom\"))"), "true");
}

#[test]
fn variables_and_assignment() {
    assert_eq!(run_trimmed("x = 42\nprint(x)"), "42");
    assert_eq!(run_trimmed("x = 5; y = 10; print(x + y)"), "15");
}

#[test]
fn strings_and_escapes() {
    assert_eq!(run("print(\"a\\tb\")"), "a\tb\n");
    assert_eq!(run("print(\"say \\\"hi\\\"\")"), "say \"hi\"\n");
    assert_eq!(run_trimmed("print(\"n = \" + 3)"), "n = 3");
}

#[test]
fn ternary_conditional() {
    assert_eq!(run_trimmed("x = 10 > 5 ? \"yes\" : \"no\"\nprint(x)"), "yes");
    assert_eq!(run_trimmed("x = 3 > 5 ? \"yes\" : \"no\"\nprint(x)"), "no");
}

#[test]
fn comments_are_ignored() {
    assert_eq!(run_trimmed("# setup\nx = 1 # one\nprint(x)"), "1");
}

#[test]
fn builtins() {
    assert_eq!(run("print(\"a\", 1, true, ())"), "a 1 true ()\n");
    assert_eq!(run_trimmed("print(len(\"héllo\"))"), "5");
    assert_eq!(run_trimmed("print(str(4) + str(2))"), "42");
    assert_eq!(run_trimmed("print(\"[\" + trim(\"  x  \") + \"]\")"), "[x]");
}

#[test]
fn emit_appends_to_the_enclosing_text() {
    let address = Address::new("t.mash", 1, 1);
    let (flow, emitted) = evaluate_at("emit(\"a\", 1)\nemit(\"b\")", &address).unwrap();
    assert_eq!(flow, Flow::Continue);
    assert_eq!(emitted, "a1b");
}

#[test]
fn restart_stops_the_fragment() {
    let address = Address::new("t.mash", 1, 1);
    let (flow, emitted) = evaluate_at("emit(\"x\"); restart(); emit(\"y\")", &address).unwrap();
    assert_eq!(flow, Flow::Restart);
    assert_eq!(emitted, "x");
}

#[test]
fn scope_is_shared_between_fragments() {
    let document = "[[[ x = 1 ]]][[[ x = x + 1 ]]][[[ print(x) ]]]";
    let mut evaluator = ScriptEvaluator::new(Vec::new());
    weave_source(document, "t.mash", &mut evaluator, &IncludeResolver::new(".")).unwrap();
    assert_eq!(evaluator.env().get("x"), Some(&RuntimeValue::Number(2.0)));
    assert_eq!(String::from_utf8(evaluator.into_output()).unwrap(), "2\n");
}

#[test]
fn error_lines_are_shifted_onto_the_document() {
    let address = Address::new("doc.mash", 5, 4);
    let err = evaluate_at("\n\n\nundefined_var", &address).unwrap_err();
    assert_eq!(err.address.line, 8);
    assert_eq!(err.address.offset, 1);
    assert_eq!(err.address.source_name.as_ref(), "doc.mash");
    assert!(err.message.contains("undefined variable: undefined_var"));

    let err = evaluate_at("x = nope", &address).unwrap_err();
    assert_eq!((err.address.line, err.address.offset), (5, 8));
}

fn weave_error_address(document: &str) -> (usize, usize) {
    let mut evaluator = ScriptEvaluator::new(Vec::new());
    let err = weave_source(document, "doc.mash", &mut evaluator, &IncludeResolver::new("."))
        .unwrap_err();
    match err {
        WeaveError::Evaluation(err) => (err.address.line, err.address.offset),
        other => panic!("expected an evaluation error, got {:?}", other),
    }
}

#[test]
fn error_column_on_the_opening_line() {
    assert_eq!(weave_error_address("abcdefgh [[[ nope ]]]"), (1, 14));
    assert_eq!(weave_error_address("[[[x = 1; y = nope]]]"), (1, 15));
}

#[test]
fn error_column_counts_stripped_indentation() {
    let document = "one\ntwo\nthree\nfour\n[[[  \n\n\n  undefined_var ]]]";
    assert_eq!(weave_error_address(document), (8, 3));

    let document = "x\n[[[\n    a = 1\n    nope\n]]]";
    assert_eq!(weave_error_address(document), (4, 5));
}

#[test]
fn runtime_errors() {
    let address = Address::new("t.mash", 1, 1);
    let cases = [
        ("print(1 / 0)", "division by zero"),
        ("print(1 - \"a\")", "type error: expected Number, got String"),
        ("nope(1)", "unknown function: nope"),
        ("len(1, 2)", "len() takes 1 argument(s), got 2"),
        ("fail(\"custom\")", "custom"),
        ("text = 1", "syntax error: cannot assign to 'text'"),
        ("x = (1", "syntax error"),
        ("x = 1 2", "syntax error: unexpected tokens after assignment"),
        ("print(\"open)", "syntax error: unterminated string"),
    ];
    for (source, expected) in cases {
        let err = evaluate_at(source, &address).unwrap_err();
        assert!(
            err.message.contains(expected),
            "{:?}: {:?} does not mention {:?}",
            source,
            err.message,
            expected
        );
    }
}
