use mash::parser::include_target;
use mash::tree::NodeKind;
use mash::{NodeClass, ParseError, Parser, Tree};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn parse(source: &str, name: &str) -> Result<Tree, ParseError> {
    Parser::new(source, name).parse()
}

fn classes(tree: &Tree, id: mash::NodeId) -> Vec<NodeClass> {
    tree.children(id)
        .iter()
        .map(|&child| tree.node(child).class())
        .collect()
}

#[test]
fn builds_text_frame_text() {
    let tree = parse("a\nb[[[c|||d]]]e\nf", "x.mash").expect("parse failed");
    let root = tree.root().unwrap();
    assert_eq!(
        classes(&tree, root),
        vec![NodeClass::Text, NodeClass::Frame, NodeClass::Text]
    );

    let frame = tree.children(root)[1];
    assert_eq!(classes(&tree, frame), vec![NodeClass::Code, NodeClass::Text]);
    assert!(tree.frame(root).unwrap().separated);
    assert!(tree.frame(frame).unwrap().separated);

    match &tree.node(tree.children(frame)[0]).kind {
        NodeKind::Code(code) => assert_eq!(code, "c"),
        other => panic!("expected code, got {:?}", other),
    }
}

#[test]
fn marker_at_very_start() {
    let tree = parse("[[[ a ]]]", "x").expect("parse failed");
    let root = tree.root().unwrap();
    assert_eq!(classes(&tree, root), vec![NodeClass::Frame]);
    let frame = tree.children(root)[0];
    assert_eq!(classes(&tree, frame), vec![NodeClass::Code]);
    assert!(!tree.frame(frame).unwrap().separated);
}

#[test]
fn empty_input_has_no_root() {
    let tree = parse("", "x").expect("parse failed");
    assert_eq!(tree.root(), None);
    assert!(tree.is_empty());
}

#[test]
fn duplicate_separator_reports_its_own_line() {
    let err = parse("[[[ a \n ||| b \n ||| c ]]]", "xyz.mash").unwrap_err();
    assert!(matches!(err, ParseError::DuplicateSeparator { .. }));
    assert_eq!(err.address().line, 3);
    assert!(err.to_string().contains("xyz.mash, line 3"), "{}", err);
}

#[test]
fn unclosed_frame_reports_the_opening_line() {
    let err = parse("1\n2\n3 [[[ a\nb\nc\nd", "abc.mash").unwrap_err();
    assert!(matches!(err, ParseError::UnclosedFrame { .. }));
    assert_eq!(err.address().line, 3);
    assert_eq!(err.address().offset, 3);

    let err = parse("1  \n 2 \n 3 [[[ a \n b \n c \n d", "abc.mash").unwrap_err();
    assert!(err.to_string().contains("abc.mash, line 3"), "{}", err);
}

#[rstest]
#[case("[[[ \n a \n ||| \n b \n ]]] \n c \n ]]]", 7)]
#[case("]]]", 1)]
#[case("text\n\n]]] more", 3)]
fn unmatched_close(#[case] source: &str, #[case] line: usize) {
    let err = parse(source, "x").unwrap_err();
    assert!(matches!(err, ParseError::UnmatchedClose { .. }));
    assert_eq!(err.address().line, line);
}

#[test]
fn separator_in_root_is_a_duplicate() {
    let err = parse("a ||| b", "x").unwrap_err();
    assert!(matches!(err, ParseError::DuplicateSeparator { .. }));
}

#[test]
fn separators_in_sibling_frames_are_independent() {
    let tree = parse("[[[ a ||| b ]]][[[ c ||| d ]]]", "x").expect("parse failed");
    assert_eq!(tree.live_nodes().len(), 7);
}

#[rstest]
#[case(" include lib.mash ", Some("lib.mash"))]
#[case("\n  include   other/thing.mash\n", Some("other/thing.mash"))]
#[case("include", None)]
#[case("include a b", None)]
#[case("x = 1\ninclude a", None)]
fn include_directives(#[case] text: &str, #[case] expected: Option<&str>) {
    assert_eq!(include_target(text), expected);
}

#[test]
fn include_only_recognised_before_separator() {
    let tree = parse("[[[ include a.mash ]]][[[ x ||| include b.mash ]]]", "x").unwrap();
    let root = tree.root().unwrap();
    let first = tree.children(root)[0];
    let second = tree.children(root)[1];
    assert_eq!(classes(&tree, first), vec![NodeClass::Include]);
    assert_eq!(classes(&tree, second), vec![NodeClass::Code, NodeClass::Text]);
}

#[test]
fn render_outline() {
    let tree = parse("A [[[ x = 1 ||| B [[[ include lib ]]] ]]]", "x").unwrap();
    let expected = concat!(
        "[[[\n",
        "  . \"A \"\n",
        "  [[[\n",
        "    * \" x = 1 \"\n",
        "    . \" B \"\n",
        "    [[[\n",
        "      @ include lib\n",
        "    ]]]\n",
        "    . \" \"\n",
        "  ]]]\n",
        "]]]\n",
    );
    assert_eq!(tree.render(tree.root().unwrap()), expected);
}

#[test]
fn start_line_offsets_addresses() {
    let tree = Parser::new("a\n[[[ b ]]]", "x")
        .with_start_line(10)
        .parse()
        .unwrap();
    let root = tree.root().unwrap();
    let frame = tree.children(root)[1];
    assert_eq!(tree.node(frame).address.line, 11);
}

#[test]
fn unindent_strips_first_line_prefix() {
    let code = "    print('hello')\n    print('world')";
    assert_eq!(code.len() - mash::unindent(code).len(), 8);
    assert_eq!(mash::unindent("\n  a\n    b\n c"), "\na\n  b\n c");
    assert_eq!(mash::unindent("flat"), "flat");
}

#[test]
fn unindent_records_what_each_line_lost() {
    let unindented = mash::Unindented::new("  \n\n  a\n    b\n c");
    assert_eq!(unindented.text, "\n\na\n  b\n c");
    assert_eq!(unindented.stripped(), &[2, 0, 2, 2, 0]);

    let flat = mash::Unindented::new("x\ny");
    assert_eq!(flat.stripped(), &[0, 0]);
}

fn document() -> impl Strategy<Value = String> {
    let leaf = "[a-z \n]{0,6}".prop_map(String::from);
    leaf.prop_recursive(4, 48, 3, |inner| {
        prop::collection::vec((inner, any::<bool>()), 1..4).prop_map(|parts| {
            parts
                .into_iter()
                .map(|(body, separated)| {
                    if separated {
                        format!("t[[[{body}|||{body}]]]")
                    } else {
                        format!("[[[{body}]]]")
                    }
                })
                .collect::<String>()
        })
    })
}

proptest! {
    #[test]
    fn one_frame_per_open_marker(source in document()) {
        let tree = parse(&source, "p").unwrap();
        match tree.root() {
            None => prop_assert!(source.is_empty()),
            Some(_) => {
                let frames = tree
                    .live_nodes()
                    .into_iter()
                    .filter(|&id| tree.node(id).class() == NodeClass::Frame)
                    .count();
                prop_assert_eq!(frames - 1, source.matches("[[[").count());
                prop_assert_eq!(frames - 1, source.matches("]]]").count());
            }
        }
    }

    #[test]
    fn frames_open_before_their_descendants(source in document()) {
        let tree = parse(&source, "p").unwrap();
        let Some(root) = tree.root() else { return Ok(()) };
        for id in tree.live_nodes() {
            if id == root || tree.node(id).class() != NodeClass::Frame {
                continue;
            }
            let open = &tree.node(id).address;
            for descendant in tree.descendants(id).into_iter().skip(1) {
                let addr = &tree.node(descendant).address;
                prop_assert!((addr.line, addr.offset) > (open.line, open.offset));
            }
        }
    }
}
