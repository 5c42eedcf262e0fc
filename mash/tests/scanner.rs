use std::sync::Arc;

use mash::scanner::element::{Addresser, Payload, elements};
use mash::scanner::{Lexeme, Scanner, TokenKind};
use proptest::prelude::*;

fn compressed(text: &str) -> Vec<Payload> {
    elements(text, Arc::from("x"), 1).map(|e| e.payload).collect()
}

fn text(s: &str) -> Payload {
    Payload::Text(s.to_string())
}

#[test]
fn scanner_interleaves_markers_and_text() {
    let lexemes: Vec<Lexeme<'_>> = Scanner::new("a[[[b|||c]]]\nd").collect();
    assert_eq!(
        lexemes,
        vec![
            Lexeme::Text("a"),
            Lexeme::Token(TokenKind::Open),
            Lexeme::Text("b"),
            Lexeme::Token(TokenKind::Separator),
            Lexeme::Text("c"),
            Lexeme::Token(TokenKind::Close),
            Lexeme::Token(TokenKind::NewLine),
            Lexeme::Text("d"),
        ]
    );
}

#[test]
fn scanner_handles_marker_at_start_and_end() {
    let lexemes: Vec<Lexeme<'_>> = Scanner::new("[[[ a ]]]").collect();
    assert_eq!(
        lexemes,
        vec![
            Lexeme::Token(TokenKind::Open),
            Lexeme::Text(" a "),
            Lexeme::Token(TokenKind::Close),
        ]
    );
}

#[test]
fn scanner_on_empty_input_yields_nothing() {
    assert_eq!(Scanner::new("").count(), 0);
}

#[test]
fn four_brackets_leave_one_literal_bracket() {
    let lexemes: Vec<Lexeme<'_>> = Scanner::new("[[[[x]]]]").collect();
    assert_eq!(
        lexemes,
        vec![
            Lexeme::Token(TokenKind::Open),
            Lexeme::Text("[x"),
            Lexeme::Token(TokenKind::Close),
            Lexeme::Text("]"),
        ]
    );
}

#[test]
fn addresser_tracks_lines_and_columns() {
    let addressed: Vec<_> =
        Addresser::new(Scanner::new("ab[[[\n  c"), Arc::from("doc.mash"), 1).collect();
    let positions: Vec<(usize, usize)> = addressed
        .iter()
        .map(|e| (e.address.line, e.address.offset))
        .collect();
    assert_eq!(positions, vec![(1, 1), (1, 3), (1, 6), (2, 1)]);
    assert_eq!(addressed[2].payload, text("\n"));
    assert_eq!(&*addressed[0].address.source_name, "doc.mash");
}

#[test]
fn addresser_honours_start_line() {
    let first = Addresser::new(Scanner::new("x"), Arc::from("x"), 7)
        .next()
        .unwrap();
    assert_eq!(first.address.line, 7);
}

#[test]
fn compressor_merges_runs_across_newlines() {
    assert_eq!(
        compressed("a\nb[[[ c ||| d ]]] e\n f"),
        vec![
            text("a\nb"),
            Payload::Token(TokenKind::Open),
            text(" c "),
            Payload::Token(TokenKind::Separator),
            text(" d "),
            Payload::Token(TokenKind::Close),
            text(" e\n f"),
        ]
    );
}

#[test]
fn merged_run_keeps_first_address() {
    let all: Vec<_> = elements("[[[x]]]\n\nfoo", Arc::from("x"), 1).collect();
    let last = all.last().unwrap();
    assert_eq!(last.payload, text("\n\nfoo"));
    assert_eq!((last.address.line, last.address.offset), (1, 8));
}

proptest! {
    #[test]
    fn text_without_markers_is_one_element(input in "[a-z \t\n|\\[\\]]{1,60}") {
        prop_assume!(!input.contains("[[[") && !input.contains("|||") && !input.contains("]]]"));
        let out = compressed(&input);
        prop_assert_eq!(out, vec![Payload::Text(input.clone())]);
    }

    #[test]
    fn scanning_loses_no_characters(input in "[a-z \n|\\[\\]]{0,80}") {
        let rebuilt: String = Scanner::new(&input)
            .map(|lexeme| match lexeme {
                Lexeme::Text(t) => t,
                Lexeme::Token(kind) => kind.marker(),
            })
            .collect();
        prop_assert_eq!(rebuilt, input);
    }
}
