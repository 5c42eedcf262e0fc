use std::iter::Peekable;
use std::sync::Arc;

use crate::address::Address;
use crate::scanner::{Lexeme, Scanner, TokenKind};

/// What an element carries: literal text or a structural marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Token(TokenKind),
}

/// A scanned item together with the address where it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub address: Address,
    pub payload: Payload,
}

impl Element {
    pub fn is_text(&self) -> bool {
        matches!(self.payload, Payload::Text(_))
    }
}

/// Attaches a line/column to every lexeme. Line breaks come out as literal
/// `"\n"` text so that text runs can span lines.
pub struct Addresser<'a> {
    lexemes: Scanner<'a>,
    source_name: Arc<str>,
    line: usize,
    column: usize,
}

impl<'a> Addresser<'a> {
    pub fn new(lexemes: Scanner<'a>, source_name: Arc<str>, start_line: usize) -> Self {
        Addresser {
            lexemes,
            source_name,
            line: start_line,
            column: 1,
        }
    }
}

impl Iterator for Addresser<'_> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let lexeme = self.lexemes.next()?;
        let address = Address::new(self.source_name.clone(), self.line, self.column);

        let payload = match lexeme {
            Lexeme::Text(text) => {
                self.column += text.chars().count();
                Payload::Text(text.to_string())
            }
            Lexeme::Token(TokenKind::NewLine) => {
                self.line += 1;
                self.column = 1;
                Payload::Text(TokenKind::NewLine.marker().to_string())
            }
            Lexeme::Token(kind) => {
                self.column += kind.marker().chars().count();
                Payload::Token(kind)
            }
        };

        Some(Element { address, payload })
    }
}

/// Merges runs of adjacent text elements into one, keeping the address of the
/// first. Markers pass through untouched.
pub struct Compressor<I: Iterator<Item = Element>> {
    elements: Peekable<I>,
}

impl<I: Iterator<Item = Element>> Compressor<I> {
    pub fn new(elements: I) -> Self {
        Compressor {
            elements: elements.peekable(),
        }
    }
}

impl<I: Iterator<Item = Element>> Iterator for Compressor<I> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let mut element = self.elements.next()?;
        if let Payload::Text(run) = &mut element.payload {
            while let Some(Element {
                payload: Payload::Text(more),
                ..
            }) = self.elements.next_if(Element::is_text)
            {
                run.push_str(&more);
            }
        }
        Some(element)
    }
}

/// The full front end: scan, address, compress.
pub fn elements(
    text: &str,
    source_name: Arc<str>,
    start_line: usize,
) -> Compressor<Addresser<'_>> {
    Compressor::new(Addresser::new(Scanner::new(text), source_name, start_line))
}
