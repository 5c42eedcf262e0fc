pub mod element;

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use once_cell::sync::Lazy;
use regex::Regex;

/// A bit of mash syntax. The declaration order is the tie-break order used
/// when two markers would start at the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Open,
    Separator,
    Close,
    NewLine,
}

static OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[\[").unwrap());
static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|\|\|").unwrap());
static CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\]\]").unwrap());
static NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n").unwrap());

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [
        TokenKind::Open,
        TokenKind::Separator,
        TokenKind::Close,
        TokenKind::NewLine,
    ];

    /// The literal text of this marker in a document.
    pub fn marker(self) -> &'static str {
        match self {
            TokenKind::Open => "[[[",
            TokenKind::Separator => "|||",
            TokenKind::Close => "]]]",
            TokenKind::NewLine => "\n",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            TokenKind::Open => &OPEN,
            TokenKind::Separator => &SEPARATOR,
            TokenKind::Close => &CLOSE,
            TokenKind::NewLine => &NEWLINE,
        }
    }
}

/// One item of the raw scan: either a run of literal text or a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme<'a> {
    Text(&'a str),
    Token(TokenKind),
}

/// The next known occurrence of one marker pattern. `start == None` means the
/// pattern has not been searched for yet, which sorts ahead of every real
/// match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    start: Option<usize>,
    kind: TokenKind,
    end: usize,
}

/// Lazily splits a text buffer into literal runs and markers.
///
/// Each pattern keeps a single pending match in a min-heap keyed by start
/// offset, so the buffer is searched once per pattern rather than once per
/// pattern per step.
pub struct Scanner<'a> {
    text: &'a str,
    cursor: usize,
    queue: BinaryHeap<Reverse<Pending>>,
    held: Option<TokenKind>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        let queue = TokenKind::ALL
            .iter()
            .map(|&kind| {
                Reverse(Pending {
                    start: None,
                    kind,
                    end: 0,
                })
            })
            .collect();
        Scanner {
            text,
            cursor: 0,
            queue,
            held: None,
        }
    }

    fn search(&mut self, kind: TokenKind) {
        if let Some(m) = kind.pattern().find_at(self.text, self.cursor) {
            self.queue.push(Reverse(Pending {
                start: Some(m.start()),
                kind,
                end: m.end(),
            }));
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Lexeme<'a>;

    fn next(&mut self) -> Option<Lexeme<'a>> {
        if let Some(kind) = self.held.take() {
            return Some(Lexeme::Token(kind));
        }

        while let Some(Reverse(pending)) = self.queue.pop() {
            let Some(start) = pending.start else {
                self.search(pending.kind);
                continue;
            };

            // Overlaps a marker that was already consumed; look again further on.
            if start < self.cursor {
                self.search(pending.kind);
                continue;
            }

            let preceding = &self.text[self.cursor..start];
            self.cursor = pending.end;
            self.search(pending.kind);

            if preceding.is_empty() {
                return Some(Lexeme::Token(pending.kind));
            }
            self.held = Some(pending.kind);
            return Some(Lexeme::Text(preceding));
        }

        if self.cursor < self.text.len() {
            let rest = &self.text[self.cursor..];
            self.cursor = self.text.len();
            return Some(Lexeme::Text(rest));
        }
        None
    }
}
