pub mod address;
pub mod parser;
pub mod scanner;
pub mod tree;

pub use address::Address;
pub use parser::{ParseError, Parser};
pub use tree::{NodeClass, NodeId, NodeKind, Tree};

/// Strip from every line the run of spaces and tabs that precedes the first
/// non-blank character of the text. Lines that do not start with that prefix
/// are left alone.
pub fn unindent(text: &str) -> String {
    Unindented::new(text).text
}

/// Text run through [`unindent`], remembering how many characters came off
/// the front of each line so positions can be mapped back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unindented {
    pub text: String,
    stripped: Vec<usize>,
}

impl Unindented {
    pub fn new(text: &str) -> Self {
        let prefix = text
            .lines()
            .find(|line| !line.trim_start_matches([' ', '\t']).is_empty())
            .map(|line| {
                let trimmed = line.trim_start_matches([' ', '\t']);
                &line[..line.len() - trimmed.len()]
            })
            .unwrap_or("");
        let width = prefix.chars().count();

        let mut lines = Vec::new();
        let mut stripped = Vec::new();
        for line in text.split('\n') {
            match line.strip_prefix(prefix) {
                Some(rest) if !prefix.is_empty() => {
                    lines.push(rest);
                    stripped.push(width);
                }
                _ => {
                    lines.push(line);
                    stripped.push(0);
                }
            }
        }

        Unindented {
            text: lines.join("\n"),
            stripped,
        }
    }

    /// Characters removed from each line, first line first.
    pub fn stripped(&self) -> &[usize] {
        &self.stripped
    }
}
