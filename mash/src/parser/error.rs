use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::address::Address;

/// Structural errors found while building the frame tree. Each carries the
/// address of the offending marker, or of the opening marker for a frame
/// that never closed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{address}: multiple separators (|||) in a single frame")]
    DuplicateSeparator { address: Address },

    #[error("{address}: closing delimiter (]]]) found at top level")]
    UnmatchedClose { address: Address },

    #[error("{address}: frame was never closed")]
    UnclosedFrame { address: Address },
}

impl ParseError {
    pub fn address(&self) -> &Address {
        match self {
            ParseError::DuplicateSeparator { address }
            | ParseError::UnmatchedClose { address }
            | ParseError::UnclosedFrame { address } => address,
        }
    }

    /// The message without the address prefix.
    pub fn message(&self) -> &'static str {
        match self {
            ParseError::DuplicateSeparator { .. } => "multiple separators (|||) in a single frame",
            ParseError::UnmatchedClose { .. } => "closing delimiter (]]]) found at top level",
            ParseError::UnclosedFrame { .. } => "frame was never closed",
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display. `span` is the
    /// byte range of the marker in the file registered under `file_id`.
    pub fn to_diagnostic(&self, file_id: usize, span: Range<usize>) -> Diagnostic<usize> {
        let label = match self {
            ParseError::DuplicateSeparator { .. } => "second separator here",
            ParseError::UnmatchedClose { .. } => "nothing left to close",
            ParseError::UnclosedFrame { .. } => "frame opened here",
        };
        let diagnostic = Diagnostic::error()
            .with_message(self.message())
            .with_labels(vec![Label::primary(file_id, span).with_message(label)]);
        match self {
            ParseError::UnclosedFrame { .. } => {
                diagnostic.with_notes(vec!["add a matching ]]] before the end of input".into()])
            }
            _ => diagnostic,
        }
    }
}
