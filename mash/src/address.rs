use std::fmt;
use std::sync::Arc;

/// A location in some source document. Lines and offsets are 1-based; the
/// offset counts characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub source_name: Arc<str>,
    pub line: usize,
    pub offset: usize,
}

impl Address {
    pub fn new(source_name: impl Into<Arc<str>>, line: usize, offset: usize) -> Self {
        Address {
            source_name: source_name.into(),
            line,
            offset,
        }
    }

    /// Map a position inside a fragment that starts here back onto the
    /// document. `line_in_fragment` and `column` are 1-based; columns on the
    /// fragment's first line are counted from this address's offset.
    pub fn shifted(&self, line_in_fragment: usize, column: usize) -> Address {
        let line_in_fragment = line_in_fragment.max(1);
        let column = column.max(1);
        let offset = if line_in_fragment == 1 {
            self.offset + column - 1
        } else {
            column
        };
        Address {
            source_name: self.source_name.clone(),
            line: self.line + line_in_fragment - 1,
            offset,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, line {}, pos {})",
            self.source_name, self.line, self.offset
        )
    }
}
