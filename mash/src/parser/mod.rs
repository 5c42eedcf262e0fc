mod builder;
pub mod error;

pub use builder::include_target;
pub use error::ParseError;

use std::sync::Arc;

use crate::scanner::element::elements;
use crate::tree::{NodeId, Tree};

/// Parser entry point.
pub struct Parser {
    source: String,
    source_name: Arc<str>,
    start_line: usize,
}

impl Parser {
    pub fn new(source: impl Into<String>, source_name: impl Into<Arc<str>>) -> Self {
        Parser {
            source: source.into(),
            source_name: source_name.into(),
            start_line: 1,
        }
    }

    /// Number the first line of the source as `line` instead of 1.
    pub fn with_start_line(mut self, line: usize) -> Self {
        self.start_line = line.max(1);
        self
    }

    /// Parse into a fresh tree. Empty input yields a tree without a root.
    pub fn parse(&self) -> Result<Tree, ParseError> {
        let mut tree = Tree::new();
        let root = self.parse_into(&mut tree)?;
        tree.set_root(root);
        Ok(tree)
    }

    /// Parse into an existing arena, so identities stay unique across the
    /// documents of one run. The returned root is not attached anywhere.
    pub fn parse_into(&self, tree: &mut Tree) -> Result<Option<NodeId>, ParseError> {
        let root = builder::build_tree(
            tree,
            elements(&self.source, self.source_name.clone(), self.start_line),
        )?;
        if let Some(root) = root {
            log::debug!(
                "parsed {} into {} nodes",
                self.source_name,
                tree.descendants(root).len()
            );
        }
        Ok(root)
    }
}
