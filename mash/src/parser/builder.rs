use once_cell::sync::Lazy;
use regex::Regex;

use crate::address::Address;
use crate::parser::error::ParseError;
use crate::scanner::TokenKind;
use crate::scanner::element::{Element, Payload};
use crate::tree::{Frame, Include, NodeId, NodeKind, Tree};

static INCLUDE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*include\s+(\S+)\s*$").unwrap());

/// Turn an element stream into frames and leaves, allocating into `tree`.
/// Returns the new root, or `None` for empty input.
pub(crate) fn build_tree(
    tree: &mut Tree,
    elements: impl IntoIterator<Item = Element>,
) -> Result<Option<NodeId>, ParseError> {
    let mut state = BuildState::new(tree);
    for element in elements {
        state.push(element)?;
    }
    state.finalize()
}

/// The target of an `include <name>` directive, if `text` is exactly one.
pub fn include_target(text: &str) -> Option<&str> {
    INCLUDE_DIRECTIVE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

struct BuildState<'t> {
    tree: &'t mut Tree,
    root: Option<NodeId>,
    /// Innermost open frame. No stack needed: frames know their parents.
    current: Option<NodeId>,
}

impl<'t> BuildState<'t> {
    fn new(tree: &'t mut Tree) -> Self {
        BuildState {
            tree,
            root: None,
            current: None,
        }
    }

    fn current_frame(&mut self, address: &Address) -> NodeId {
        match self.current {
            Some(frame) => frame,
            None => {
                // The root is all text by definition, so it starts separated.
                let root = self
                    .tree
                    .alloc(address.clone(), None, NodeKind::Frame(Frame::root()));
                self.root = Some(root);
                self.current = Some(root);
                root
            }
        }
    }

    fn push(&mut self, element: Element) -> Result<(), ParseError> {
        let frame = self.current_frame(&element.address);

        match element.payload {
            Payload::Text(content) => self.push_text(frame, element.address, content),
            Payload::Token(TokenKind::NewLine) => {
                self.push_text(frame, element.address, TokenKind::NewLine.marker().to_string())
            }
            Payload::Token(TokenKind::Open) => {
                let child = self.tree.alloc(
                    element.address,
                    Some(frame),
                    NodeKind::Frame(Frame::default()),
                );
                self.tree.push_child(frame, child);
                self.current = Some(child);
            }
            Payload::Token(TokenKind::Close) => match self.tree.node(frame).parent {
                Some(parent) => self.current = Some(parent),
                None => {
                    return Err(ParseError::UnmatchedClose {
                        address: element.address,
                    });
                }
            },
            Payload::Token(TokenKind::Separator) => {
                if let Some(state) = self.tree.frame_mut(frame) {
                    if state.separated {
                        return Err(ParseError::DuplicateSeparator {
                            address: element.address,
                        });
                    }
                    state.separated = true;
                }
            }
        }
        Ok(())
    }

    fn push_text(&mut self, frame: NodeId, address: Address, content: String) {
        let separated = self.tree.frame(frame).is_some_and(|f| f.separated);
        let kind = if separated {
            NodeKind::Text(content)
        } else if let Some(target) = include_target(&content) {
            NodeKind::Include(Include::new(target))
        } else {
            NodeKind::Code(content)
        };
        let leaf = self.tree.alloc(address, Some(frame), kind);
        self.tree.push_child(frame, leaf);
    }

    fn finalize(self) -> Result<Option<NodeId>, ParseError> {
        match (self.root, self.current) {
            (Some(root), Some(open)) if root != open => Err(ParseError::UnclosedFrame {
                address: self.tree.node(open).address.clone(),
            }),
            (root, _) => Ok(root),
        }
    }
}
