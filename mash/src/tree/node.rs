use std::fmt;

use crate::address::Address;

/// Stable identity of a node. Identities are handed out in creation order and
/// never reused, so they survive any reshaping of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the frame tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub address: Address,
    /// Non-owning back-reference; `None` for a root.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A nested region delimited by `[[[` and `]]]`.
    Frame(Frame),
    /// Literal text after a separator (or anywhere in a root).
    Text(String),
    /// Fragment source before a separator, handed to the evaluator.
    Code(String),
    /// An `include <name>` directive, resolved lazily into a subtree.
    Include(Include),
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub children: Vec<NodeId>,
    /// Whether a `|||` has been seen; governs how literal content is classified.
    pub separated: bool,
    /// Text composed from finished text children.
    pub text: String,
}

impl Frame {
    pub fn root() -> Self {
        Frame {
            separated: true,
            ..Frame::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Include {
    pub target: String,
    /// Root of the parsed target once resolved. `None` before resolution, and
    /// also after resolving an empty file.
    pub subtree: Option<NodeId>,
}

impl Include {
    pub fn new(target: impl Into<String>) -> Self {
        Include {
            target: target.into(),
            subtree: None,
        }
    }
}

/// The kind of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeClass {
    Frame,
    Code,
    Text,
    Include,
}

impl NodeClass {
    pub fn name(self) -> &'static str {
        match self {
            NodeClass::Frame => "frame",
            NodeClass::Code => "code",
            NodeClass::Text => "text",
            NodeClass::Include => "include",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Node {
    pub fn class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Frame(_) => NodeClass::Frame,
            NodeKind::Text(_) => NodeClass::Text,
            NodeKind::Code(_) => NodeClass::Code,
            NodeKind::Include(_) => NodeClass::Include,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match &self.kind {
            NodeKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_frame_mut(&mut self) -> Option<&mut Frame> {
        match &mut self.kind {
            NodeKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self.kind, NodeKind::Code(_))
    }
}
