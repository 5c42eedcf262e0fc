pub mod node;

pub use node::{Frame, Include, Node, NodeClass, NodeId, NodeKind};

use crate::address::Address;

/// Arena holding every node created for one run, including the subtrees of
/// resolved includes. Nodes are never freed; a node is live while it can be
/// reached from the root.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Number of nodes ever allocated, live or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn frame(&self, id: NodeId) -> Option<&Frame> {
        self.get(id).and_then(Node::as_frame)
    }

    pub fn frame_mut(&mut self, id: NodeId) -> Option<&mut Frame> {
        self.nodes.get_mut(id.0).and_then(Node::as_frame_mut)
    }

    pub(crate) fn alloc(
        &mut self,
        address: Address,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            address,
            parent,
            kind,
        });
        id
    }

    pub(crate) fn push_child(&mut self, frame: NodeId, child: NodeId) {
        if let Some(frame) = self.frame_mut(frame) {
            frame.children.push(child);
        }
    }

    /// The nodes directly owned by `id`: a frame's children, or the resolved
    /// subtree of an include.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Frame(frame) => &frame.children,
            NodeKind::Include(Include {
                subtree: Some(subtree),
                ..
            }) => std::slice::from_ref(subtree),
            _ => &[],
        }
    }

    /// `id` and everything below it, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Every node currently reachable from the root.
    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.root
            .map(|root| self.descendants(root))
            .unwrap_or_default()
    }

    /// Remove `id` from its parent frame's child list. Returns whether it was
    /// found there.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).parent else {
            return false;
        };
        let Some(frame) = self.frame_mut(parent) else {
            return false;
        };
        let before = frame.children.len();
        frame.children.retain(|&child| child != id);
        before != frame.children.len()
    }

    /// Hang a freshly parsed root under an include node.
    pub fn attach_subtree(&mut self, include: NodeId, subtree: NodeId) {
        if let NodeKind::Include(inc) = &mut self.node_mut(include).kind {
            inc.subtree = Some(subtree);
        }
        self.node_mut(subtree).parent = Some(include);
    }

    /// Nearest frame strictly above `id`, looking through include nodes.
    pub fn enclosing_frame(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.node(id).parent;
        while let Some(ancestor) = current {
            if self.frame(ancestor).is_some() {
                return Some(ancestor);
            }
            current = self.node(ancestor).parent;
        }
        None
    }

    /// Composed text of a frame; empty for anything else.
    pub fn text(&self, id: NodeId) -> &str {
        self.frame(id).map(|f| f.text.as_str()).unwrap_or("")
    }

    /// Indented outline of `id` and its descendants, two spaces per level.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, 0, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        match &self.node(id).kind {
            NodeKind::Frame(frame) => {
                out.push_str(&format!("{}[[[\n", pad));
                for &child in &frame.children {
                    self.render_into(child, depth + 1, out);
                }
                out.push_str(&format!("{}]]]\n", pad));
            }
            NodeKind::Text(text) => out.push_str(&format!("{}. {:?}\n", pad, text)),
            NodeKind::Code(code) => out.push_str(&format!("{}* {:?}\n", pad, code)),
            NodeKind::Include(include) => {
                out.push_str(&format!("{}@ include {}\n", pad, include.target));
                if let Some(subtree) = include.subtree {
                    self.render_into(subtree, depth + 1, out);
                }
            }
        }
    }
}
