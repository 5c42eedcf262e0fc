use std::fmt;

use mash::tree::{Include, NodeId, NodeKind, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Start,
    Finish,
}

/// One phase of one node: the unit of work and of ordering. Events order by
/// node identity first, so the smallest ready event is the leftmost one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Event {
    pub node: NodeId,
    pub phase: Phase,
}

impl Event {
    pub fn start(node: NodeId) -> Self {
        Event {
            node,
            phase: Phase::Start,
        }
    }

    pub fn finish(node: NodeId) -> Self {
        Event {
            node,
            phase: Phase::Finish,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Start => write!(f, "start {}", self.node),
            Phase::Finish => write!(f, "finish {}", self.node),
        }
    }
}

/// `before` must have executed before `after` may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub before: Event,
    pub after: Event,
}

impl Constraint {
    pub fn new(before: Event, after: Event) -> Self {
        Constraint { before, after }
    }
}

/// The ordering edges contributed by a single node, given the tree's current
/// shape.
pub fn node_constraints(tree: &Tree, id: NodeId, out: &mut Vec<Constraint>) {
    out.push(Constraint::new(Event::start(id), Event::finish(id)));

    match &tree.node(id).kind {
        NodeKind::Frame(frame) => {
            for &child in &frame.children {
                out.push(Constraint::new(Event::start(id), Event::start(child)));
                out.push(Constraint::new(Event::finish(child), Event::finish(id)));
            }

            // Text has to be composed before any code of the frame runs, and
            // code shares one scope, so the whole sequence runs in order.
            let (code, rest): (Vec<NodeId>, Vec<NodeId>) = frame
                .children
                .iter()
                .partition(|&&child| tree.node(child).is_code());
            let chain: Vec<NodeId> = rest.into_iter().chain(code).collect();
            for pair in chain.windows(2) {
                out.push(Constraint::new(
                    Event::finish(pair[0]),
                    Event::start(pair[1]),
                ));
            }
        }
        NodeKind::Include(Include {
            subtree: Some(subtree),
            ..
        }) => {
            out.push(Constraint::new(Event::start(id), Event::start(*subtree)));
            out.push(Constraint::new(Event::finish(*subtree), Event::finish(id)));
        }
        NodeKind::Include(_) | NodeKind::Text(_) | NodeKind::Code(_) => {}
    }
}
