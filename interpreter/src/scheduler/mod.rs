//! Runs every node's Start and Finish exactly once, in an order consistent
//! with the constraints the tree's current shape implies.
//!
//! Work proceeds in passes. Each pass derives the full constraint graph from
//! the live nodes, drops whatever already ran, and drains ready events
//! smallest-first. An event that reshapes the tree ends the pass so the graph
//! can be rebuilt around the new shape.

pub mod constraint;
mod plan;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use mash::tree::{NodeKind, Tree};
use mash::{Address, NodeId, Parser, Unindented};

use crate::error::WeaveError;
use crate::fragment::{Evaluator, Flow, Fragment};
use crate::include::IncludeResolver;
use crate::stats::Stats;

pub use constraint::{Constraint, Event, Phase, node_constraints};
use plan::Plan;

/// How a run ended without error.
#[derive(Debug)]
pub enum Completion {
    Finished(Report),
    /// A fragment asked for the whole run to be thrown away and redone.
    Restart,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub stats: Stats,
    pub elapsed: Duration,
    /// Composed text of the document root.
    pub text: String,
    /// Every executed event, in execution order.
    pub journal: Vec<Event>,
    pub passes: usize,
}

/// Effect of one executed event on the rest of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Unchanged,
    Reshaped,
    Restart,
}

enum Drained {
    Complete,
    Reshaped,
    Restart,
}

pub struct Scheduler<'r> {
    resolver: &'r IncludeResolver,
    executed: HashSet<Event>,
    journal: Vec<Event>,
    stats: Stats,
    passes: usize,
}

impl<'r> Scheduler<'r> {
    pub fn new(resolver: &'r IncludeResolver) -> Self {
        Scheduler {
            resolver,
            executed: HashSet::new(),
            journal: Vec::new(),
            stats: Stats::default(),
            passes: 0,
        }
    }

    pub fn run<E>(mut self, tree: &mut Tree, evaluator: &mut E) -> Result<Completion, WeaveError>
    where
        E: Evaluator + ?Sized,
    {
        let started = Instant::now();

        loop {
            let mut plan = self.plan(tree);
            if plan.is_empty() {
                break;
            }
            match self.drain(&mut plan, tree, evaluator)? {
                Drained::Complete => break,
                Drained::Reshaped => continue,
                Drained::Restart => {
                    log::debug!("restart requested after {} events", self.journal.len());
                    return Ok(Completion::Restart);
                }
            }
        }

        let text = tree
            .root()
            .map(|root| tree.text(root).to_string())
            .unwrap_or_default();
        Ok(Completion::Finished(Report {
            stats: self.stats,
            elapsed: started.elapsed(),
            text,
            journal: self.journal,
            passes: self.passes,
        }))
    }

    fn plan(&mut self, tree: &Tree) -> Plan {
        self.passes += 1;
        let live = tree.live_nodes();
        let mut constraints = Vec::new();
        for &id in &live {
            node_constraints(tree, id, &mut constraints);
        }
        let events = live
            .iter()
            .flat_map(|&id| [Event::start(id), Event::finish(id)]);
        let plan = Plan::build(events, constraints, &self.executed);
        log::debug!(
            "pass {}: {} live nodes, {} pending events",
            self.passes,
            live.len(),
            plan.pending()
        );
        plan
    }

    fn drain<E>(
        &mut self,
        plan: &mut Plan,
        tree: &mut Tree,
        evaluator: &mut E,
    ) -> Result<Drained, WeaveError>
    where
        E: Evaluator + ?Sized,
    {
        while !plan.is_empty() {
            let Some(event) = plan.next_ready() else {
                return Err(WeaveError::Stalled {
                    pending: plan.pending(),
                });
            };

            let step = self.execute(tree, evaluator, event)?;
            self.executed.insert(event);
            self.journal.push(event);
            plan.complete(event);

            match step {
                Step::Unchanged => {}
                Step::Reshaped => return Ok(Drained::Reshaped),
                Step::Restart => return Ok(Drained::Restart),
            }
        }
        Ok(Drained::Complete)
    }

    fn execute<E>(
        &mut self,
        tree: &mut Tree,
        evaluator: &mut E,
        event: Event,
    ) -> Result<Step, WeaveError>
    where
        E: Evaluator + ?Sized,
    {
        let id = event.node;
        let node = tree.node(id);
        log::trace!("{} ({}) at {}", event, node.class(), node.address);
        if event.phase == Phase::Start {
            self.stats.record(node.class());
        }

        match (&node.kind, event.phase) {
            (NodeKind::Code(source), Phase::Start) => {
                let source = Unindented::new(source);
                let address = node.address.clone();
                evaluate(tree, evaluator, id, &source, &address)
            }
            (NodeKind::Include(include), Phase::Start) => {
                let target = include.target.clone();
                let address = node.address.clone();
                self.expand(tree, id, target, address)
            }
            (NodeKind::Text(text), Phase::Finish) => {
                let text = text.clone();
                let parent = node.parent;
                if let Some(frame) = parent.and_then(|parent| tree.frame_mut(parent)) {
                    frame.text.push_str(&text);
                }
                tree.detach(id);
                Ok(Step::Unchanged)
            }
            (NodeKind::Frame(_), Phase::Finish) => Ok(reap(tree, id)),
            _ => Ok(Step::Unchanged),
        }
    }

    fn expand(
        &self,
        tree: &mut Tree,
        id: NodeId,
        target: String,
        address: Address,
    ) -> Result<Step, WeaveError> {
        let path = match self.resolver.resolve(&target) {
            Ok(path) => path,
            Err(searched) => {
                return Err(WeaveError::IncludeNotFound {
                    target,
                    address,
                    searched,
                });
            }
        };
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if enclosing_files(tree, id).contains(&canonical) {
            return Err(WeaveError::IncludeCycle {
                target,
                address,
                path,
            });
        }

        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(source) => {
                return Err(WeaveError::Read {
                    path,
                    address,
                    source,
                });
            }
        };

        let name = path.display().to_string();
        log::info!("{}: including {}", address, name);
        match Parser::new(source, name).parse_into(tree)? {
            Some(root) => {
                tree.attach_subtree(id, root);
                Ok(Step::Reshaped)
            }
            None => Ok(Step::Unchanged),
        }
    }
}

/// Canonical paths of every file `id` is nested in, innermost first. Names
/// that are not files on disk (such as `<stdin>`) are skipped.
fn enclosing_files(tree: &Tree, id: NodeId) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut last_name = None;
    let mut current = Some(id);
    while let Some(next) = current {
        let node = tree.node(next);
        let name = &node.address.source_name;
        if last_name != Some(name) {
            if let Ok(path) = fs::canonicalize(&**name) {
                if !files.contains(&path) {
                    files.push(path);
                }
            }
            last_name = Some(name);
        }
        current = node.parent;
    }
    files
}

fn evaluate<E>(
    tree: &mut Tree,
    evaluator: &mut E,
    id: NodeId,
    source: &Unindented,
    address: &Address,
) -> Result<Step, WeaveError>
where
    E: Evaluator + ?Sized,
{
    let frame = tree.node(id).parent;
    let frame_text = frame
        .map(|frame| tree.text(frame).to_string())
        .unwrap_or_default();
    let mut emitted = String::new();

    log::debug!("evaluating fragment at {}", address);
    let flow = evaluator.evaluate(Fragment {
        source: &source.text,
        address,
        indents: source.stripped(),
        node: id,
        frame_text: &frame_text,
        emitted: &mut emitted,
    })?;

    if !emitted.is_empty() {
        let target = frame.and_then(|frame| tree.enclosing_frame(frame)).or(frame);
        if let Some(target) = target.and_then(|target| tree.frame_mut(target)) {
            target.text.push_str(&emitted);
        }
    }

    // Keeps its identity so the executed Start is not replayed.
    tree.node_mut(id).kind = NodeKind::Text(String::new());

    Ok(match flow {
        Flow::Continue => Step::Unchanged,
        Flow::Restart => Step::Restart,
    })
}

/// Fold every remaining text child of a frame into its composed text.
fn reap(tree: &mut Tree, id: NodeId) -> Step {
    let children = tree.children(id).to_vec();
    let mut reaped = String::new();
    let mut kept = Vec::with_capacity(children.len());
    for child in children {
        match &tree.node(child).kind {
            NodeKind::Text(text) => reaped.push_str(text),
            _ => kept.push(child),
        }
    }

    let Some(frame) = tree.frame_mut(id) else {
        return Step::Unchanged;
    };
    let removed = kept.len() != frame.children.len();
    frame.children = kept;
    frame.text.push_str(&reaped);
    if removed {
        Step::Reshaped
    } else {
        Step::Unchanged
    }
}
