use mash::{Address, NodeId};

/// A code leaf ready to run: source already de-indented, plus what it may see
/// of the document around it.
pub struct Fragment<'a> {
    pub source: &'a str,
    /// Where the fragment starts in its document. Errors reported against
    /// fragment-relative lines are mapped back through `Address::shifted`.
    pub address: &'a Address,
    /// Characters de-indenting removed from the front of each source line.
    pub indents: &'a [usize],
    pub node: NodeId,
    /// Composed text of the frame holding this fragment.
    pub frame_text: &'a str,
    /// Text written here is appended to the frame enclosing that frame.
    pub emitted: &'a mut String,
}

/// What the scheduler should do after a fragment ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Discard the whole run and start over from a clean context.
    Restart,
}

/// A fragment failed. `address` already points into the original document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{address}: {message}")]
pub struct EvaluationError {
    pub message: String,
    pub address: Address,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>, address: Address) -> Self {
        EvaluationError {
            message: message.into(),
            address,
        }
    }
}

/// The capability that runs code fragments. Implementations own the single
/// variable scope shared by every fragment of a run.
pub trait Evaluator {
    fn evaluate(&mut self, fragment: Fragment<'_>) -> Result<Flow, EvaluationError>;
}

impl<E: Evaluator + ?Sized> Evaluator for &mut E {
    fn evaluate(&mut self, fragment: Fragment<'_>) -> Result<Flow, EvaluationError> {
        (**self).evaluate(fragment)
    }
}
