pub mod environment;
pub mod error;
pub mod evaluator;
pub mod fragment;
pub mod include;
pub mod runtime_value;
pub mod scheduler;
pub mod script;
pub mod stats;
pub mod weave;

pub use environment::Environment;
pub use error::WeaveError;
pub use evaluator::ScriptEvaluator;
pub use fragment::{EvaluationError, Evaluator, Flow, Fragment};
pub use include::IncludeResolver;
pub use runtime_value::RuntimeValue;
pub use scheduler::{Completion, Event, Phase, Report, Scheduler};
pub use stats::Stats;
pub use weave::{Settled, weave, weave_source, weave_until_settled};
