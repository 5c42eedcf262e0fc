use std::env;

use mash::{Parser, Tree};

use crate::error::WeaveError;
use crate::fragment::Evaluator;
use crate::include::IncludeResolver;
use crate::scheduler::{Completion, Report, Scheduler};

/// Run every node of a parsed tree.
pub fn weave<E>(
    tree: &mut Tree,
    evaluator: &mut E,
    resolver: &IncludeResolver,
) -> Result<Completion, WeaveError>
where
    E: Evaluator + ?Sized,
{
    Scheduler::new(resolver).run(tree, evaluator)
}

/// Parse `source` under `source_name`, then weave it.
pub fn weave_source<E>(
    source: &str,
    source_name: &str,
    evaluator: &mut E,
    resolver: &IncludeResolver,
) -> Result<Completion, WeaveError>
where
    E: Evaluator + ?Sized,
{
    let mut tree = Parser::new(source, source_name).parse()?;
    weave(&mut tree, evaluator, resolver)
}

/// A run that finished without asking to be restarted.
#[derive(Debug)]
pub struct Settled<E> {
    pub report: Report,
    pub evaluator: E,
    pub restarts: usize,
}

/// Weave until a run finishes without requesting a restart.
///
/// Every attempt starts from the original working directory with a freshly
/// loaded tree and a fresh evaluator; nothing carries over between attempts.
pub fn weave_until_settled<L, M, E>(
    mut load: L,
    mut make_evaluator: M,
    resolver: &IncludeResolver,
    max_restarts: usize,
) -> Result<Settled<E>, WeaveError>
where
    L: FnMut() -> Result<Tree, WeaveError>,
    M: FnMut() -> E,
    E: Evaluator,
{
    let home = env::current_dir()?;
    let mut restarts = 0;

    loop {
        env::set_current_dir(&home)?;
        let mut tree = load()?;
        let mut evaluator = make_evaluator();

        match weave(&mut tree, &mut evaluator, resolver)? {
            Completion::Finished(report) => {
                return Ok(Settled {
                    report,
                    evaluator,
                    restarts,
                });
            }
            Completion::Restart => {
                restarts += 1;
                if restarts > max_restarts {
                    return Err(WeaveError::TooManyRestarts {
                        limit: max_restarts,
                    });
                }
                log::info!("restarting run ({} of at most {})", restarts, max_restarts);
            }
        }
    }
}
