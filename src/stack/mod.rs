//! Virtual stack: runs a route's middleware chain in order, accumulating each
//! unit's contribution, then hands the merged context to the action.

pub mod context;

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::timeout;

pub use context::{keys, Contribution, Device, ExecContext, Principal, QueryParams, RouteParams};

use crate::error::ApiError;
use crate::managers::ActionResult;
use crate::middleware::{Envelope, MiddlewareBox, RawRequest, Step};

/// Per-request execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Pending,
    /// Executing the unit at this index
    Running(usize),
    /// Unit at this index continued; merging its contribution
    Advancing(usize),
    Dispatching,
    Done,
    TerminatedError,
}

/// Result of one pass through the stack
#[derive(Debug)]
pub struct StackOutcome {
    pub envelope: Envelope,
    pub state: StackState,
    /// Units that ran, in order
    pub executed: Vec<&'static str>,
}

pub struct VirtualStack {
    deadline: Duration,
}

impl VirtualStack {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Run `chain` against `request`, then `terminal` with the merged context.
    ///
    /// Units run strictly one after another; each sees the contributions of
    /// every earlier unit. The first unit that fails, responds or overruns the
    /// deadline ends the request and nothing after it runs.
    pub async fn run<F, Fut>(
        &self,
        chain: &[MiddlewareBox],
        request: &RawRequest,
        mut ctx: ExecContext,
        terminal: F,
    ) -> StackOutcome
    where
        F: FnOnce(ExecContext) -> Fut,
        Fut: Future<Output = ActionResult>,
    {
        let mut state = StackState::Pending;
        let mut executed = Vec::with_capacity(chain.len());

        for (index, unit) in chain.iter().enumerate() {
            state = transition(state, StackState::Running(index));
            executed.push(unit.name());

            let started = Instant::now();
            let result = timeout(self.deadline, unit.execute(request, &ctx)).await;
            let elapsed = started.elapsed();

            match result {
                Ok(Ok(Step::Continue(contribution))) => {
                    state = transition(state, StackState::Advancing(index));
                    tracing::debug!("Middleware {} passed in {:?}", unit.name(), elapsed);
                    if let Some(value) = contribution {
                        ctx.insert(unit.name(), value);
                    }
                }
                Ok(Ok(Step::Respond(envelope))) => {
                    tracing::debug!("Middleware {} responded with {}", unit.name(), envelope.code);
                    return StackOutcome {
                        envelope,
                        state: transition(state, StackState::TerminatedError),
                        executed,
                    };
                }
                Ok(Err(error)) => {
                    tracing::warn!("Middleware {} rejected request: {}", unit.name(), error);
                    return StackOutcome {
                        envelope: Envelope::failure(unit.failure_message(), &error),
                        state: transition(state, StackState::TerminatedError),
                        executed,
                    };
                }
                Err(_elapsed) => {
                    tracing::error!("Middleware {} timed out after {:?}", unit.name(), self.deadline);
                    let error = ApiError::gateway_timeout(format!("Middleware {} did not complete in time", unit.name()));
                    return StackOutcome {
                        envelope: Envelope::failure("Request processing timed out", &error),
                        state: transition(state, StackState::TerminatedError),
                        executed,
                    };
                }
            }
        }

        state = transition(state, StackState::Dispatching);
        let envelope = match terminal(ctx).await {
            Ok(success) => success.into_envelope(),
            Err(failure) => failure.into_envelope(),
        };

        StackOutcome {
            envelope,
            state: transition(state, StackState::Done),
            executed,
        }
    }
}

fn transition(from: StackState, to: StackState) -> StackState {
    tracing::trace!("Stack {:?} -> {:?}", from, to);
    to
}
