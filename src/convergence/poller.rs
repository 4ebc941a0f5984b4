use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::time::sleep;

use super::backoff::{BackoffConfig, ExponentialBackoff};
use crate::error::StartStopError;
use crate::gateway::InstanceGateway;
use crate::instance::InstanceState;

/// States of one convergence wait: `Polling → {Converged, Exhausted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Converged,
    Exhausted,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Polling => write!(f, "POLLING"),
            PollState::Converged => write!(f, "CONVERGED"),
            PollState::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// Requested ids split by whether they already report the target state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub converged: Vec<String>,
    pub pending: Vec<String>,
}

impl Partition {
    /// Ids missing from `states` count as pending.
    pub fn of(
        ids: &[String],
        states: &HashMap<String, InstanceState>,
        target: InstanceState,
    ) -> Self {
        let (converged, pending) = ids
            .iter()
            .cloned()
            .partition(|id| states.get(id) == Some(&target));
        Self { converged, pending }
    }

    pub fn state(&self) -> PollState {
        if self.pending.is_empty() {
            PollState::Converged
        } else {
            PollState::Polling
        }
    }
}

/// Snapshot handed to observers before each backoff sleep.
#[derive(Debug, Clone)]
pub struct PollProgress<'a> {
    pub attempt: u32,
    pub partition: &'a Partition,
    pub delay: Duration,
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergence {
    pub attempts: u32,
    pub waited: Duration,
}

/// Polls the gateway until a batch reaches its target state.
pub struct ConvergencePoller<'a, G> {
    gateway: &'a G,
    backoff: &'a BackoffConfig,
}

impl<'a, G: InstanceGateway> ConvergencePoller<'a, G> {
    pub fn new(gateway: &'a G, backoff: &'a BackoffConfig) -> Self {
        Self { gateway, backoff }
    }

    #[cfg(test)]
    pub async fn await_state(
        &self,
        ids: &[String],
        target: InstanceState,
    ) -> Result<Convergence, StartStopError> {
        self.await_state_with(ids, target, |_| {}).await
    }

    /// Block until every id reports `target`.
    ///
    /// A failed status query aborts at once. Otherwise the poller sleeps with
    /// jittered exponential backoff between attempts and fails with
    /// [`StartStopError::NotConverged`] once the backoff budget is spent.
    pub async fn await_state_with(
        &self,
        ids: &[String],
        target: InstanceState,
        mut observe: impl FnMut(PollProgress<'_>),
    ) -> Result<Convergence, StartStopError> {
        let mut backoff = ExponentialBackoff::new(self.backoff.clone());
        if ids.is_empty() {
            return Ok(Convergence {
                attempts: 0,
                waited: Duration::ZERO,
            });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let states = self.gateway.describe_states(ids).await?;
            let partition = Partition::of(ids, &states, target);

            if partition.state() == PollState::Converged {
                tracing::info!(
                    state = %PollState::Converged,
                    %target,
                    attempt,
                    instance_ids = ?partition.converged,
                    "batch converged"
                );
                return Ok(Convergence {
                    attempts: attempt,
                    waited: backoff.elapsed(),
                });
            }

            let Some(delay) = backoff.next_delay() else {
                tracing::error!(
                    state = %PollState::Exhausted,
                    %target,
                    attempt,
                    converged = ?partition.converged,
                    pending = ?partition.pending,
                    "gave up waiting for batch"
                );
                return Err(StartStopError::NotConverged {
                    target,
                    attempts: attempt,
                    converged: partition.converged,
                    pending: partition.pending,
                });
            };

            tracing::debug!(
                state = %PollState::Polling,
                %target,
                attempt,
                delay_ms = delay.as_millis() as u64,
                pending = ?partition.pending,
                "batch not converged yet"
            );
            observe(PollProgress {
                attempt,
                partition: &partition,
                delay,
            });
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Filter, GatewayError, TransitionAck};
    use crate::instance::{Action, Instance};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Gateway that replays scripted status responses.
    struct ScriptedStates {
        pub responses: RefCell<VecDeque<Result<Vec<(&'static str, InstanceState)>, u16>>>,
        pub calls: RefCell<u32>,
    }

    impl ScriptedStates {
        fn new(
            responses: Vec<Result<Vec<(&'static str, InstanceState)>, u16>>,
        ) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl InstanceGateway for ScriptedStates {
        async fn describe_matching(&self, _: &[Filter]) -> Result<Vec<Instance>, GatewayError> {
            Ok(Vec::new())
        }

        async fn request_transition(
            &self,
            _: &[String],
            _: Action,
            _: bool,
        ) -> Result<TransitionAck, GatewayError> {
            Ok(TransitionAck::default())
        }

        async fn describe_states(
            &self,
            _: &[String],
        ) -> Result<HashMap<String, InstanceState>, GatewayError> {
            *self.calls.borrow_mut() += 1;
            let next = self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("no scripted response left");
            match next {
                Ok(states) => Ok(states
                    .into_iter()
                    .map(|(id, s)| (id.to_string(), s))
                    .collect()),
                Err(status) => Err(GatewayError::ApiError {
                    status,
                    message: "scripted failure".into(),
                }),
            }
        }
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_interval_ms: 1,
            multiplier: 1.0,
            randomization_factor: 0.0,
            max_interval_ms: 1,
            max_elapsed_ms: 0,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn converges_after_second_poll() {
        let gateway = ScriptedStates::new(vec![
            Ok(vec![("X", InstanceState::Running), ("Y", InstanceState::Pending)]),
            Ok(vec![("X", InstanceState::Running), ("Y", InstanceState::Running)]),
        ]);
        let backoff = fast_backoff();
        let poller = ConvergencePoller::new(&gateway, &backoff);

        let mut seen = Vec::new();
        let result = poller
            .await_state_with(&ids(&["X", "Y"]), InstanceState::Running, |p| {
                seen.push((p.attempt, p.partition.clone()));
            })
            .await
            .unwrap();

        assert_eq!(result.attempts, 2);
        assert_eq!(*gateway.calls.borrow(), 2);
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            (
                1,
                Partition {
                    converged: ids(&["X"]),
                    pending: ids(&["Y"]),
                }
            )
        );
    }

    #[tokio::test]
    async fn query_error_is_fatal_without_retry() {
        let gateway = ScriptedStates::new(vec![Err(503)]);
        let backoff = fast_backoff();
        let poller = ConvergencePoller::new(&gateway, &backoff);

        let err = poller
            .await_state(&ids(&["X"]), InstanceState::Stopped)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StartStopError::Gateway(GatewayError::ApiError { status: 503, .. })
        ));
        assert_eq!(*gateway.calls.borrow(), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_reports_last_partition() {
        let gateway = ScriptedStates::new(vec![Ok(vec![
            ("X", InstanceState::Stopped),
            ("Y", InstanceState::Stopping),
        ])]);
        let backoff = BackoffConfig {
            initial_interval_ms: 50,
            max_interval_ms: 50,
            max_elapsed_ms: 1,
            ..fast_backoff()
        };
        let poller = ConvergencePoller::new(&gateway, &backoff);

        let err = poller
            .await_state(&ids(&["X", "Y", "Z"]), InstanceState::Stopped)
            .await
            .unwrap_err();
        match err {
            StartStopError::NotConverged {
                target,
                attempts,
                converged,
                pending,
            } => {
                assert_eq!(target, InstanceState::Stopped);
                assert_eq!(attempts, 1);
                assert_eq!(converged, ids(&["X"]));
                assert_eq!(pending, ids(&["Y", "Z"]));
            }
            other => panic!("expected NotConverged, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_converges_without_querying() {
        let gateway = ScriptedStates::new(Vec::new());
        let backoff = fast_backoff();
        let poller = ConvergencePoller::new(&gateway, &backoff);

        let result = poller.await_state(&[], InstanceState::Running).await.unwrap();
        assert_eq!(result.attempts, 0);
        assert_eq!(*gateway.calls.borrow(), 0);
    }

    #[test]
    fn absent_ids_count_as_pending() {
        let states = HashMap::from([("a".to_string(), InstanceState::Running)]);
        let partition = Partition::of(&ids(&["a", "b"]), &states, InstanceState::Running);
        assert_eq!(partition.converged, ids(&["a"]));
        assert_eq!(partition.pending, ids(&["b"]));
        assert_eq!(partition.state(), PollState::Polling);
    }

    #[test]
    fn poll_state_display() {
        assert_eq!(PollState::Polling.to_string(), "POLLING");
        assert_eq!(PollState::Converged.to_string(), "CONVERGED");
        assert_eq!(PollState::Exhausted.to_string(), "EXHAUSTED");
    }
}
