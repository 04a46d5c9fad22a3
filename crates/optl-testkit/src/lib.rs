//! optl-testkit
//!
//! In-memory account readers for driving reconciliation sessions in tests.
//! Nothing here touches the network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use optl_account::{AccountStateReader, ReadError};
use optl_reconcile::AccountSnapshot;

/// One scripted response.
#[derive(Debug, Clone)]
pub struct Step<T> {
    /// Simulated latency before the response is returned.
    pub delay: Duration,
    pub result: Result<T, ReadError>,
}

impl<T> Step<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn err(err: ReadError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Reader that replays a fixed script, one step per call.
///
/// Once the script runs out the last step repeats forever, so a test only
/// needs to spell out the reads it cares about.
pub struct ScriptedReader<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    last: Mutex<Option<Step<T>>>,
    calls: AtomicUsize,
}

impl<T: Clone> ScriptedReader<T> {
    pub fn new(steps: impl IntoIterator<Item = Step<T>>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reader whose every call returns `value`.
    pub fn constant(value: T) -> Self {
        Self::new([Step::ok(value)])
    }

    /// Number of `read_state` calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step<T> {
        let mut steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match steps.pop_front() {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last.clone().unwrap_or_else(|| {
                Step::err(ReadError::Config("scripted reader has no steps".to_string()))
            }),
        }
    }
}

#[async_trait::async_trait]
impl<T> AccountStateReader for ScriptedReader<T>
where
    T: Clone + Send + Sync + 'static,
{
    type State = T;

    fn source_name(&self) -> &'static str {
        "scripted"
    }

    async fn read_state(&self) -> Result<T, ReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }
}

/// Convenience: a credits reader replaying the given balances in order.
pub fn credits_script(balances: &[i64]) -> ScriptedReader<AccountSnapshot> {
    ScriptedReader::new(balances.iter().map(|b| Step::ok(AccountSnapshot::credits(*b))))
}

/// A transient transport failure, as a poll tick would see it.
pub fn network_error() -> ReadError {
    ReadError::Transport("connection reset by peer".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_step_repeats() {
        let r = credits_script(&[1, 2]);
        assert_eq!(r.read_state().await.unwrap(), AccountSnapshot::credits(1));
        assert_eq!(r.read_state().await.unwrap(), AccountSnapshot::credits(2));
        assert_eq!(r.read_state().await.unwrap(), AccountSnapshot::credits(2));
        assert_eq!(r.calls(), 3);
    }

    #[tokio::test]
    async fn empty_script_errors() {
        let r: ScriptedReader<i64> = ScriptedReader::new([]);
        assert!(r.read_state().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_step_waits() {
        let r = ScriptedReader::new([Step::ok(5i64).after(Duration::from_secs(2))]);
        let start = tokio::time::Instant::now();
        assert_eq!(r.read_state().await.unwrap(), 5);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
