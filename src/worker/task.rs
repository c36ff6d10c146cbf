//! Cancellable background task handle.
//!
//! A [`TaskHandle`] pairs a tokio [`JoinHandle`] with a
//! [`CancellationToken`].  Cancellation is cooperative: the task body
//! receives the token and decides where it stops.  Waiting for termination
//! is always bounded so shutdown can never hang on a stuck network call.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identifier of one worker/validator instance.  Events carry it so the
/// orchestrator can drop results from instances it has already replaced.
pub type TaskId = u64;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a spawned background task.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    cancel: CancellationToken,
    join: JoinHandle<()>,
    runtime: Handle,
}

impl TaskHandle {
    /// Spawn `body` on `runtime`, handing it a fresh cancellation token.
    pub fn spawn<F, Fut>(runtime: &Handle, id: TaskId, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let join = runtime.spawn(body(cancel.clone()));
        Self {
            id,
            cancel,
            join,
            runtime: runtime.clone(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Ask the task to stop.  Non-blocking and idempotent.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` until the task body has returned.
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Block the calling thread until the task finishes or `timeout`
    /// elapses.  Returns `true` if the task finished.
    ///
    /// Off the runtime (the UI thread) this blocks on the join handle.
    /// `block_on` panics inside a runtime context, so callers already on a
    /// runtime worker fall back to polling `is_finished`.
    pub fn await_termination(&mut self, timeout: Duration) -> bool {
        if !self.is_running() {
            return true;
        }
        if Handle::try_current().is_err() {
            let join = &mut self.join;
            return self
                .runtime
                .block_on(async move { tokio::time::timeout(timeout, join).await.is_ok() });
        }
        self.poll_until_finished(timeout)
    }

    fn poll_until_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
        true
    }
}
