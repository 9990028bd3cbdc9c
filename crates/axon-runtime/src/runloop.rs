//! The per-owner task loop.
//!
//! Every logical owner in axon — the app, each engine, each
//! externally-threaded protocol implementation — runs one cooperative
//! loop. Cross-owner coordination happens exclusively by posting tasks
//! onto the target owner's loop; nothing in the runtime polls shared
//! memory.
//!
//! # Contract and default
//!
//! The runtime consumes loops through the [`Runloop`] trait: post to
//! the back, post to the front (control/priority path), pending count,
//! liveness. [`TaskLoop`] is the shipped default, a tokio task draining
//! two queues with the front queue prioritized:
//!
//! ```text
//!            post_front ──► ┌─────────────────┐
//!                           │    TaskLoop     │
//!            post ────────► │  (biased select)│──► task() ...
//!                           └─────────────────┘
//! ```
//!
//! # Ordering
//!
//! Tasks posted to one queue execute in post order. The front queue
//! preempts the back queue between tasks, never mid-task.
//!
//! # Lifetime
//!
//! A `TaskLoop` runs until [`LoopHandle::stop`] is called (the loop
//! keeps a handle to itself for [`LoopHandle::current`], so it does not
//! exit merely because external handles were dropped). Stopping is part
//! of the close protocol; see the close graph module.

use axon_types::ErrorCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// A unit of work posted onto a loop.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The runloop contract the runtime consumes.
///
/// The runtime depends only on these semantics, not on any concrete
/// event-loop implementation.
pub trait Runloop: Send + Sync {
    /// Posts a task to the back of the queue.
    ///
    /// # Errors
    ///
    /// [`LoopError::Gone`] when the loop has stopped.
    fn post(&self, task: Task) -> Result<(), LoopError>;

    /// Posts a task to the priority front queue.
    ///
    /// # Errors
    ///
    /// [`LoopError::Gone`] when the loop has stopped.
    fn post_front(&self, task: Task) -> Result<(), LoopError>;

    /// Number of tasks posted but not yet executed.
    fn pending(&self) -> usize;

    /// Returns `true` while the loop is accepting tasks.
    fn alive(&self) -> bool;
}

/// Runloop layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    /// The target loop has stopped; the task was dropped.
    ///
    /// **Not recoverable** - a stopped loop never restarts.
    #[error("target loop has stopped")]
    Gone,
}

impl ErrorCode for LoopError {
    fn code(&self) -> &'static str {
        match self {
            Self::Gone => "LOOP_GONE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

enum Item {
    Run(Task),
    Stop,
}

tokio::task_local! {
    static CURRENT_LOOP: LoopHandle;
}

/// The shipped cooperative loop; see the module docs.
pub struct TaskLoop {
    front_rx: mpsc::UnboundedReceiver<Item>,
    back_rx: mpsc::UnboundedReceiver<Item>,
    handle: LoopHandle,
}

impl TaskLoop {
    /// Creates a loop and its posting handle without running it.
    #[must_use]
    pub fn new() -> (TaskLoop, LoopHandle) {
        let (front_tx, front_rx) = mpsc::unbounded_channel();
        let (back_tx, back_rx) = mpsc::unbounded_channel();
        let handle = LoopHandle {
            front_tx,
            back_tx,
            pending: Arc::new(AtomicUsize::new(0)),
        };
        (
            TaskLoop {
                front_rx,
                back_rx,
                handle: handle.clone(),
            },
            handle,
        )
    }

    /// Creates a loop, spawns it on the tokio runtime, returns the handle.
    #[must_use]
    pub fn spawn() -> LoopHandle {
        let (task_loop, handle) = Self::new();
        tokio::spawn(task_loop.run());
        handle
    }

    /// Runs the loop until stopped.
    pub async fn run(mut self) {
        let handle = self.handle.clone();
        CURRENT_LOOP
            .scope(handle, async move {
                debug!("task loop started");
                loop {
                    let item = tokio::select! {
                        // Control/priority tasks first.
                        biased;
                        item = self.front_rx.recv() => item,
                        item = self.back_rx.recv() => item,
                    };
                    match item {
                        Some(Item::Run(task)) => {
                            self.handle.pending.fetch_sub(1, Ordering::Relaxed);
                            task();
                        }
                        Some(Item::Stop) | None => break,
                    }
                }
                debug!("task loop stopped");
            })
            .await;
    }
}

/// Cloneable posting handle of a [`TaskLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    front_tx: mpsc::UnboundedSender<Item>,
    back_tx: mpsc::UnboundedSender<Item>,
    pending: Arc<AtomicUsize>,
}

impl LoopHandle {
    /// The handle of the loop the calling task runs on, if any.
    #[must_use]
    pub fn current() -> Option<LoopHandle> {
        CURRENT_LOOP.try_with(LoopHandle::clone).ok()
    }

    /// Stops the loop after the task it is currently running.
    ///
    /// Stop travels on the priority queue, so it preempts queued
    /// back-queue tasks.
    pub fn stop(&self) {
        let _ = self.front_tx.send(Item::Stop);
    }

    /// Schedules tasks produced by `make_task` every `interval`.
    ///
    /// Fires `times` times (`None` = until cancelled), posting each
    /// produced task to the back of this loop. Dropping the returned
    /// [`TimerHandle`] detaches the timer; call
    /// [`cancel`](TimerHandle::cancel) to stop it.
    pub fn schedule<F>(&self, interval: Duration, times: Option<u64>, mut make_task: F) -> TimerHandle
    where
        F: FnMut() -> Task + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let handle = self.clone();
        tokio::spawn(async move {
            let mut fired: u64 = 0;
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    () = tokio::time::sleep(interval) => {
                        if handle.post(make_task()).is_err() {
                            break;
                        }
                        fired += 1;
                        if times.is_some_and(|t| fired >= t) {
                            break;
                        }
                    }
                }
            }
        });
        TimerHandle {
            cancel: Some(cancel_tx),
        }
    }

    fn send(&self, tx: &mpsc::UnboundedSender<Item>, task: Task) -> Result<(), LoopError> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        if tx.send(Item::Run(task)).is_err() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(LoopError::Gone);
        }
        Ok(())
    }
}

impl Runloop for LoopHandle {
    fn post(&self, task: Task) -> Result<(), LoopError> {
        self.send(&self.back_tx, task)
    }

    fn post_front(&self, task: Task) -> Result<(), LoopError> {
        self.send(&self.front_tx, task)
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    fn alive(&self) -> bool {
        !self.back_tx.is_closed()
    }
}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("pending", &self.pending())
            .field("alive", &self.alive())
            .finish()
    }
}

/// Cancellation handle of a scheduled timer.
#[derive(Debug)]
pub struct TimerHandle {
    cancel: Option<oneshot::Sender<()>>,
}

impl TimerHandle {
    /// Stops the timer. Tasks already posted still run.
    pub fn cancel(mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Task) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let make = move |n: u32| -> Task {
            let seen = seen2.clone();
            Box::new(move || seen.lock().unwrap().push(n))
        };
        (seen, make)
    }

    #[tokio::test]
    async fn tasks_run_in_post_order() {
        let handle = TaskLoop::spawn();
        let (seen, task) = recorder();

        for n in 0..10 {
            handle.post(task(n)).unwrap();
        }
        let (done_tx, done_rx) = oneshot::channel();
        handle
            .post(Box::new(move || done_tx.send(()).unwrap()))
            .unwrap();
        done_rx.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
        handle.stop();
    }

    #[tokio::test]
    async fn front_tasks_preempt_back_tasks() {
        let (task_loop, handle) = TaskLoop::new();
        let (seen, task) = recorder();

        // Queue everything before the loop starts draining.
        handle.post(task(1)).unwrap();
        handle.post(task(2)).unwrap();
        handle.post_front(task(0)).unwrap();
        handle.stop();

        task_loop.run().await;

        // Stop is also a front item posted after 0, so 0 runs, then stop.
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn stop_prevents_further_tasks() {
        let handle = TaskLoop::spawn();
        let (seen, task) = recorder();

        handle.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(handle.post(task(1)).is_err());
        assert!(!handle.alive());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_counts_unexecuted_tasks() {
        let (task_loop, handle) = TaskLoop::new();
        let (_seen, task) = recorder();

        handle.post(task(1)).unwrap();
        handle.post(task(2)).unwrap();
        assert_eq!(handle.pending(), 2);

        let stopper = handle.clone();
        handle.post(Box::new(move || stopper.stop())).unwrap();
        task_loop.run().await;
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn current_loop_is_visible_from_tasks() {
        let handle = TaskLoop::spawn();
        let (tx, rx) = oneshot::channel();

        handle
            .post(Box::new(move || {
                tx.send(LoopHandle::current().is_some()).unwrap();
            }))
            .unwrap();

        assert!(rx.await.unwrap());
        assert!(LoopHandle::current().is_none());
        handle.stop();
    }

    #[tokio::test]
    async fn repeating_timer_fires_requested_times() {
        let handle = TaskLoop::spawn();
        let (seen, task) = recorder();

        let make = move || task(7);
        let _timer = handle.schedule(Duration::from_millis(5), Some(3), make);

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop();

        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_timer_stops_firing() {
        let handle = TaskLoop::spawn();
        let (seen, task) = recorder();

        let make = move || task(7);
        let timer = handle.schedule(Duration::from_millis(10), None, make);

        tokio::time::sleep(Duration::from_millis(35)).await;
        timer.cancel();
        let fired = seen.lock().unwrap().len();
        assert!(fired >= 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        // No further firings after cancel (allow the one already queued).
        assert!(seen.lock().unwrap().len() <= fired + 1);
        handle.stop();
    }
}
