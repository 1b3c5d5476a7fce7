//! Task execution and the drain barrier.
//!
//! Nodes never spawn threads of their own; they hand closures to an
//! [`Executor`] and rely on `wait_for_all` to tell the program when the graph
//! has gone quiet. The bundled [`TokioExecutor`] runs tasks on a multi-thread
//! tokio runtime, but any scheduler that can honour the four-method contract
//! can drive a graph.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::error::ExecutorError;
use crate::lock;

/// A task-spawning facility with a drain barrier.
///
/// Tasks are zero-argument closures that run to completion on some worker
/// thread, possibly in parallel and out of submission order. A task that
/// needs to stall for a long time (waiting on I/O, say) should bracket the
/// stall with `increment_wait_count`/`decrement_wait_count` so that
/// `wait_for_all` knows the stall is deliberate.
pub trait Executor: Send + Sync {
  /// Enqueue `task` for asynchronous execution and return immediately.
  fn run(&self, task: Box<dyn FnOnce() + Send>);

  /// Block the calling thread until every submitted task has completed and
  /// no cooperative waiter remains, then surface the first task panic (if
  /// any) as an error.
  fn wait_for_all(&self) -> Result<(), ExecutorError>;

  /// Mark the presence of a cooperative waiter.
  fn increment_wait_count(&self);

  /// Unmark a cooperative waiter, waking the drain if it was the last one.
  fn decrement_wait_count(&self);
}

struct ExecutorCore {
  outstanding: Mutex<usize>,
  all_done: Condvar,
  wait_count: AtomicUsize,
  waiters_cleared: Notify,
  oversubscription: AtomicUsize,
  first_panic: Mutex<Option<String>>,
}

impl ExecutorCore {
  fn new() -> Self {
    Self {
      outstanding: Mutex::new(0),
      all_done: Condvar::new(),
      wait_count: AtomicUsize::new(0),
      waiters_cleared: Notify::new(),
      oversubscription: AtomicUsize::new(0),
      first_panic: Mutex::new(None),
    }
  }

  fn task_started(&self) {
    *lock(&self.outstanding) += 1;
  }

  fn task_finished(&self) {
    let mut outstanding = lock(&self.outstanding);
    *outstanding -= 1;
    if *outstanding == 0 {
      self.all_done.notify_all();
    }
  }

  fn join_all(&self) {
    let mut outstanding = lock(&self.outstanding);
    while *outstanding > 0 {
      outstanding = self
        .all_done
        .wait(outstanding)
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    }
  }

  /// Cooperatively await `wait_count == 0`. The `Notified` future is created
  /// before the counter is read so a concurrent decrement cannot slip
  /// between check and sleep.
  async fn await_waiters(&self) {
    loop {
      let cleared = self.waiters_cleared.notified();
      if self.wait_count.load(Ordering::SeqCst) == 0 {
        return;
      }
      cleared.await;
    }
  }

  fn record_panic(&self, message: String) {
    let mut first = lock(&self.first_panic);
    if first.is_none() {
      *first = Some(message);
    } else {
      warn!("additional task panic discarded: {}", message);
    }
  }

  fn take_panic(&self) -> Result<(), ExecutorError> {
    match lock(&self.first_panic).take() {
      Some(message) => Err(ExecutorError::TaskPanicked { message }),
      None => Ok(()),
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

/// [`Executor`] backed by a multi-thread tokio runtime.
///
/// `new` builds and owns a runtime; `with_handle` borrows an existing one.
/// Either way, `wait_for_all` must be called from outside the runtime's
/// worker threads — it blocks.
pub struct TokioExecutor {
  _runtime: Option<Runtime>,
  handle: Handle,
  core: Arc<ExecutorCore>,
}

impl TokioExecutor {
  pub fn new() -> Result<Self, ExecutorError> {
    let runtime = Builder::new_multi_thread()
      .thread_name("flowgraph-worker")
      .build()?;
    let handle = runtime.handle().clone();
    Ok(Self {
      _runtime: Some(runtime),
      handle,
      core: Arc::new(ExecutorCore::new()),
    })
  }

  /// Run tasks on a runtime owned by someone else.
  pub fn with_handle(handle: Handle) -> Self {
    Self {
      _runtime: None,
      handle,
      core: Arc::new(ExecutorCore::new()),
    }
  }

  /// Permit the scheduler to run more tasks than cores for the lifetime of
  /// the returned guard.
  ///
  /// Tokio has no oversubscription knob, so this is advisory: the count is
  /// maintained and visible through [`oversubscription`](Self::oversubscription),
  /// and nothing else changes. Schedulers that do expose the knob can honour
  /// the same contract.
  pub fn oversubscribe(&self) -> ScopedOversubscription {
    let depth = self.core.oversubscription.fetch_add(1, Ordering::SeqCst) + 1;
    trace!("oversubscription requested (depth {})", depth);
    ScopedOversubscription {
      core: Arc::clone(&self.core),
    }
  }

  /// Current depth of nested oversubscription scopes.
  pub fn oversubscription(&self) -> usize {
    self.core.oversubscription.load(Ordering::SeqCst)
  }
}

impl Executor for TokioExecutor {
  fn run(&self, task: Box<dyn FnOnce() + Send>) {
    self.core.task_started();
    let core = Arc::clone(&self.core);
    let _ = self.handle.spawn(async move {
      if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
        let message = panic_message(payload.as_ref());
        debug!("task panicked: {}", message);
        core.record_panic(message);
      }
      core.task_finished();
    });
  }

  fn wait_for_all(&self) -> Result<(), ExecutorError> {
    debug!("draining executor");
    // The drain sentinel counts as a task of its own: it cooperatively waits
    // until no cooperative waiter remains, and only then may the join below
    // observe an empty executor.
    self.core.task_started();
    let core = Arc::clone(&self.core);
    let _ = self.handle.spawn(async move {
      core.await_waiters().await;
      core.task_finished();
    });
    self.core.join_all();
    debug!("executor drained");
    self.core.take_panic()
  }

  fn increment_wait_count(&self) {
    self.core.wait_count.fetch_add(1, Ordering::SeqCst);
  }

  fn decrement_wait_count(&self) {
    let previous = self.core.wait_count.fetch_sub(1, Ordering::SeqCst);
    debug_assert!(previous > 0, "wait count underflow");
    if previous == 1 {
      self.core.waiters_cleared.notify_waiters();
    }
  }
}

/// RAII guard for an oversubscription scope; see
/// [`TokioExecutor::oversubscribe`].
pub struct ScopedOversubscription {
  core: Arc<ExecutorCore>,
}

impl Drop for ScopedOversubscription {
  fn drop(&mut self) {
    self.core.oversubscription.fetch_sub(1, Ordering::SeqCst);
  }
}
