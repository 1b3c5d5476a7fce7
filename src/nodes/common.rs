//! Test doubles shared by the node test suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::error::ExecutorError;
use crate::executor::Executor;
use crate::lock;

/// Deterministic executor: queues tasks and runs them only when the test
/// pumps it, so state machines can be stepped one transition at a time.
pub(crate) struct ManualExecutor {
  tasks: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
  wait_count: AtomicUsize,
}

impl ManualExecutor {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      tasks: Mutex::new(VecDeque::new()),
      wait_count: AtomicUsize::new(0),
    })
  }

  /// Run the oldest pending task, if any.
  pub fn run_one(&self) -> bool {
    // Pop before running: the task may enqueue followers.
    let task = lock(&self.tasks).pop_front();
    match task {
      Some(task) => {
        task();
        true
      }
      None => false,
    }
  }

  /// Run tasks until the queue stays empty; returns how many ran.
  pub fn run_all(&self) -> usize {
    let mut ran = 0;
    while self.run_one() {
      ran += 1;
    }
    ran
  }

  pub fn pending(&self) -> usize {
    lock(&self.tasks).len()
  }
}

impl Executor for ManualExecutor {
  fn run(&self, task: Box<dyn FnOnce() + Send>) {
    lock(&self.tasks).push_back(task);
  }

  fn wait_for_all(&self) -> Result<(), ExecutorError> {
    self.run_all();
    Ok(())
  }

  fn increment_wait_count(&self) {
    self.wait_count.fetch_add(1, Ordering::SeqCst);
  }

  fn decrement_wait_count(&self) {
    self.wait_count.fetch_sub(1, Ordering::SeqCst);
  }
}

/// Sink that accepts everything and remembers it.
pub(crate) struct CollectingSink<T> {
  values: Mutex<Vec<T>>,
}

impl<T> CollectingSink<T> {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      values: Mutex::new(Vec::new()),
    })
  }

  pub fn values(&self) -> Vec<T>
  where
    T: Clone,
  {
    lock(&self.values).clone()
  }
}

impl<T: Send + 'static> Receiver<T> for CollectingSink<T> {
  fn try_put(&self, value: T, _source: Option<WeakSender<T>>) -> Result<(), T> {
    lock(&self.values).push(value);
    Ok(())
  }
}

/// Sink that refuses the first `refusals` deliveries (recording the offered
/// source each time) and accepts everything after that.
pub(crate) struct RefusingSink<T> {
  refusals_left: Mutex<usize>,
  sources: Mutex<Vec<WeakSender<T>>>,
  values: Mutex<Vec<T>>,
}

impl<T> RefusingSink<T> {
  pub fn new(refusals: usize) -> Arc<Self> {
    Arc::new(Self {
      refusals_left: Mutex::new(refusals),
      sources: Mutex::new(Vec::new()),
      values: Mutex::new(Vec::new()),
    })
  }

  pub fn values(&self) -> Vec<T>
  where
    T: Clone,
  {
    lock(&self.values).clone()
  }

  pub fn offered_sources(&self) -> usize {
    lock(&self.sources).len()
  }

  pub fn sources(&self) -> Vec<WeakSender<T>> {
    lock(&self.sources).clone()
  }
}

impl<T: Send + 'static> Receiver<T> for RefusingSink<T> {
  fn try_put(&self, value: T, source: Option<WeakSender<T>>) -> Result<(), T> {
    let mut refusals_left = lock(&self.refusals_left);
    if *refusals_left > 0 {
      *refusals_left -= 1;
      if let Some(source) = source {
        lock(&self.sources).push(source);
      }
      return Err(value);
    }
    lock(&self.values).push(value);
    Ok(())
  }
}

/// Hand-cranked sender: yields a scripted sequence of values to pulls and
/// records requesters that asked while it was dry.
pub(crate) struct ManualSource<T> {
  values: Mutex<VecDeque<T>>,
  requests: Mutex<Vec<WeakReceiver<T>>>,
}

impl<T> ManualSource<T> {
  pub fn new(values: Vec<T>) -> Arc<Self> {
    Arc::new(Self {
      values: Mutex::new(values.into()),
      requests: Mutex::new(Vec::new()),
    })
  }

  pub fn request_count(&self) -> usize {
    lock(&self.requests).len()
  }
}

impl<T: Send + 'static> Sender<T> for ManualSource<T> {
  fn try_get(&self, requester: Option<WeakReceiver<T>>) -> Option<T> {
    match lock(&self.values).pop_front() {
      Some(value) => Some(value),
      None => {
        if let Some(requester) = requester {
          lock(&self.requests).push(requester);
        }
        None
      }
    }
  }

  fn register_successor(&self, _successor: WeakReceiver<T>) {
    // The test graphs never wire edges out of a scripted source.
  }
}

/// Downgrade a concrete receiver into the trait-object handle the protocol
/// passes around.
pub(crate) fn weak_receiver_of<T, R>(receiver: &Arc<R>) -> WeakReceiver<T>
where
  T: Send + 'static,
  R: Receiver<T> + 'static,
{
  let weak: Weak<R> = Arc::downgrade(receiver);
  weak
}

/// Downgrade a concrete sender into the trait-object handle the protocol
/// passes around.
pub(crate) fn weak_sender_of<T, S>(sender: &Arc<S>) -> WeakSender<T>
where
  T: Send + 'static,
  S: Sender<T> + 'static,
{
  let weak: Weak<S> = Arc::downgrade(sender);
  weak
}
