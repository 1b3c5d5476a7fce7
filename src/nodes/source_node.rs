//! Pipeline head: drives values out of a body closure, demand-limited.

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, trace};

use crate::cache::SuccessorCache;
use crate::edge::{Sender, WeakReceiver, WeakSender};
use crate::executor::Executor;
use crate::lock;

/// A node that produces values by polling a body on executor tasks.
///
/// The body returns `Some(value)` for each value and `None` at end of
/// stream. Call [`activate`](Self::activate) once, after wiring, to start
/// the task chain. Each task polls the body once; an accepted value spawns
/// the next task, a refused value parks on the node (there is never more
/// than one parked value) and the chain resumes when a consumer pulls it.
/// The output rate is therefore limited by downstream demand, and at most
/// one task per source is ever in flight.
pub struct SourceNode<T, B>
where
  T: Send + 'static,
  B: FnMut() -> Option<T> + Send + 'static,
{
  name: Option<String>,
  executor: Arc<dyn Executor>,
  body: Mutex<B>,
  self_weak: Weak<SourceNode<T, B>>,
  state: Mutex<SourceState<T>>,
}

struct SourceState<T: Send + 'static> {
  successors: SuccessorCache<T>,
  value: Option<T>,
}

impl<T, B> SourceNode<T, B>
where
  T: Send + 'static,
  B: FnMut() -> Option<T> + Send + 'static,
{
  pub fn new(executor: Arc<dyn Executor>, body: B) -> Arc<Self> {
    Self::build(None, executor, body)
  }

  pub fn named(name: impl Into<String>, executor: Arc<dyn Executor>, body: B) -> Arc<Self> {
    Self::build(Some(name.into()), executor, body)
  }

  fn build(name: Option<String>, executor: Arc<dyn Executor>, body: B) -> Arc<Self> {
    Arc::new_cyclic(|weak: &Weak<SourceNode<T, B>>| {
      let owner: WeakSender<T> = weak.clone();
      SourceNode {
        name,
        executor,
        body: Mutex::new(body),
        self_weak: weak.clone(),
        state: Mutex::new(SourceState {
          successors: SuccessorCache::new(owner),
          value: None,
        }),
      }
    })
  }

  /// Start the task chain. Call once, after the graph is wired.
  pub fn activate(&self) {
    self.spawn_next();
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("source")
  }

  fn spawn_next(&self) {
    let node = self.self_weak.clone();
    self.executor.run(Box::new(move || {
      let Some(node) = node.upgrade() else {
        return;
      };
      node.drive_once();
    }));
  }

  fn drive_once(&self) {
    // The body runs outside the node lock; it may take its time.
    let next = {
      let mut body = lock(&self.body);
      (*body)()
    };
    let Some(value) = next else {
      debug!("{}: end of stream, halting", self.label());
      return;
    };
    let mut state = lock(&self.state);
    match state.successors.try_put(value) {
      Ok(()) => {
        trace!("{}: value delivered, driving next", self.label());
        self.spawn_next();
      }
      Err(value) => {
        trace!("{}: no consumer ready, value parked", self.label());
        debug_assert!(state.value.is_none());
        state.value = Some(value);
      }
    }
  }
}

impl<T, B> Sender<T> for SourceNode<T, B>
where
  T: Send + 'static,
  B: FnMut() -> Option<T> + Send + 'static,
{
  fn try_get(&self, requester: Option<WeakReceiver<T>>) -> Option<T> {
    let mut state = lock(&self.state);
    match state.value.take() {
      Some(value) => {
        trace!("{}: parked value released, driving next", self.label());
        self.spawn_next();
        Some(value)
      }
      None => {
        if let Some(requester) = requester {
          state.successors.add(requester);
        }
        None
      }
    }
  }

  fn register_successor(&self, successor: WeakReceiver<T>) {
    lock(&self.state).successors.add(successor);
  }
}
