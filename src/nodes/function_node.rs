//! One-in, one-out transformation on executor tasks.

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::cache::{PredecessorCache, SuccessorCache};
use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::executor::Executor;
use crate::lock;

/// A node that applies `f(input) -> output` asynchronously.
///
/// The node is in one of three states:
///
/// - **idle** — nothing pending; an incoming value is accepted and a worker
///   is spawned on it;
/// - **active** — a worker is running (or hunting for its next input); new
///   values are refused and their producers cached;
/// - **full** — a finished output could not be delivered and is parked;
///   everything is refused until a consumer pulls it.
///
/// One worker runs at a time, so outputs leave in the order inputs were
/// accepted.
pub struct FunctionNode<I, O, F>
where
  I: Send + 'static,
  O: Send + 'static,
  F: FnMut(I) -> O + Send + 'static,
{
  name: Option<String>,
  executor: Arc<dyn Executor>,
  body: Mutex<F>,
  self_weak: Weak<FunctionNode<I, O, F>>,
  state: Mutex<FunctionState<I, O>>,
}

struct FunctionState<I, O>
where
  I: Send + 'static,
  O: Send + 'static,
{
  active: bool,
  value: Option<O>,
  successors: SuccessorCache<O>,
  predecessors: PredecessorCache<I>,
}

impl<I, O, F> FunctionNode<I, O, F>
where
  I: Send + 'static,
  O: Send + 'static,
  F: FnMut(I) -> O + Send + 'static,
{
  pub fn new(executor: Arc<dyn Executor>, body: F) -> Arc<Self> {
    Self::build(None, executor, body)
  }

  pub fn named(name: impl Into<String>, executor: Arc<dyn Executor>, body: F) -> Arc<Self> {
    Self::build(Some(name.into()), executor, body)
  }

  fn build(name: Option<String>, executor: Arc<dyn Executor>, body: F) -> Arc<Self> {
    Arc::new_cyclic(|weak: &Weak<FunctionNode<I, O, F>>| {
      let owner: WeakSender<O> = weak.clone();
      FunctionNode {
        name,
        executor,
        body: Mutex::new(body),
        self_weak: weak.clone(),
        state: Mutex::new(FunctionState {
          active: false,
          value: None,
          successors: SuccessorCache::new(owner),
          predecessors: PredecessorCache::new(),
        }),
      }
    })
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("function")
  }

  fn weak_receiver(&self) -> WeakReceiver<I> {
    let weak: WeakReceiver<I> = self.self_weak.clone();
    weak
  }

  fn spawn_worker(&self, input: I) {
    let node = self.self_weak.clone();
    self.executor.run(Box::new(move || {
      let Some(node) = node.upgrade() else {
        return;
      };
      node.run_worker(input);
    }));
  }

  fn run_worker(&self, input: I) {
    let output = {
      let mut body = lock(&self.body);
      (*body)(input)
    };
    let mut state = lock(&self.state);
    match state.successors.try_put(output) {
      Ok(()) => {
        // Still active: the worker slot stays claimed while we look for the
        // next input.
        drop(state);
        self.get_and_spawn();
      }
      Err(output) => {
        trace!("{}: output parked, node full", self.label());
        state.value = Some(output);
        state.active = false;
      }
    }
  }

  /// Pull the next input from the cached producers and spawn a worker on it,
  /// or drop to idle. Runs with the worker slot claimed (`active == true`)
  /// and crosses edges with no lock held.
  fn get_and_spawn(&self) {
    loop {
      let mut detached = {
        let mut state = lock(&self.state);
        if state.predecessors.is_empty() {
          trace!("{}: no input pending, idling", self.label());
          state.active = false;
          return;
        }
        state.predecessors.detach()
      };
      while let Some(entry) = detached.pop_front() {
        let Some(predecessor) = entry.upgrade() else {
          continue;
        };
        if let Some(input) = predecessor.try_get(Some(self.weak_receiver())) {
          lock(&self.state).predecessors.reattach(entry, detached);
          self.spawn_worker(input);
          return;
        }
      }
    }
  }
}

impl<I, O, F> Receiver<I> for FunctionNode<I, O, F>
where
  I: Send + 'static,
  O: Send + 'static,
  F: FnMut(I) -> O + Send + 'static,
{
  fn try_put(&self, value: I, source: Option<WeakSender<I>>) -> Result<(), I> {
    let mut state = lock(&self.state);
    if state.active || state.value.is_some() {
      if let Some(source) = source {
        state.predecessors.add(source);
        trace!("{}: busy, producer cached", self.label());
      }
      return Err(value);
    }
    state.active = true;
    drop(state);
    self.spawn_worker(value);
    Ok(())
  }
}

impl<I, O, F> Sender<O> for FunctionNode<I, O, F>
where
  I: Send + 'static,
  O: Send + 'static,
  F: FnMut(I) -> O + Send + 'static,
{
  fn try_get(&self, requester: Option<WeakReceiver<O>>) -> Option<O> {
    let mut state = lock(&self.state);
    match state.value.take() {
      Some(value) => {
        if !state.active {
          state.active = true;
          drop(state);
          self.get_and_spawn();
        }
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

  fn register_successor(&self, successor: WeakReceiver<O>) {
    lock(&self.state).successors.add(successor);
  }
}
