//! One-in, many-out transformation: each input yields a lazy sequence.

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::cache::{PredecessorCache, SuccessorCache};
use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::executor::Executor;
use crate::lock;

/// A node whose body turns one input into a sequence of outputs.
///
/// For each accepted input `i`, the generator body is called once to produce
/// a *step* closure; the step is then called repeatedly on executor tasks,
/// yielding `Some(output)` until the sequence is exhausted (`None`). Outputs
/// of one input are delivered in yield order, inputs are consumed in arrival
/// order, and exactly one worker task is in flight at a time.
///
/// The node shares the idle/active/full shape of
/// [`FunctionNode`](crate::nodes::FunctionNode): a refused output parks on
/// the node (full) until a consumer pulls it, after which the still-bound
/// step resumes where it left off. The step only runs inside workers, and is
/// only bound or unbound under the node lock.
pub struct GeneratorNode<I, O, G, S>
where
  I: Send + 'static,
  O: Send + 'static,
  G: FnMut(I) -> S + Send + 'static,
  S: FnMut() -> Option<O> + Send + 'static,
{
  name: Option<String>,
  executor: Arc<dyn Executor>,
  body: Mutex<G>,
  self_weak: Weak<GeneratorNode<I, O, G, S>>,
  state: Mutex<GeneratorState<I, O, S>>,
}

struct GeneratorState<I, O, S>
where
  I: Send + 'static,
  O: Send + 'static,
  S: FnMut() -> Option<O> + Send + 'static,
{
  active: bool,
  step: Option<S>,
  value: Option<O>,
  successors: SuccessorCache<O>,
  predecessors: PredecessorCache<I>,
}

impl<I, O, G, S> GeneratorNode<I, O, G, S>
where
  I: Send + 'static,
  O: Send + 'static,
  G: FnMut(I) -> S + Send + 'static,
  S: FnMut() -> Option<O> + Send + 'static,
{
  pub fn new(executor: Arc<dyn Executor>, body: G) -> Arc<Self> {
    Self::build(None, executor, body)
  }

  pub fn named(name: impl Into<String>, executor: Arc<dyn Executor>, body: G) -> Arc<Self> {
    Self::build(Some(name.into()), executor, body)
  }

  fn build(name: Option<String>, executor: Arc<dyn Executor>, body: G) -> Arc<Self> {
    Arc::new_cyclic(|weak: &Weak<GeneratorNode<I, O, G, S>>| {
      let owner: WeakSender<O> = weak.clone();
      GeneratorNode {
        name,
        executor,
        body: Mutex::new(body),
        self_weak: weak.clone(),
        state: Mutex::new(GeneratorState {
          active: false,
          step: None,
          value: None,
          successors: SuccessorCache::new(owner),
          predecessors: PredecessorCache::new(),
        }),
      }
    })
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("generator")
  }

  fn weak_receiver(&self) -> WeakReceiver<I> {
    let weak: WeakReceiver<I> = self.self_weak.clone();
    weak
  }

  fn spawn_worker(&self) {
    let node = self.self_weak.clone();
    self.executor.run(Box::new(move || {
      let Some(node) = node.upgrade() else {
        return;
      };
      node.run_worker();
    }));
  }

  fn run_worker(&self) {
    // Take the step out so it runs without the node lock held; with a single
    // worker in flight nobody else can observe the gap.
    let step = lock(&self.state).step.take();
    let Some(mut step) = step else {
      self.get_and_spawn();
      return;
    };
    match step() {
      Some(value) => {
        let mut state = lock(&self.state);
        state.step = Some(step);
        match state.successors.try_put(value) {
          Ok(()) => {
            drop(state);
            self.spawn_worker();
          }
          Err(value) => {
            trace!("{}: output parked, node full", self.label());
            state.value = Some(value);
            state.active = false;
          }
        }
      }
      None => {
        trace!("{}: sequence exhausted", self.label());
        self.get_and_spawn();
      }
    }
  }

  /// Pull the next input from the cached producers, bind a fresh step on it
  /// and spawn a worker — or drop to idle. Runs with the worker slot claimed
  /// (`active == true`) and crosses edges with no lock held.
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
          let step = {
            let mut body = lock(&self.body);
            (*body)(input)
          };
          let mut state = lock(&self.state);
          debug_assert!(state.step.is_none());
          state.step = Some(step);
          state.predecessors.reattach(entry, detached);
          drop(state);
          self.spawn_worker();
          return;
        }
      }
    }
  }
}

impl<I, O, G, S> Receiver<I> for GeneratorNode<I, O, G, S>
where
  I: Send + 'static,
  O: Send + 'static,
  G: FnMut(I) -> S + Send + 'static,
  S: FnMut() -> Option<O> + Send + 'static,
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
    debug_assert!(state.step.is_none());
    state.active = true;
    drop(state);
    let step = {
      let mut body = lock(&self.body);
      (*body)(value)
    };
    lock(&self.state).step = Some(step);
    self.spawn_worker();
    Ok(())
  }
}

impl<I, O, G, S> Sender<O> for GeneratorNode<I, O, G, S>
where
  I: Send + 'static,
  O: Send + 'static,
  G: FnMut(I) -> S + Send + 'static,
  S: FnMut() -> Option<O> + Send + 'static,
{
  fn try_get(&self, requester: Option<WeakReceiver<O>>) -> Option<O> {
    let mut state = lock(&self.state);
    match state.value.take() {
      Some(value) => {
        if !state.active {
          // Resume: the worker continues the still-bound step, or hunts for
          // the next input if the sequence already ended.
          state.active = true;
          drop(state);
          self.spawn_worker();
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
