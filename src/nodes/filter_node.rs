//! Predicate sieve over a stream of values.

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::cache::{PredecessorCache, SuccessorCache};
use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::lock;

/// A node that forwards values satisfying a predicate and drops the rest.
///
/// A value that fails the predicate is *accepted* and discarded — from the
/// producer's point of view it was delivered. A passing value is forwarded
/// to a waiting successor if there is one; otherwise the put is refused and
/// the producer is cached, to be pulled from when a consumer shows up.
///
/// On the pull side the filter keeps draining its cached producers until one
/// of them yields a passing value, discarding failures along the way.
pub struct FilterNode<T, P>
where
  T: Send + 'static,
  P: Fn(&T) -> bool + Send + Sync + 'static,
{
  name: Option<String>,
  predicate: P,
  self_weak: Weak<FilterNode<T, P>>,
  state: Mutex<FilterState<T>>,
}

struct FilterState<T: Send + 'static> {
  successors: SuccessorCache<T>,
  predecessors: PredecessorCache<T>,
}

impl<T, P> FilterNode<T, P>
where
  T: Send + 'static,
  P: Fn(&T) -> bool + Send + Sync + 'static,
{
  pub fn new(predicate: P) -> Arc<Self> {
    Self::build(None, predicate)
  }

  pub fn named(name: impl Into<String>, predicate: P) -> Arc<Self> {
    Self::build(Some(name.into()), predicate)
  }

  fn build(name: Option<String>, predicate: P) -> Arc<Self> {
    Arc::new_cyclic(|weak: &Weak<FilterNode<T, P>>| {
      let owner: WeakSender<T> = weak.clone();
      FilterNode {
        name,
        predicate,
        self_weak: weak.clone(),
        state: Mutex::new(FilterState {
          successors: SuccessorCache::new(owner),
          predecessors: PredecessorCache::new(),
        }),
      }
    })
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("filter")
  }

  fn weak_receiver(&self) -> WeakReceiver<T> {
    let weak: WeakReceiver<T> = self.self_weak.clone();
    weak
  }
}

impl<T, P> Receiver<T> for FilterNode<T, P>
where
  T: Send + 'static,
  P: Fn(&T) -> bool + Send + Sync + 'static,
{
  fn try_put(&self, value: T, source: Option<WeakSender<T>>) -> Result<(), T> {
    if !(self.predicate)(&value) {
      trace!("{}: value dropped by predicate", self.label());
      return Ok(());
    }
    let mut state = lock(&self.state);
    match state.successors.try_put(value) {
      Ok(()) => Ok(()),
      Err(value) => {
        if let Some(source) = source {
          state.predecessors.add(source);
          trace!("{}: no consumer ready, producer cached", self.label());
        }
        Err(value)
      }
    }
  }
}

impl<T, P> Sender<T> for FilterNode<T, P>
where
  T: Send + 'static,
  P: Fn(&T) -> bool + Send + Sync + 'static,
{
  fn try_get(&self, mut requester: Option<WeakReceiver<T>>) -> Option<T> {
    loop {
      // The emptiness check and the requester registration share one
      // critical section, so a producer refused during the walk below is
      // either seen by the next round or finds the requester already cached.
      let mut detached = {
        let mut state = lock(&self.state);
        if state.predecessors.is_empty() {
          if let Some(requester) = requester.take() {
            state.successors.add(requester);
            trace!("{}: nothing to pull, requester cached", self.label());
          }
          return None;
        }
        state.predecessors.detach()
      };
      while let Some(entry) = detached.pop_front() {
        let Some(predecessor) = entry.upgrade() else {
          continue;
        };
        while let Some(value) = predecessor.try_get(Some(self.weak_receiver())) {
          if (self.predicate)(&value) {
            lock(&self.state).predecessors.reattach(entry, detached);
            return Some(value);
          }
          trace!("{}: pulled value dropped by predicate", self.label());
        }
      }
    }
  }

  fn register_successor(&self, successor: WeakReceiver<T>) {
    lock(&self.state).successors.add(successor);
  }
}
