//! Unbounded FIFO buffering between a producer and a consumer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::cache::SuccessorCache;
use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::lock;

/// An unbounded FIFO node.
///
/// `try_put` always accepts. If a consumer is already waiting (cached by an
/// earlier empty `try_get`), the value is handed straight through and never
/// touches the buffer; otherwise it joins the tail. `try_get` pops the head
/// or, when the buffer is empty, caches the requester for the fast path.
///
/// The two sides are mutually exclusive in steady state: a non-empty buffer
/// means nobody is waiting, and a waiting consumer means there is nothing
/// buffered to give it.
pub struct QueueNode<T: Send + 'static> {
  name: Option<String>,
  state: Mutex<QueueState<T>>,
}

struct QueueState<T: Send + 'static> {
  fifo: VecDeque<T>,
  waiters: SuccessorCache<T>,
}

impl<T: Send + 'static> QueueNode<T> {
  pub fn new() -> Arc<Self> {
    Self::build(None)
  }

  pub fn named(name: impl Into<String>) -> Arc<Self> {
    Self::build(Some(name.into()))
  }

  fn build(name: Option<String>) -> Arc<Self> {
    Arc::new_cyclic(|weak: &Weak<QueueNode<T>>| {
      let owner: WeakSender<T> = weak.clone();
      QueueNode {
        name,
        state: Mutex::new(QueueState {
          fifo: VecDeque::new(),
          waiters: SuccessorCache::new(owner),
        }),
      }
    })
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("queue")
  }
}

impl<T: Send + 'static> Receiver<T> for QueueNode<T> {
  fn try_put(&self, value: T, _source: Option<WeakSender<T>>) -> Result<(), T> {
    let mut state = lock(&self.state);
    match state.waiters.try_put(value) {
      Ok(()) => {
        // The fast path only exists while the buffer is empty; a waiter with
        // buffered values ahead of it would break FIFO order.
        debug_assert!(state.fifo.is_empty());
        trace!("{}: value handed straight to a waiter", self.label());
      }
      Err(value) => {
        state.fifo.push_back(value);
        trace!("{}: value buffered (depth {})", self.label(), state.fifo.len());
      }
    }
    Ok(())
  }
}

impl<T: Send + 'static> Sender<T> for QueueNode<T> {
  fn try_get(&self, requester: Option<WeakReceiver<T>>) -> Option<T> {
    let mut state = lock(&self.state);
    match state.fifo.pop_front() {
      Some(value) => Some(value),
      None => {
        if let Some(requester) = requester {
          state.waiters.add(requester);
          trace!("{}: empty, requester cached", self.label());
        }
        None
      }
    }
  }

  fn register_successor(&self, successor: WeakReceiver<T>) {
    lock(&self.state).waiters.add(successor);
  }
}
