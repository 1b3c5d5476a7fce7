//! Latch node: holds the most recent value for any number of readers.

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::lock;

/// A node that latches the latest value it was handed.
///
/// `try_put` first fans the value out to every registered successor (naming
/// itself as the source, so a busy successor can come back and pull the
/// latched copy later), then overwrites the held value. `try_get` clones the
/// latched value without clearing it — once the latch is set, every read
/// succeeds until the next overwrite replaces the value.
///
/// Requesters cached by an empty `try_get` join the successor list
/// permanently, like on a broadcast node.
pub struct OverwriteNode<T: Clone + Send + 'static> {
  name: Option<String>,
  self_weak: Weak<OverwriteNode<T>>,
  state: Mutex<OverwriteState<T>>,
}

struct OverwriteState<T> {
  successors: Vec<WeakReceiver<T>>,
  value: Option<T>,
}

impl<T: Clone + Send + 'static> OverwriteNode<T> {
  pub fn new() -> Arc<Self> {
    Self::build(None)
  }

  pub fn named(name: impl Into<String>) -> Arc<Self> {
    Self::build(Some(name.into()))
  }

  fn build(name: Option<String>) -> Arc<Self> {
    Arc::new_cyclic(|weak| OverwriteNode {
      name,
      self_weak: weak.clone(),
      state: Mutex::new(OverwriteState {
        successors: Vec::new(),
        value: None,
      }),
    })
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("overwrite")
  }
}

impl<T: Clone + Send + 'static> Receiver<T> for OverwriteNode<T> {
  fn try_put(&self, value: T, _source: Option<WeakSender<T>>) -> Result<(), T> {
    let mut state = lock(&self.state);
    let source: WeakSender<T> = self.self_weak.clone();
    state.successors.retain(|entry| match entry.upgrade() {
      Some(successor) => {
        let _ = successor.try_put(value.clone(), Some(source.clone()));
        true
      }
      None => false,
    });
    trace!("{}: value latched", self.label());
    state.value = Some(value);
    Ok(())
  }
}

impl<T: Clone + Send + 'static> Sender<T> for OverwriteNode<T> {
  fn try_get(&self, requester: Option<WeakReceiver<T>>) -> Option<T> {
    let mut state = lock(&self.state);
    match &state.value {
      Some(value) => Some(value.clone()),
      None => {
        if let Some(requester) = requester {
          state.successors.push(requester);
          trace!("{}: not latched yet, requester cached", self.label());
        }
        None
      }
    }
  }

  fn register_successor(&self, successor: WeakReceiver<T>) {
    lock(&self.state).successors.push(successor);
  }
}
