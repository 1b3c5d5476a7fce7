//! Fan-out of one value to every registered successor.

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::edge::{Receiver, Sender, WeakReceiver, WeakSender};
use crate::lock;

/// A node that copies every incoming value to all of its successors.
///
/// Delivery is fire-and-forget: refusals are ignored and nothing is
/// buffered, so `try_put` always accepts. The node never yields a value on
/// the pull side; instead, a `try_get` requester joins the fan-out list
/// permanently and receives every subsequent value, exactly as if it had
/// been registered with an edge. Poll-style receivers can therefore attach
/// themselves on demand.
pub struct BroadcastNode<T: Clone + Send + 'static> {
  name: Option<String>,
  successors: Mutex<Vec<WeakReceiver<T>>>,
}

impl<T: Clone + Send + 'static> BroadcastNode<T> {
  pub fn new() -> Arc<Self> {
    Self::build(None)
  }

  pub fn named(name: impl Into<String>) -> Arc<Self> {
    Self::build(Some(name.into()))
  }

  fn build(name: Option<String>) -> Arc<Self> {
    Arc::new(BroadcastNode {
      name,
      successors: Mutex::new(Vec::new()),
    })
  }

  fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("broadcast")
  }
}

impl<T: Clone + Send + 'static> Receiver<T> for BroadcastNode<T> {
  fn try_put(&self, value: T, _source: Option<WeakSender<T>>) -> Result<(), T> {
    let mut successors = lock(&self.successors);
    successors.retain(|entry| match entry.upgrade() {
      Some(successor) => {
        let _ = successor.try_put(value.clone(), None);
        true
      }
      None => false,
    });
    trace!("{}: value fanned out to {} successors", self.label(), successors.len());
    Ok(())
  }
}

impl<T: Clone + Send + 'static> Sender<T> for BroadcastNode<T> {
  fn try_get(&self, requester: Option<WeakReceiver<T>>) -> Option<T> {
    if let Some(requester) = requester {
      lock(&self.successors).push(requester);
      trace!("{}: requester joined the fan-out list", self.label());
    }
    None
  }

  fn register_successor(&self, successor: WeakReceiver<T>) {
    lock(&self.successors).push(successor);
  }
}
