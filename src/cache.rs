//! Retry caches for the two sides of an edge.
//!
//! When a handshake fails, the side that refused (or had nothing to give)
//! remembers the disappointed peer so it can call back later. A
//! [`SuccessorCache`] lives on the sender side and holds receivers that asked
//! and got nothing; a [`PredecessorCache`] lives on the receiver side and
//! holds senders whose delivery was refused.
//!
//! Both caches are walked in FIFO order. An entry that refuses the callback
//! (or whose node has been dropped) is removed; the first entry that
//! completes the handshake stays cached, and the walk stops there. A peer
//! that keeps accepting is therefore consulted first on every subsequent
//! round, which is what keeps a push-mode pipeline flowing without
//! re-registration.
//!
//! Pushes through a [`SuccessorCache`] happen inside the owning node's
//! critical section: deliveries only ever take locks downstream, which is
//! deadlock-free on an acyclic graph. Pulls must go the other way, so a
//! [`PredecessorCache`] is not walked in place — the owner detaches the
//! entries, releases its lock, crosses the edges bare-handed, and reattaches
//! the survivor afterwards.

use std::collections::VecDeque;

use crate::edge::{WeakReceiver, WeakSender};

/// Sender-side cache of receivers awaiting a value.
pub struct SuccessorCache<T: Send + 'static> {
  owner: WeakSender<T>,
  entries: VecDeque<WeakReceiver<T>>,
}

impl<T: Send + 'static> SuccessorCache<T> {
  /// Create an empty cache. `owner` is passed as the `source` of every
  /// callback so that a refusing receiver can find its way back.
  pub fn new(owner: WeakSender<T>) -> Self {
    Self {
      owner,
      entries: VecDeque::new(),
    }
  }

  pub fn add(&mut self, successor: WeakReceiver<T>) {
    self.entries.push_back(successor);
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Offer `value` to the cached receivers in FIFO order.
  ///
  /// Receivers that refuse are dropped from the cache; the first receiver
  /// that accepts stays cached and the walk stops. `Err` hands the value
  /// back when every entry refused or was gone.
  pub fn try_put(&mut self, mut value: T) -> Result<(), T> {
    while let Some(entry) = self.entries.pop_front() {
      let Some(successor) = entry.upgrade() else {
        continue;
      };
      match successor.try_put(value, Some(self.owner.clone())) {
        Ok(()) => {
          self.entries.push_front(entry);
          return Ok(());
        }
        Err(refused) => value = refused,
      }
    }
    Err(value)
  }
}

/// Receiver-side cache of senders whose delivery was refused.
///
/// The walk itself belongs to the owning node (see the module notes on lock
/// direction): `detach` surrenders the entries, and `reattach` restores the
/// successful one at the front, followed by the entries the walk never
/// consulted, followed by anything that arrived while the walk was out.
pub struct PredecessorCache<T: Send + 'static> {
  entries: VecDeque<WeakSender<T>>,
}

impl<T: Send + 'static> PredecessorCache<T> {
  pub fn new() -> Self {
    Self {
      entries: VecDeque::new(),
    }
  }

  pub fn add(&mut self, predecessor: WeakSender<T>) {
    self.entries.push_back(predecessor);
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Take the whole FIFO out of the cache for an unlocked walk.
  pub fn detach(&mut self) -> VecDeque<WeakSender<T>> {
    std::mem::take(&mut self.entries)
  }

  /// Put a successful entry (and the unconsulted remainder of its walk) back.
  pub fn reattach(&mut self, successful: WeakSender<T>, mut rest: VecDeque<WeakSender<T>>) {
    rest.push_front(successful);
    rest.append(&mut self.entries);
    self.entries = rest;
  }
}

impl<T: Send + 'static> Default for PredecessorCache<T> {
  fn default() -> Self {
    Self::new()
  }
}
