//! The edge protocol: how a value crosses from one node to the next.
//!
//! Every node is a [`Sender`], a [`Receiver`], or both. An edge is a
//! registration, not an object: [`make_edge`] hands the receiver to the
//! sender as a weak successor handle, and from then on values move through
//! the `try_put`/`try_get` handshake.
//!
//! The handshake never blocks and never buffers. `try_put` either transfers
//! ownership of the value or returns it; `try_get` either yields a value or
//! yields nothing. Whenever a side comes up empty-handed and the opposite
//! peer was named in the call, that peer is remembered on the refusing side
//! and receives exactly one callback once readiness flips (see
//! [`crate::cache`]).
//!
//! All handles are [`Weak`]: the user graph owns its nodes, and a node that
//! has been dropped simply disappears from caches and successor lists the
//! next time they are walked.

use std::sync::{Arc, Weak};

/// Owning handle to a sending endpoint.
pub type SharedSender<T> = Arc<dyn Sender<T>>;
/// Owning handle to a receiving endpoint.
pub type SharedReceiver<T> = Arc<dyn Receiver<T>>;
/// Non-owning handle to a sending endpoint, as stored in predecessor caches.
pub type WeakSender<T> = Weak<dyn Sender<T>>;
/// Non-owning handle to a receiving endpoint, as stored in successor caches.
pub type WeakReceiver<T> = Weak<dyn Receiver<T>>;

/// An entity that can be handed a value.
pub trait Receiver<T: Send + 'static>: Send + Sync {
  /// Attempt to hand `value` to this receiver.
  ///
  /// `Ok(())` means the receiver took ownership. `Err(value)` returns the
  /// value to the caller; if `source` was provided, the receiver has stored
  /// it in its predecessor cache and will pull from it (via `try_get`) once
  /// it becomes ready again.
  fn try_put(&self, value: T, source: Option<WeakSender<T>>) -> Result<(), T>;
}

/// An entity that can be asked to yield a value.
pub trait Sender<T: Send + 'static>: Send + Sync {
  /// Attempt to pull a value out of this sender.
  ///
  /// `None` means nothing was available; if `requester` was provided, the
  /// sender has stored it in its successor cache and will push to it (via
  /// `try_put`) once a value materialises.
  fn try_get(&self, requester: Option<WeakReceiver<T>>) -> Option<T>;

  /// Attach `successor` as a downstream target for future values.
  fn register_successor(&self, successor: WeakReceiver<T>);
}

/// Wire a directed edge from `sender` to `receiver`.
///
/// The sender keeps only a weak handle; the caller's `Arc`s stay the owning
/// references. Wire the whole graph before activating any source — values
/// that flow before an edge exists do not retroactively reach it.
pub fn make_edge<T, S, R>(sender: &Arc<S>, receiver: &Arc<R>)
where
  T: Send + 'static,
  S: Sender<T> + ?Sized,
  R: Receiver<T> + 'static,
{
  let weak: Weak<R> = Arc::downgrade(receiver);
  let successor: WeakReceiver<T> = weak;
  sender.register_successor(successor);
}
