#![doc = include_str!("../README.md")]

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod cache;
pub mod edge;
pub mod error;
pub mod executor;
pub mod nodes;

#[cfg(test)]
mod executor_test;

pub use cache::{PredecessorCache, SuccessorCache};
pub use edge::{
  make_edge, Receiver, Sender, SharedReceiver, SharedSender, WeakReceiver, WeakSender,
};
pub use error::ExecutorError;
pub use executor::{Executor, ScopedOversubscription, TokioExecutor};
pub use nodes::{
  BroadcastNode, FilterNode, FunctionNode, GeneratorNode, OverwriteNode, QueueNode, SourceNode,
};

/// Lock a node-state mutex, recovering from poisoning.
///
/// A panicking body unwinds through whatever guards the delivery path held at
/// that moment. Node state is only ever mutated inside short critical
/// sections that cannot themselves panic, so the data behind a poisoned lock
/// is still consistent; later `try_put`/`try_get` calls on the node stay
/// well-defined.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
