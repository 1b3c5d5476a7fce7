//! The node vocabulary.
//!
//! Seven node kinds cover most event- and pipeline-oriented workloads:
//!
//! - **Producers**: [`SourceNode`] drives values out of a body closure.
//! - **Relays**: [`QueueNode`] buffers, [`FilterNode`] sieves,
//!   [`BroadcastNode`] fans out, [`OverwriteNode`] latches.
//! - **Workers**: [`FunctionNode`] maps one value to one value,
//!   [`GeneratorNode`] maps one value to a lazy sequence.
//!
//! All nodes are constructed as `Arc`s, serialise their state behind a
//! per-node mutex, and speak the handshake defined in [`crate::edge`].

pub mod broadcast_node;
pub mod filter_node;
pub mod function_node;
pub mod generator_node;
pub mod overwrite_node;
pub mod queue_node;
pub mod source_node;

#[cfg(test)]
pub(crate) mod common;

#[cfg(test)]
mod broadcast_node_test;
#[cfg(test)]
mod filter_node_test;

pub use broadcast_node::BroadcastNode;
pub use filter_node::FilterNode;
pub use function_node::FunctionNode;
pub use generator_node::GeneratorNode;
pub use overwrite_node::OverwriteNode;
pub use queue_node::QueueNode;
pub use source_node::SourceNode;
