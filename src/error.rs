use thiserror::Error;

/// Failures surfaced by an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
  /// A task panicked. The first panic observed wins; later ones are logged
  /// and discarded.
  #[error("executor task panicked: {message}")]
  TaskPanicked { message: String },

  /// The backing runtime could not be started.
  #[error("failed to start executor runtime")]
  Runtime(#[from] std::io::Error),
}
