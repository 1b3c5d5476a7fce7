use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ExecutorError;
use crate::executor::{Executor, TokioExecutor};

#[test]
fn test_runs_submitted_tasks_to_completion() {
  let executor = TokioExecutor::new().unwrap();
  let counter = Arc::new(AtomicUsize::new(0));
  for _ in 0..32 {
    let counter = counter.clone();
    executor.run(Box::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    }));
  }
  executor.wait_for_all().unwrap();
  assert_eq!(counter.load(Ordering::SeqCst), 32);
}

fn chain(executor: &Arc<TokioExecutor>, depth: usize, done: Arc<AtomicBool>) {
  let next = Arc::clone(executor);
  executor.run(Box::new(move || {
    if depth == 0 {
      done.store(true, Ordering::SeqCst);
    } else {
      chain(&next, depth - 1, done);
    }
  }));
}

#[test]
fn test_drain_covers_tasks_spawned_by_tasks() {
  let executor = Arc::new(TokioExecutor::new().unwrap());
  let done = Arc::new(AtomicBool::new(false));
  chain(&executor, 16, done.clone());
  executor.wait_for_all().unwrap();
  assert!(done.load(Ordering::SeqCst));
}

#[test]
fn test_first_panic_surfaces_from_wait_for_all() {
  let executor = TokioExecutor::new().unwrap();
  executor.run(Box::new(|| panic!("body failure")));
  let error = executor.wait_for_all().unwrap_err();
  match error {
    ExecutorError::TaskPanicked { message } => assert!(message.contains("body failure")),
    other => panic!("unexpected error: {other}"),
  }
  // The failure was surfaced once; a later drain starts clean.
  executor.wait_for_all().unwrap();
}

#[test]
fn test_cooperative_waiter_delays_the_drain() {
  let executor = Arc::new(TokioExecutor::new().unwrap());
  executor.increment_wait_count();

  let releaser = {
    let executor = executor.clone();
    std::thread::spawn(move || {
      std::thread::sleep(Duration::from_millis(100));
      executor.decrement_wait_count();
    })
  };

  let start = Instant::now();
  executor.wait_for_all().unwrap();
  assert!(start.elapsed() >= Duration::from_millis(100));
  releaser.join().unwrap();
}

#[test]
fn test_oversubscription_scopes_nest_and_unwind() {
  let executor = TokioExecutor::new().unwrap();
  assert_eq!(executor.oversubscription(), 0);
  let outer = executor.oversubscribe();
  assert_eq!(executor.oversubscription(), 1);
  {
    let _inner = executor.oversubscribe();
    assert_eq!(executor.oversubscription(), 2);
  }
  assert_eq!(executor.oversubscription(), 1);
  drop(outer);
  assert_eq!(executor.oversubscription(), 0);
}

#[test]
fn test_with_handle_borrows_an_existing_runtime() {
  let runtime = tokio::runtime::Builder::new_multi_thread().build().unwrap();
  let executor = TokioExecutor::with_handle(runtime.handle().clone());
  let ran = Arc::new(AtomicBool::new(false));
  {
    let ran = ran.clone();
    executor.run(Box::new(move || {
      ran.store(true, Ordering::SeqCst);
    }));
  }
  executor.wait_for_all().unwrap();
  assert!(ran.load(Ordering::SeqCst));
}
