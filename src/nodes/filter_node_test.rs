use crate::edge::{make_edge, Receiver, Sender};
use crate::nodes::common::{weak_receiver_of, weak_sender_of, CollectingSink, ManualSource};
use crate::nodes::FilterNode;

fn even(value: &i32) -> bool {
  value % 2 == 0
}

#[test]
fn test_failing_values_are_dropped_but_accepted() {
  let filter = FilterNode::new(even);
  let sink = CollectingSink::new();
  make_edge(&filter, &sink);

  assert!(filter.try_put(3, None).is_ok());
  assert!(sink.values().is_empty());
}

#[test]
fn test_passing_values_are_forwarded() {
  let filter = FilterNode::new(even);
  let sink = CollectingSink::new();
  make_edge(&filter, &sink);

  assert!(filter.try_put(4, None).is_ok());
  assert_eq!(sink.values(), vec![4]);
}

#[test]
fn test_refusal_caches_the_producer_for_a_later_pull() {
  let filter = FilterNode::new(even);
  let feed = ManualSource::new(vec![1, 2, 3]);

  // No consumer is wired, so a passing value bounces and the producer is
  // remembered.
  assert_eq!(filter.try_put(4, Some(weak_sender_of(&feed))), Err(4));

  // The pull drains the producer, discarding values the predicate rejects.
  assert_eq!(filter.try_get(None), Some(2));
  // Remaining script: [3] fails, then the producer runs dry.
  assert_eq!(filter.try_get(None), None);
  assert_eq!(feed.request_count(), 1);
}

#[test]
fn test_empty_get_caches_the_requester() {
  let filter = FilterNode::new(even);
  let sink = CollectingSink::new();

  assert_eq!(filter.try_get(Some(weak_receiver_of(&sink))), None);
  assert!(filter.try_put(6, None).is_ok());
  assert_eq!(sink.values(), vec![6]);
}
