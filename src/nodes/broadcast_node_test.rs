use crate::edge::{make_edge, Receiver, Sender};
use crate::nodes::common::{weak_receiver_of, CollectingSink, RefusingSink};
use crate::nodes::BroadcastNode;

#[test]
fn test_fans_out_to_every_successor() {
  let broadcast = BroadcastNode::new();
  let left = CollectingSink::new();
  let right = CollectingSink::new();
  make_edge(&broadcast, &left);
  make_edge(&broadcast, &right);

  assert!(broadcast.try_put("a".to_string(), None).is_ok());
  assert!(broadcast.try_put("b".to_string(), None).is_ok());

  assert_eq!(left.values(), vec!["a".to_string(), "b".to_string()]);
  assert_eq!(right.values(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_refusals_are_ignored() {
  let broadcast = BroadcastNode::new();
  let stubborn = RefusingSink::new(usize::MAX);
  let eager = CollectingSink::new();
  make_edge(&broadcast, &stubborn);
  make_edge(&broadcast, &eager);

  assert!(broadcast.try_put(1, None).is_ok());
  assert!(stubborn.values().is_empty());
  assert_eq!(eager.values(), vec![1]);
}

#[test]
fn test_pull_side_requester_becomes_a_persistent_successor() {
  let broadcast = BroadcastNode::new();
  let sink = CollectingSink::new();

  assert_eq!(broadcast.try_get(Some(weak_receiver_of(&sink))), None);
  assert!(broadcast.try_put(1, None).is_ok());
  assert!(broadcast.try_put(2, None).is_ok());
  // Delivery does not unregister: the requester keeps receiving.
  assert_eq!(sink.values(), vec![1, 2]);
}

#[test]
fn test_dropped_successors_are_pruned() {
  let broadcast = BroadcastNode::new();
  let keeper = CollectingSink::new();
  make_edge(&broadcast, &keeper);
  {
    let transient = CollectingSink::new();
    make_edge(&broadcast, &transient);
  }

  assert!(broadcast.try_put(5, None).is_ok());
  assert_eq!(keeper.values(), vec![5]);
}
