// tests/lifecycle_tests.rs
mod common;

use common::*;
use uuid::Uuid;
use zipline::store::memory::FailPoint;
use zipline::{LifecycleError, OrderStatus, OrderStore, Role, TransitionOutcome};

// --- Checkout ---

#[tokio::test]
async fn test_create_order_prices_from_catalog_and_opens_intent() {
  let h = Harness::new();
  let customer = Uuid::new_v4();

  let receipt = h
    .engine
    .create_order(h.new_order(customer, &[(h.burrito, 1)], "2.00"))
    .await
    .unwrap();

  assert_eq!(receipt.order.status, OrderStatus::Pending);
  assert_eq!(receipt.order.subtotal, dec("15.99"));
  assert_eq!(receipt.order.tip, dec("2.00"));
  assert_eq!(receipt.order.total_amount, dec("17.99"));
  assert_eq!(receipt.items.len(), 1);
  assert_eq!(receipt.items[0].unit_price, dec("15.99"));
  assert!(receipt.payment_intent.is_some());

  let intents = h.payments.intents();
  assert_eq!(intents.len(), 1);
  assert_eq!(intents[0].amount, dec("17.99"));
  assert_eq!(intents[0].order_id(), Some(receipt.order.id));

  let stored = h.engine.get_order(receipt.order.id).await.unwrap();
  assert_eq!(stored, receipt.order);
  let history = h.store.status_history(receipt.order.id);
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_line_items_keep_their_price_after_catalog_change() {
  let h = Harness::new();
  let order = h.place_order(Uuid::new_v4()).await;

  h.store.set_price(h.burrito, dec("19.99"));

  let items = h.engine.order_items(order.id).await.unwrap();
  assert_eq!(items[0].unit_price, dec("15.99"));
  assert_eq!(items[0].line_total, dec("15.99"));
  assert_eq!(h.engine.get_order(order.id).await.unwrap().total_amount, dec("17.99"));
}

#[tokio::test]
async fn test_create_order_rejects_invalid_input_without_writing() {
  let h = Harness::new();
  let customer = Uuid::new_v4();

  let cases = vec![
    h.new_order(customer, &[], "0"),
    h.new_order(customer, &[(h.burrito, 0)], "0"),
    h.new_order(customer, &[(h.burrito, 1)], "-1.00"),
    h.new_order(customer, &[(Uuid::new_v4(), 1)], "0"),
    h.new_order(customer, &[(h.burrito, 1), (h.burrito, 2)], "0"),
    {
      let mut no_address = h.new_order(customer, &[(h.burrito, 1)], "0");
      no_address.delivery_address = "   ".to_string();
      no_address
    },
  ];

  for new_order in cases {
    let err = h.engine.create_order(new_order).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)), "unexpected error: {}", err);
  }
  assert!(h.engine.orders_for_user(customer).await.unwrap().is_empty());
  assert!(h.payments.intents().is_empty());
}

#[tokio::test]
async fn test_zero_total_order_is_rejected() {
  let h = Harness::new();
  let freebie = Uuid::new_v4();
  h.store.add_product(freebie, dec("0.00"), 10);

  let err = h
    .engine
    .create_order(h.new_order(Uuid::new_v4(), &[(freebie, 1)], "0"))
    .await
    .unwrap_err();

  assert!(matches!(err, LifecycleError::Validation(_)));
}

#[tokio::test]
async fn test_huge_tips_are_rejected_as_invalid_input() {
  let h = Harness::new();
  let customer = Uuid::new_v4();

  for tip in ["79228162514264337593543950335", "100000000", "100000000.00"] {
    let err = h
      .engine
      .create_order(h.new_order(customer, &[(h.burrito, 1)], tip))
      .await
      .unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)), "tip {}: {}", tip, err);
  }
  assert!(h.engine.orders_for_user(customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sub_cent_tip_is_rejected_but_trailing_zeros_are_fine() {
  let h = Harness::new();
  let customer = Uuid::new_v4();

  let err = h
    .engine
    .create_order(h.new_order(customer, &[(h.burrito, 1)], "0.005"))
    .await
    .unwrap_err();
  assert!(matches!(err, LifecycleError::Validation(_)));
  assert!(h.engine.orders_for_user(customer).await.unwrap().is_empty());

  let receipt = h
    .engine
    .create_order(h.new_order(customer, &[(h.burrito, 1)], "2.500"))
    .await
    .unwrap();
  assert_eq!(receipt.order.total_amount, dec("18.49"));
  assert!(receipt.payment_intent.is_some());
}

#[tokio::test]
async fn test_line_and_order_totals_past_the_ceiling_are_rejected() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let catering = Uuid::new_v4();
  let absurd = Uuid::new_v4();
  h.store.add_product(catering, dec("60000000.00"), 10);
  h.store.add_product(absurd, dec("39614081257132168796771975168"), 10);

  for (product, quantity) in [(catering, 2), (absurd, 3)] {
    let err = h
      .engine
      .create_order(h.new_order(customer, &[(product, quantity)], "0"))
      .await
      .unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)), "unexpected error: {}", err);
  }
  assert!(h.engine.orders_for_user(customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_processor_leaves_order_pending_and_retryable() {
  let h = Harness::new();
  h.payments.set_unavailable(true);

  let receipt = h
    .engine
    .create_order(h.new_order(Uuid::new_v4(), &[(h.soda, 2)], "0"))
    .await
    .unwrap();
  assert!(receipt.payment_intent.is_none());
  assert_eq!(receipt.order.status, OrderStatus::Pending);

  h.payments.set_unavailable(false);
  let intent = h.engine.create_payment_intent(receipt.order.id).await.unwrap();
  assert!(intent.id.starts_with("mock_pi_"));
  assert_eq!(h.payments.intents()[0].amount, dec("5.00"));
}

#[tokio::test]
async fn test_create_order_fails_cleanly_when_store_is_down() {
  let h = Harness::new();
  h.store.fail(FailPoint::CreateOrder);

  let err = h
    .engine
    .create_order(h.new_order(Uuid::new_v4(), &[(h.burrito, 1)], "0"))
    .await
    .unwrap_err();

  assert!(err.is_retryable());
  assert!(h.payments.intents().is_empty());
}

// --- Transitions ---

#[tokio::test]
async fn test_happy_path_from_checkout_to_delivery() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let zipper = h.zipper();

  let order = h.place_order(customer).await;

  let paid = applied(
    h.engine
      .confirm_payment(order.id, Some("pi_happy".to_string()))
      .await
      .unwrap(),
  );
  assert_eq!(paid.status, OrderStatus::InQueue);
  assert_eq!(paid.payment_reference.as_deref(), Some("pi_happy"));
  assert_eq!(h.store.stock(h.burrito), Some(99));

  let accepted = applied(h.engine.accept_order(order.id, zipper).await.unwrap());
  assert_eq!(accepted.status, OrderStatus::InProgress);
  assert_eq!(accepted.fulfilled_by, Some(zipper));

  let delivered = applied(
    h.engine
      .complete_order(order.id, zipper, Some("https://cdn.example/photo.jpg".to_string()))
      .await
      .unwrap(),
  );
  assert_eq!(delivered.status, OrderStatus::Delivered);
  assert_eq!(delivered.completion_photo_url.as_deref(), Some("https://cdn.example/photo.jpg"));
  assert_eq!(delivered.total_amount, dec("17.99"));

  let stats = h.store.fulfiller_stats(zipper);
  assert_eq!(stats.orders_handled, 1);
  assert_eq!(stats.revenue, dec("17.99"));

  let statuses: Vec<OrderStatus> = h.store.status_history(order.id).iter().map(|e| e.status).collect();
  assert_eq!(
    statuses,
    vec![
      OrderStatus::Pending,
      OrderStatus::InQueue,
      OrderStatus::InProgress,
      OrderStatus::Delivered
    ]
  );
}

#[tokio::test]
async fn test_accept_on_already_accepted_order_is_not_applied() {
  let h = Harness::new();
  let first = Uuid::new_v4();
  let order = h.accepted_order(Uuid::new_v4(), first).await;

  let outcome = h.engine.accept_order(order.id, h.zipper()).await.unwrap();

  assert_eq!(
    outcome,
    TransitionOutcome::NotApplied {
      current_status: OrderStatus::InProgress
    }
  );
  assert_eq!(h.engine.get_order(order.id).await.unwrap().fulfilled_by, Some(first));
}

#[tokio::test]
async fn test_only_zippers_can_accept() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  h.store.assign_role(customer, Role::Customer);
  let order = h.paid_order(customer).await;

  for caller in [customer, Uuid::new_v4()] {
    let err = h.engine.accept_order(order.id, caller).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden { user_id, .. } if user_id == caller));
  }

  let stored = h.engine.get_order(order.id).await.unwrap();
  assert_eq!(stored.status, OrderStatus::InQueue);
  assert_eq!(stored.fulfilled_by, None);
}

#[tokio::test]
async fn test_accept_requires_a_paid_order() {
  let h = Harness::new();
  let order = h.place_order(Uuid::new_v4()).await;

  let err = h.engine.accept_order(order.id, h.zipper()).await.unwrap_err();

  assert!(matches!(
    err,
    LifecycleError::InvalidTransition {
      from: OrderStatus::Pending,
      to: OrderStatus::InProgress,
      ..
    }
  ));
}

#[tokio::test]
async fn test_only_the_assigned_zipper_can_complete() {
  let h = Harness::new();
  let zipper = Uuid::new_v4();
  let intruder = Uuid::new_v4();
  let order = h.accepted_order(Uuid::new_v4(), zipper).await;

  let err = h.engine.complete_order(order.id, intruder, None).await.unwrap_err();

  assert!(matches!(err, LifecycleError::NotAssignedFulfiller { fulfiller_id, .. } if fulfiller_id == intruder));
  assert_eq!(h.engine.get_order(order.id).await.unwrap().status, OrderStatus::InProgress);
}

#[tokio::test]
async fn test_complete_requires_in_progress() {
  let h = Harness::new();
  let order = h.paid_order(Uuid::new_v4()).await;

  let err = h.engine.complete_order(order.id, Uuid::new_v4(), None).await.unwrap_err();

  assert!(matches!(err, LifecycleError::InvalidTransition { from: OrderStatus::InQueue, .. }));
}

#[tokio::test]
async fn test_unknown_order_is_reported() {
  let h = Harness::new();
  let missing = Uuid::new_v4();

  let err = h.engine.accept_order(missing, Uuid::new_v4()).await.unwrap_err();

  assert!(matches!(err, LifecycleError::OrderNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_store_failure_on_commit_fails_the_transition() {
  let h = Harness::new();
  let order = h.paid_order(Uuid::new_v4()).await;
  h.store.fail(FailPoint::StatusUpdate);

  let err = h.engine.accept_order(order.id, h.zipper()).await.unwrap_err();
  h.store.heal(FailPoint::StatusUpdate);

  assert!(err.is_retryable());
  assert_eq!(h.engine.get_order(order.id).await.unwrap().status, OrderStatus::InQueue);
}

#[tokio::test]
async fn test_side_effect_failures_do_not_undo_the_transition() {
  let h = Harness::new();
  let zipper = Uuid::new_v4();
  let order = h.accepted_order(Uuid::new_v4(), zipper).await;
  h.store.fail(FailPoint::StatusHistory);
  h.store.fail(FailPoint::FulfillerStats);

  let delivered = applied(h.engine.complete_order(order.id, zipper, None).await.unwrap());

  assert_eq!(delivered.status, OrderStatus::Delivered);
  assert_eq!(h.store.fulfiller_stats(zipper).orders_handled, 0);
  assert_eq!(h.store.status_history(order.id).len(), 3);
}

// --- Cancellation ---

#[tokio::test]
async fn test_owner_cancels_pending_order_without_refund() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let order = h.place_order(customer).await;

  let cancelled = applied(
    h.engine
      .cancel_order(order.id, customer, Some("changed my mind".to_string()))
      .await
      .unwrap(),
  );

  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert!(h.payments.refunds().is_empty());
  let history = h.store.status_history(order.id);
  assert_eq!(history.last().unwrap().reason, "changed my mind");
}

#[tokio::test]
async fn test_cancelling_a_paid_order_refunds_it() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let order = h.accepted_order(customer, Uuid::new_v4()).await;

  applied(h.engine.cancel_order(order.id, customer, None).await.unwrap());

  assert_eq!(h.payments.refunds(), vec![order.payment_reference.clone().unwrap()]);
}

#[tokio::test]
async fn test_refund_failure_does_not_block_cancellation() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let order = h.paid_order(customer).await;
  h.payments.set_unavailable(true);

  let cancelled = applied(h.engine.cancel_order(order.id, customer, None).await.unwrap());

  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert!(h.payments.refunds().is_empty());
}

#[tokio::test]
async fn test_strangers_cannot_cancel() {
  let h = Harness::new();
  let order = h.paid_order(Uuid::new_v4()).await;
  let stranger = Uuid::new_v4();

  let err = h.engine.cancel_order(order.id, stranger, None).await.unwrap_err();

  assert!(matches!(err, LifecycleError::Forbidden { user_id, .. } if user_id == stranger));
  assert_eq!(h.engine.get_order(order.id).await.unwrap().status, OrderStatus::InQueue);
}

#[tokio::test]
async fn test_assigned_zipper_can_cancel_and_customer_is_told() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let zipper = Uuid::new_v4();
  h.register(customer, "customer-token", None).await;
  let order = h.accepted_order(customer, zipper).await;

  applied(h.engine.cancel_order(order.id, zipper, None).await.unwrap());

  let sent = h.messaging.sent();
  let (token, message) = sent.last().unwrap();
  assert_eq!(token, "customer-token");
  assert_eq!(message.data["status"], "cancelled");
}

// --- Terminal states and disputes ---

#[tokio::test]
async fn test_terminal_orders_reject_further_transitions() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let zipper = Uuid::new_v4();
  let order = h.accepted_order(customer, zipper).await;
  applied(h.engine.complete_order(order.id, zipper, None).await.unwrap());

  assert!(matches!(
    h.engine.cancel_order(order.id, customer, None).await,
    Err(LifecycleError::InvalidTransition { .. })
  ));
  assert!(matches!(
    h.engine.accept_order(order.id, h.zipper()).await,
    Err(LifecycleError::InvalidTransition { .. })
  ));
  assert!(matches!(
    h.engine.complete_order(order.id, zipper, None).await,
    Err(LifecycleError::InvalidTransition { .. })
  ));
  assert_eq!(
    h.engine.confirm_payment(order.id, None).await.unwrap(),
    TransitionOutcome::NotApplied {
      current_status: OrderStatus::Delivered
    }
  );
  assert_eq!(
    h.engine.fail_payment(order.id).await.unwrap(),
    TransitionOutcome::NotApplied {
      current_status: OrderStatus::Delivered
    }
  );
  assert_eq!(h.engine.get_order(order.id).await.unwrap().status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_delivered_order_can_be_disputed_once() {
  let h = Harness::new();
  let zipper = Uuid::new_v4();
  let order = h.accepted_order(Uuid::new_v4(), zipper).await;
  applied(h.engine.complete_order(order.id, zipper, None).await.unwrap());

  let disputed = applied(h.engine.open_dispute(order.id).await.unwrap());
  assert_eq!(disputed.status, OrderStatus::Disputed);

  assert_eq!(
    h.engine.open_dispute(order.id).await.unwrap(),
    TransitionOutcome::NotApplied {
      current_status: OrderStatus::Disputed
    }
  );
}

#[tokio::test]
async fn test_dispute_on_unfulfilled_order_is_ignored() {
  let h = Harness::new();
  let order = h.paid_order(Uuid::new_v4()).await;

  let outcome = h.engine.open_dispute(order.id).await.unwrap();

  assert!(!outcome.is_applied());
  assert_eq!(h.engine.get_order(order.id).await.unwrap().status, OrderStatus::InQueue);
}

#[tokio::test]
async fn test_store_credit_checkout_queues_the_order() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let order = h.place_order(customer).await;

  let queued = applied(h.engine.confirm_store_credit_payment(order.id, customer).await.unwrap());

  assert_eq!(queued.status, OrderStatus::InQueue);
  assert!(queued.payment_reference.is_none());
  assert_eq!(h.store.stock(h.burrito), Some(99));
  assert!(matches!(
    h.engine.confirm_store_credit_payment(order.id, Uuid::new_v4()).await,
    Err(LifecycleError::Forbidden { .. })
  ));
}

#[tokio::test]
async fn test_orders_listed_by_status_and_owner() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let pending = h.place_order(customer).await;
  let queued = h.paid_order(customer).await;
  h.place_order(Uuid::new_v4()).await;

  let in_queue = h.engine.orders_by_status(OrderStatus::InQueue).await.unwrap();
  assert_eq!(in_queue.iter().map(|o| o.id).collect::<Vec<_>>(), vec![queued.id]);

  let mine = h.engine.orders_for_user(customer).await.unwrap();
  assert_eq!(mine.len(), 2);
  assert!(mine.iter().any(|o| o.id == pending.id));
  assert!(h.store.get_order_by_payment_reference(queued.payment_reference.as_deref().unwrap()).await.unwrap().is_some());
}
