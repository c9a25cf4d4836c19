// tests/notification_tests.rs
mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use std::time::Duration;
use uuid::Uuid;
use zipline::notify::content;
use zipline::notify::Priority;
use zipline::{Audience, DispatchSummary, OrderStatus, Role};

#[tokio::test]
async fn test_paid_order_alerts_every_fresh_zipper() {
  let h = Harness::new();
  h.register(Uuid::new_v4(), "zipper-a", Some(Role::Zipper)).await;
  h.register(Uuid::new_v4(), "zipper-b", Some(Role::Zipper)).await;
  h.register(Uuid::new_v4(), "customer-c", Some(Role::Customer)).await;

  let order = h.paid_order(Uuid::new_v4()).await;

  assert_eq!(h.messaging.sent_tokens(), vec!["zipper-a", "zipper-b"]);
  let (_, message) = &h.messaging.sent()[0];
  assert_eq!(message.title, "New order available");
  assert_eq!(message.priority, Priority::High);
  assert_eq!(message.data["type"], "new_order");
  assert_eq!(message.data["order_id"], order.id.to_string());
  assert_eq!(message.data["order_total"], "17.99");
}

#[tokio::test]
async fn test_customer_hears_about_accept_and_delivery() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  let zipper = Uuid::new_v4();
  h.register(customer, "customer-phone", None).await;

  let order = h.accepted_order(customer, zipper).await;
  h.engine.complete_order(order.id, zipper, None).await.unwrap();

  let statuses: Vec<String> = h
    .messaging
    .sent()
    .iter()
    .filter(|(token, _)| token == "customer-phone")
    .map(|(_, message)| message.data["status"].clone())
    .collect();
  assert_eq!(statuses, vec!["in_progress", "delivered"]);
}

#[tokio::test]
async fn test_owner_cancellation_sends_nothing() {
  let h = Harness::new();
  let customer = Uuid::new_v4();
  h.register(customer, "customer-phone", None).await;
  let order = h.place_order(customer).await;

  h.engine.cancel_order(order.id, customer, None).await.unwrap();

  assert!(h.messaging.sent().is_empty());
}

#[tokio::test]
async fn test_messaging_outage_never_fails_a_transition() {
  let h = Harness::new();
  h.register(Uuid::new_v4(), "zipper-a", Some(Role::Zipper)).await;
  h.messaging.fail_everything();

  let order = h.paid_order(Uuid::new_v4()).await;

  assert_eq!(order.status, OrderStatus::InQueue);
  assert!(h.messaging.sent().is_empty());
}

#[tokio::test]
async fn test_slow_messaging_is_cut_off_without_failing_the_transition() {
  let h = Harness::new();
  h.register(Uuid::new_v4(), "zipper-slow", Some(Role::Zipper)).await;
  h.messaging.set_delay(Duration::from_secs(2));

  let started = std::time::Instant::now();
  let order = h.paid_order(Uuid::new_v4()).await;

  assert_eq!(order.status, OrderStatus::InQueue);
  assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_dispatch_reports_partial_failure() {
  let h = Harness::new();
  h.messaging.fail_token("dead-token");
  let tokens = vec!["live-1".to_string(), "dead-token".to_string(), "live-2".to_string()];
  let message = content::test_message("Hello", "World", Utc::now());

  let summary = h.engine.dispatcher().dispatch(&tokens, &message).await;

  assert_eq!(summary, DispatchSummary { successful: 2, failed: 1 });
  assert_eq!(summary.total(), 3);
  assert_eq!(h.messaging.sent_tokens(), vec!["live-1", "live-2"]);
}

#[tokio::test]
async fn test_dispatch_with_no_tokens_is_empty_success() {
  let h = Harness::new();
  let message = content::test_message("Hello", "World", Utc::now());

  let summary = h.engine.dispatcher().dispatch(&[], &message).await;

  assert_eq!(summary, DispatchSummary::default());
}

#[tokio::test]
async fn test_stale_tokens_are_skipped_and_swept() {
  let h = Harness::new();
  let user = Uuid::new_v4();
  let now = Utc::now();
  let dispatcher = h.engine.dispatcher();
  dispatcher
    .register_device(&registration(user, "fresh", now - ChronoDuration::days(1)))
    .await
    .unwrap();
  dispatcher
    .register_device(&registration(user, "quiet", now - ChronoDuration::days(10)))
    .await
    .unwrap();
  dispatcher
    .register_device(&registration(user, "abandoned", now - ChronoDuration::days(45)))
    .await
    .unwrap();

  let tokens = dispatcher.resolve_active_tokens(Audience::User(user), now).await.unwrap();
  assert_eq!(tokens, vec!["fresh"]);

  let purged = dispatcher.sweep_stale_registrations(now).await.unwrap();
  assert_eq!(purged, 1);
  assert_eq!(h.store.device_count(), 2);
}

#[tokio::test]
async fn test_reregistering_a_device_refreshes_it() {
  let h = Harness::new();
  let user = Uuid::new_v4();
  let now = Utc::now();
  let dispatcher = h.engine.dispatcher();
  let mut device = registration(user, "old-token", now - ChronoDuration::days(20));
  dispatcher.register_device(&device).await.unwrap();

  device.token = "new-token".to_string();
  device.refreshed_at = now;
  dispatcher.register_device(&device).await.unwrap();

  assert_eq!(h.store.device_count(), 1);
  assert_eq!(
    dispatcher.resolve_active_tokens(Audience::User(user), now).await.unwrap(),
    vec!["new-token"]
  );
}

#[tokio::test]
async fn test_test_notification_reaches_everyone_fresh() {
  let h = Harness::new();
  h.register(Uuid::new_v4(), "one", None).await;
  h.register(Uuid::new_v4(), "two", Some(Role::Zipper)).await;

  let summary = h
    .engine
    .dispatcher()
    .send_test_notification(Audience::Everyone, "Ping", "Just checking", Utc::now())
    .await
    .unwrap();

  assert_eq!(summary.successful, 2);
  let (_, message) = &h.messaging.sent()[0];
  assert_eq!(message.data["type"], "test");
  assert_eq!(message.priority, Priority::Normal);
}

#[test]
fn test_every_status_has_wording() {
  let order_id = Uuid::new_v4();
  for status in OrderStatus::ALL {
    let (title, body) = content::for_status(order_id, status);
    assert!(!title.is_empty());
    assert!(!body.is_empty());
  }
  assert_eq!(content::for_status(order_id, OrderStatus::Disputed).0, "Order status updated");
}
