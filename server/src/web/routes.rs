// zipline_server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{device_handlers, notification_handlers, order_handlers, webhook_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Signed by the payment processor; no user auth.
      .service(web::scope("/webhooks").route("/payment", web::post().to(webhook_handlers::payment_webhook_handler)))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          // Must be registered before `/{order_id}`.
          .route("/mine", web::get().to(order_handlers::my_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/accept", web::post().to(order_handlers::accept_order_handler))
          .route("/{order_id}/complete", web::post().to(order_handlers::complete_order_handler))
          .route("/{order_id}/cancel", web::post().to(order_handlers::cancel_order_handler))
          .route(
            "/{order_id}/store-credit",
            web::post().to(order_handlers::store_credit_handler),
          )
          .route(
            "/{order_id}/payment-intent",
            web::post().to(order_handlers::payment_intent_handler),
          ),
      )
      .service(
        web::scope("/devices")
          .route("", web::post().to(device_handlers::register_device_handler))
          .route("/active", web::get().to(device_handlers::active_devices_handler)),
      )
      .route(
        "/notifications/test",
        web::post().to(notification_handlers::test_notification_handler),
      ),
  );
}
