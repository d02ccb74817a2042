mod helpers;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use helpers::*;
use serde_json::{json, Value};
use stayhub_backend::auth;
use stayhub_backend::http::{INTERNAL_SECRET_HEADER, USER_ID_HEADER, WEBHOOK_SIGNATURE_HEADER};
use stayhub_backend::models::*;
use tower::ServiceExt;
use uuid::Uuid;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, user: Option<&User>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: Option<&User>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn delete(uri: &str, user: &User) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(USER_ID_HEADER, user.id.to_string())
        .body(Body::empty())
        .unwrap()
}

fn webhook(body: Vec<u8>, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/bookings/webhook")
        .header("content-type", "application/json")
        .header(WEBHOOK_SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

fn stay_json(listing: &Listing) -> Value {
    json!({
        "listingId": listing.id,
        "startDate": "2030-01-01",
        "endDate": "2030-01-04",
        "guests": 2
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = send(&app.router(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_order_requires_authentication() {
    let app = TestApp::new();
    let host = app.create_user("host", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let (status, body) = send(
        &app.router(),
        json_request(Method::POST, "/bookings/orders", None, stay_json(&listing)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    // Well-formed but unknown user
    let ghost = User::new("ghost".into(), "ghost@example.com".into(), UserRole::User);
    let (status, _) = send(
        &app.router(),
        json_request(Method::POST, "/bookings/orders", Some(&ghost), stay_json(&listing)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_verify_and_list() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let (status, order) = send(
        &router,
        json_request(Method::POST, "/bookings/orders", Some(&guest), stay_json(&listing)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["amount"], 33_000);
    assert_eq!(order["currency"], "INR");
    assert_eq!(order["keyId"], KEY_ID);
    let order_id = order["orderId"].as_str().unwrap().to_string();

    let signature = auth::payment_signature(KEY_SECRET, &order_id, "pay_http").unwrap();
    let mut verify = stay_json(&listing);
    verify["orderId"] = json!(order_id);
    verify["paymentId"] = json!("pay_http");
    verify["signature"] = json!(signature);

    let (status, body) = send(
        &router,
        json_request(Method::POST, "/bookings/verify", Some(&guest), verify),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "paid");
    assert_eq!(body["booking"]["totalPrice"], 330);
    assert_eq!(body["booking"]["paymentReference"], "pay_http");

    let (status, mine) = send(&router, get("/bookings/mine", Some(&guest))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = send(&router, get("/bookings/mine", Some(&host))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_with_other_dates_than_ordered_is_rejected() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let (_, order) = send(
        &router,
        json_request(Method::POST, "/bookings/orders", Some(&guest), stay_json(&listing)),
    )
    .await;
    let order_id = order["orderId"].as_str().unwrap().to_string();

    let mut verify = stay_json(&listing);
    verify["endDate"] = json!("2030-01-24");
    verify["orderId"] = json!(order_id);
    verify["paymentId"] = json!("pay_http");
    verify["signature"] = json!(auth::payment_signature(KEY_SECRET, &order_id, "pay_http").unwrap());

    let (status, body) = send(
        &router,
        json_request(Method::POST, "/bookings/verify", Some(&guest), verify),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(app.bookings.is_empty());
}

#[tokio::test]
async fn test_verify_accepts_provider_field_names_and_rejects_bad_signature() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let mut body = stay_json(&listing);
    body["razorpay_order_id"] = json!("order_1");
    body["razorpay_payment_id"] = json!("pay_1");
    body["razorpay_signature"] = json!("0".repeat(64));

    let (status, err) = send(
        &router,
        json_request(Method::POST, "/bookings/verify", Some(&guest), body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_signature");
    assert!(app.bookings.is_empty());
}

#[tokio::test]
async fn test_order_errors_render_as_json() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let mut reversed = stay_json(&listing);
    reversed["endDate"] = json!("2029-12-30");
    let (status, body) = send(
        &router,
        json_request(Method::POST, "/bookings/orders", Some(&guest), reversed),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_range");

    let mut unknown = stay_json(&listing);
    unknown["listingId"] = json!(Uuid::new_v4());
    let (status, body) = send(
        &router,
        json_request(Method::POST, "/bookings/orders", Some(&guest), unknown),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(
        &router,
        json_request(Method::POST, "/bookings/orders", Some(&guest), json!({ "guests": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    app.seed_booking(&guest, &listing, day(2), day(3)).await;
    let (status, body) = send(
        &router,
        json_request(Method::POST, "/bookings/orders", Some(&guest), stay_json(&listing)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_provider_outage_is_bad_gateway() {
    let app = TestApp::with_gateway(stayhub_backend::services::MockPaymentGateway::failing());
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let (status, body) = send(
        &app.router(),
        json_request(Method::POST, "/bookings/orders", Some(&guest), stay_json(&listing)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "payment_provider");
}

#[tokio::test]
async fn test_webhook_endpoint() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let body = captured_webhook("pay_wh", "order_wh", &notes_for(&guest, &listing, 1, 4), 33_000);

    let (status, err) = send(&router, webhook(body.clone(), "bad")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_signature");
    assert!(app.bookings.is_empty());

    let signature = sign_webhook(&body);
    for _ in 0..2 {
        let (status, ack) = send(&router, webhook(body.clone(), &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "ok");
    }
    assert_eq!(app.bookings.len(), 1);

    // Authenticated but unusable: still acknowledged
    let empty = serde_json::to_vec(&json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_empty", "notes": [] } } }
    }))
    .unwrap();
    let (status, _) = send(&router, webhook(empty.clone(), &sign_webhook(&empty))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.bookings.len(), 1);
    assert!(app
        .audit
        .entries()
        .await
        .iter()
        .any(|e| e.event_type == "reconciliation_skipped"));
}

#[tokio::test]
async fn test_cancel_endpoint() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let stranger = app.create_user("stranger", UserRole::User);
    let listing = app.create_listing(&host, 100);

    let booking = app.seed_booking(&guest, &listing, day(10), day(12)).await;
    let uri = format!("/bookings/{}", booking.id);

    let (status, body) = send(&router, delete(&uri, &stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = send(&router, delete(&uri, &guest)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "cancelled");

    // Repeat is a no-op
    let (status, body) = send(&router, delete(&uri, &guest)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "cancelled");

    let soon = app
        .seed_booking(&guest, &listing, hours_from_now(2), hours_from_now(26))
        .await;
    let (status, body) = send(&router, delete(&format!("/bookings/{}", soon.id), &guest)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "too_late");

    let (status, _) = send(
        &router,
        delete(&format!("/bookings/{}", Uuid::new_v4()), &guest),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_endpoint() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let listing = app.create_listing(&host, 100);
    app.seed_booking(&guest, &listing, day(5), day(8)).await;

    let base = format!("/bookings/availability/{}", listing.id);

    let (status, body) = send(&router, get(&format!("{}?start=2030-01-08&end=2030-01-10", base), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);

    let (_, body) = send(&router, get(&format!("{}?start=2030-01-07&end=2030-01-09", base), None)).await;
    assert_eq!(body["available"], false);

    let (status, body) = send(&router, get(&format!("{}?start=2030-01-09&end=2030-01-09", base), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_range");
}

#[tokio::test]
async fn test_role_restricted_listings() {
    let app = TestApp::new();
    let router = app.router();
    let host = app.create_user("host", UserRole::User);
    let guest = app.create_user("guest", UserRole::User);
    let admin = app.create_user("admin", UserRole::Admin);
    let listing = app.create_listing(&host, 100);
    let booking = app.seed_booking(&guest, &listing, day(5), day(8)).await;

    let (status, _) = send(&router, get("/bookings", Some(&guest))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, all) = send(&router, get("/bookings", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let listing_uri = format!("/bookings/listing/{}", listing.id);
    let (status, _) = send(&router, get(&listing_uri, Some(&guest))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, rows) = send(&router, get(&listing_uri, Some(&host))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["id"], json!(booking.id));

    let (status, one) = send(&router, get(&format!("/bookings/{}", booking.id), Some(&guest))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["listingId"], json!(listing.id));
}

#[tokio::test]
async fn test_internal_secret_is_enforced_when_configured() {
    let app = TestApp::with_internal_secret("s3cret");
    let router = app.router();
    let guest = app.create_user("guest", UserRole::User);

    let (status, _) = send(&router, get("/bookings/mine", Some(&guest))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/bookings/mine")
        .header(USER_ID_HEADER, guest.id.to_string())
        .header(INTERNAL_SECRET_HEADER, "s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
}
