use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use garage_desk::config::AppConfig;
use garage_desk::errors::{AppError, ValidationError};
use garage_desk::models::{
    BookingPatch, BookingStatus, EntityRef, ListQuery, NewUpsell, SortDir, SortKey,
};
use garage_desk::services::auth::AuthClient;
use garage_desk::services::store::http::HttpBookingStore;
use garage_desk::services::store::BookingStore;
use garage_desk::session::Session;

// ── Fake booking store ──

#[derive(Default)]
struct Seen {
    auth: Option<String>,
    query: HashMap<String, String>,
    body: Option<Value>,
    path_id: Option<String>,
}

type Shared = Arc<Mutex<Seen>>;

fn booking_json(id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "carRegNo": "ABC-123",
        "makeModel": "Ford Focus",
        "clientName": "Jane Doe",
        "clientAddress": "1 High Street",
        "phoneNumber": "07700 900123",
        "services": [{ "_id": "svc-1", "name": "MOT" }],
        "bookingPrice": "100",
        "labourCost": 20,
        "partsCost": 10,
        "status": status,
    })
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn list_bookings(
    State(seen): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut seen = seen.lock().unwrap();
    seen.auth = bearer(&headers);
    seen.query = query;
    Json(json!({
        "success": true,
        "data": [booking_json("b1", "arrived"), { "carRegNo": "NO-ID" }],
        "pagination": { "total": 11, "page": 2, "totalPages": 2 },
    }))
}

async fn get_booking(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "expired" => StatusCode::UNAUTHORIZED.into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(booking_json("slow", "pending")).into_response()
        }
        _ => Json(booking_json(&id, "pending")).into_response(),
    }
}

async fn update_booking(
    State(seen): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut record = booking_json(&id, "pending");
    if let (Some(record), Some(fields)) = (record.as_object_mut(), body.as_object()) {
        for (k, v) in fields {
            record.insert(k.clone(), v.clone());
        }
    }
    let mut seen = seen.lock().unwrap();
    seen.path_id = Some(id);
    seen.body = Some(body);
    Json(json!({ "data": record }))
}

async fn update_status(
    State(seen): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if id == "done" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Booking already completed" })),
        )
            .into_response();
    }
    let status = body["status"].as_str().unwrap_or_default().to_string();
    let mut seen = seen.lock().unwrap();
    seen.path_id = Some(id.clone());
    seen.body = Some(body);
    Json(json!({ "booking": booking_json(&id, &status) })).into_response()
}

async fn delete_booking(State(seen): State<Shared>, Path(id): Path<String>) -> StatusCode {
    seen.lock().unwrap().path_id = Some(id);
    StatusCode::NO_CONTENT
}

async fn list_upsells(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "upsells": [{
            "_id": "up-1",
            "booking": { "_id": id },
            "services": [{ "_id": "svc-2", "name": "Brakes" }],
            "parts": [{ "_id": "p-1", "partName": "Pads" }],
            "labourCost": 20,
            "partsCost": "30",
            "upsellPrice": 90,
        }]
    }))
}

async fn create_upsell(
    State(seen): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let reply = json!({
        "upsell": {
            "_id": "up-2",
            "booking": id,
            "services": [body["serviceId"].clone()],
            "labourCost": body["labourCost"].clone(),
            "partsCost": body["partsCost"].clone(),
            "upsellPrice": body["upsellPrice"].clone(),
        }
    });
    seen.lock().unwrap().body = Some(body);
    Json(reply)
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "admin" && body["password"] == "secret" {
        Json(json!({ "token": "tok-1", "user": { "_id": "u1", "username": "admin" } }))
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn spawn_store() -> (String, Shared) {
    let seen = Shared::default();
    let app = Router::new()
        .route("/api/bookings", get(list_bookings))
        .route("/api/bookings/:id", get(get_booking).patch(update_booking).delete(delete_booking))
        .route("/api/bookings/status/:id", patch(update_status))
        .route("/api/upsell/booking/:id", get(list_upsells).post(create_upsell))
        .route("/api/auth/login", post(login))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), seen)
}

fn store_for(base: &str, session: Arc<Session>) -> HttpBookingStore {
    HttpBookingStore::new(base, session, Duration::from_secs(5)).unwrap()
}

fn config_for(base: &str) -> AppConfig {
    AppConfig {
        api_url: base.to_string(),
        request_timeout_secs: 5,
        page_size: 20,
        api_username: String::new(),
        api_password: String::new(),
        api_token: String::new(),
    }
}

// ── Bookings ──

#[tokio::test]
async fn test_list_sends_filters_and_normalises_page() {
    let (base, seen) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let query = ListQuery {
        status: Some(BookingStatus::Arrived),
        sort_by: SortKey::BookingPrice,
        sort_dir: SortDir::Asc,
        page: 2,
        page_size: 10,
        ..Default::default()
    };
    let page = store.list_bookings(&query).await.unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.total_items, 11);
    // the record without an identifier is dropped
    assert_eq!(page.items.len(), 1);
    let b = &page.items[0];
    assert_eq!(b.id, "b1");
    assert_eq!(b.booking_price, 100.0);
    assert_eq!(b.status, BookingStatus::Arrived);
    assert_eq!(b.services, vec![EntityRef::new("svc-1", "MOT")]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.auth.as_deref(), Some("Bearer tok-1"));
    assert_eq!(seen.query["page"], "2");
    assert_eq!(seen.query["limit"], "10");
    assert_eq!(seen.query["status"], "arrived");
    assert_eq!(seen.query["sortBy"], "bookingPrice");
    assert_eq!(seen.query["sortDir"], "asc");
}

#[tokio::test]
async fn test_status_change_uses_status_route() {
    let (base, seen) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let b = store
        .update_status("b7", BookingStatus::Arrived)
        .await
        .unwrap();
    assert_eq!(b.id, "b7");
    assert_eq!(b.status, BookingStatus::Arrived);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.path_id.as_deref(), Some("b7"));
    assert_eq!(seen.body, Some(json!({ "status": "arrived" })));
}

#[tokio::test]
async fn test_update_sends_only_changed_fields() {
    let (base, seen) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let patch = BookingPatch {
        client_name: Some("Jane Smith".to_string()),
        labour_cost: Some(25.0),
        ..Default::default()
    };
    let b = store.update_booking("b3", &patch).await.unwrap();
    assert_eq!(b.client_name, "Jane Smith");
    assert_eq!(b.labour_cost, 25.0);

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.body,
        Some(json!({ "clientName": "Jane Smith", "labourCost": 25.0 }))
    );
}

#[tokio::test]
async fn test_delete_accepts_empty_body() {
    let (base, seen) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    store.delete_booking("b9").await.unwrap();
    assert_eq!(seen.lock().unwrap().path_id.as_deref(), Some("b9"));
}

#[tokio::test]
async fn test_store_error_message_is_passed_through() {
    let (base, _) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let err = store
        .update_status("done", BookingStatus::Canceled)
        .await
        .unwrap_err();
    match err {
        AppError::Store(msg) => assert_eq!(msg, "Booking already completed"),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreadable_error_body_gets_generic_message() {
    let (base, _) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let err = store.get_booking("broken").await.unwrap_err();
    assert_eq!(err.to_string(), "request failed");
}

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let (base, seen) = spawn_store().await;
    let session = Arc::new(Session::new("tok-old"));
    let store = store_for(&base, session.clone());

    let err = store.get_booking("expired").await.unwrap_err();
    assert!(matches!(err, AppError::Authentication));
    assert!(!session.is_active());

    // no credential left: fails before reaching the network
    let err = store.list_bookings(&ListQuery::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Authentication));
    assert!(seen.lock().unwrap().auth.is_none());
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let (base, _) = spawn_store().await;
    let store =
        HttpBookingStore::new(&base, Arc::new(Session::new("tok-1")), Duration::from_millis(100))
            .unwrap();

    let err = store.get_booking("slow").await.unwrap_err();
    assert_eq!(err.to_string(), "request timed out");
}

// ── Upsells ──

#[tokio::test]
async fn test_list_upsells_normalises_refs() {
    let (base, _) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let upsells = store.list_upsells("b1").await.unwrap();
    assert_eq!(upsells.len(), 1);
    let u = &upsells[0];
    assert_eq!(u.booking_id, "b1");
    assert_eq!(u.parts, vec![EntityRef::new("p-1", "Pads")]);
    assert_eq!(u.parts_cost, 30.0);
    assert_eq!(u.profit(), 40.0);
}

#[tokio::test]
async fn test_create_upsell_sends_first_ids() {
    let (base, seen) = spawn_store().await;
    let store = store_for(&base, Arc::new(Session::new("tok-1")));

    let new = NewUpsell::new(EntityRef::new("svc-2", "Brakes"))
        .with_part(EntityRef::new("p-1", "Pads"))
        .with_costs(30.0, 20.0);
    let created = store.create_upsell("b1", &new).await.unwrap();
    assert_eq!(created.id, "up-2");
    assert_eq!(created.booking_id, "b1");
    assert_eq!(created.upsell_price, 50.0);

    let seen = seen.lock().unwrap();
    let body = seen.body.as_ref().unwrap();
    assert_eq!(body["serviceId"], "svc-2");
    assert_eq!(body["partId"], "p-1");
}

// ── Login ──

#[tokio::test]
async fn test_login_opens_session() {
    let (base, _) = spawn_store().await;
    let auth = AuthClient::new(&config_for(&base)).unwrap();

    let session = auth.login(" admin ", "secret").await.unwrap();
    assert!(session.is_active());
    assert_eq!(session.token().as_deref(), Some("tok-1"));
    assert_eq!(
        session.user().and_then(|u| u.username).as_deref(),
        Some("admin")
    );
}

#[tokio::test]
async fn test_login_rejected() {
    let (base, _) = spawn_store().await;
    let auth = AuthClient::new(&config_for(&base)).unwrap();

    let err = auth.login("admin", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::Authentication));

    let err = auth.login("", "").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::MissingField(ref f)) if f == &vec!["username", "password"]
    ));
}
