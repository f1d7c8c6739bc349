//! In-memory stand-in for the Quaderno accounting API.
//!
//! Every path ends in `.json`. Requests must carry Basic credentials whose
//! user is the configured token; every response carries rate-limit headers
//! and collection responses carry page headers.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_TOKEN: &str = "test-token";
pub const RATE_LIMIT: u64 = 100;
pub const RATE_LIMIT_RESET_SECS: u64 = 15;

const CRUD_COLLECTIONS: [&str; 10] = [
    "contacts",
    "invoices",
    "credits",
    "expenses",
    "estimates",
    "receipts",
    "recurring",
    "items",
    "webhooks",
    "evidences",
];
const PAYABLE: [&str; 2] = ["invoices", "expenses"];
const DELIVERABLE: [&str; 4] = ["invoices", "receipts", "credits", "estimates"];

type Record = Map<String, Value>;

/// Query string accepted by the tax endpoints.
#[derive(Debug, Default, Deserialize)]
struct TaxQuery {
    country: Option<String>,
    postal_code: Option<String>,
    vat_number: Option<String>,
    transaction_type: Option<String>,
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    records: HashMap<String, BTreeMap<u64, Record>>,
    payments: HashMap<(String, u64), BTreeMap<u64, Record>>,
    served: u64,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn exists(&self, collection: &str, id: u64) -> bool {
        self.records
            .get(collection)
            .is_some_and(|records| records.contains_key(&id))
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    credentials: Arc<str>,
}

pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        db: Arc::default(),
        credentials: format!("Basic {}", BASE64.encode(format!("{token}:"))).into(),
    };
    // matchit needs one parameter name per position, so handlers take
    // positional tuples and interpret the segments themselves.
    Router::new()
        .route("/{collection}", get(root_get).post(create_record))
        .route(
            "/{collection}/{member}",
            get(member_get).put(update_record).delete(delete_record),
        )
        .route("/{collection}/{member}/{action}", get(document_action).post(create_payment))
        .route(
            "/{collection}/{member}/{action}/{payment}",
            get(read_payment).delete(delete_payment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_token(listener, DEFAULT_TOKEN).await
}

pub async fn run_with_token(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

/// Reject bad credentials and stamp rate-limit headers on every response.
async fn gatekeeper(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == &*state.credentials);

    let remaining = {
        let mut store = state.db.write().await;
        store.served += 1;
        RATE_LIMIT.saturating_sub(store.served)
    };

    let mut response = if authorized {
        next.run(request).await
    } else {
        tracing::debug!(uri = %request.uri(), "rejected unauthenticated request");
        error(StatusCode::UNAUTHORIZED, "Unauthorized")
    };
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-reset", HeaderValue::from(RATE_LIMIT_RESET_SECS));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    response
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Not found")
}

fn strip_json(segment: &str) -> Option<&str> {
    segment.strip_suffix(".json")
}

fn parse_id(segment: &str) -> Option<u64> {
    strip_json(segment).unwrap_or(segment).parse().ok()
}

fn page_headers() -> [(&'static str, &'static str); 2] {
    [("x-pages-currentpage", "1"), ("x-pages-totalpages", "1")]
}

async fn root_get(State(state): State<AppState>, Path(segment): Path<String>) -> Response {
    match strip_json(&segment) {
        Some("ping") => Json(json!({ "status": "OK" })).into_response(),
        Some("authorization") => Json(json!({
            "id": 1,
            "name": "Mock Account",
            "email": "mock@example.com",
            "href": "http://localhost/api/",
        }))
        .into_response(),
        Some(collection) if CRUD_COLLECTIONS.contains(&collection) => {
            let store = state.db.read().await;
            let records: Vec<&Record> = store
                .records
                .get(collection)
                .map(|records| records.values().collect())
                .unwrap_or_default();
            (page_headers(), Json(json!(records))).into_response()
        }
        _ => not_found(),
    }
}

async fn create_record(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Json(attributes): Json<Record>,
) -> Response {
    let Some(collection) = strip_json(&segment).filter(|c| CRUD_COLLECTIONS.contains(c)) else {
        return not_found();
    };
    let mut store = state.db.write().await;
    let id = store.next_id();
    let mut record = attributes;
    record.insert("id".into(), json!(id));
    store
        .records
        .entry(collection.to_string())
        .or_default()
        .insert(id, record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn member_get(
    State(state): State<AppState>,
    Path((collection, segment)): Path<(String, String)>,
    Query(params): Query<TaxQuery>,
) -> Response {
    if collection == "taxes" {
        return match strip_json(&segment) {
            Some("calculate") => calculate_tax(&params),
            Some("validate") => validate_vat(&params),
            _ => not_found(),
        };
    }
    let Some(id) = parse_id(&segment) else {
        return not_found();
    };
    let store = state.db.read().await;
    store
        .records
        .get(&collection)
        .and_then(|records| records.get(&id))
        .map(|record| Json(record.clone()).into_response())
        .unwrap_or_else(not_found)
}

async fn update_record(
    State(state): State<AppState>,
    Path((collection, segment)): Path<(String, String)>,
    Json(attributes): Json<Record>,
) -> Response {
    let Some(id) = parse_id(&segment) else {
        return not_found();
    };
    let mut store = state.db.write().await;
    let Some(record) = store.records.get_mut(&collection).and_then(|records| records.get_mut(&id)) else {
        return not_found();
    };
    for (key, value) in attributes {
        if key != "id" {
            record.insert(key, value);
        }
    }
    Json(record.clone()).into_response()
}

async fn delete_record(
    State(state): State<AppState>,
    Path((collection, segment)): Path<(String, String)>,
) -> Response {
    let Some(id) = parse_id(&segment) else {
        return not_found();
    };
    let mut store = state.db.write().await;
    match store.records.get_mut(&collection).and_then(|records| records.remove(&id)) {
        Some(_) => {
            store.payments.remove(&(collection, id));
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

async fn document_action(
    State(state): State<AppState>,
    Path((collection, id, segment)): Path<(String, u64, String)>,
) -> Response {
    let store = state.db.read().await;
    if !store.exists(&collection, id) {
        return not_found();
    }
    match strip_json(&segment) {
        Some("payments") if PAYABLE.contains(&collection.as_str()) => {
            let payments: Vec<&Record> = store
                .payments
                .get(&(collection, id))
                .map(|payments| payments.values().collect())
                .unwrap_or_default();
            (page_headers(), Json(json!(payments))).into_response()
        }
        Some("deliver") if DELIVERABLE.contains(&collection.as_str()) => {
            Json(json!({ "status": "delivered" })).into_response()
        }
        _ => not_found(),
    }
}

async fn create_payment(
    State(state): State<AppState>,
    Path((collection, id, segment)): Path<(String, u64, String)>,
    Json(instructions): Json<Record>,
) -> Response {
    if strip_json(&segment) != Some("payments") || !PAYABLE.contains(&collection.as_str()) {
        return not_found();
    }
    for field in ["amount", "payment_method"] {
        if !instructions.get(field).is_some_and(Value::is_string) {
            return error(StatusCode::UNPROCESSABLE_ENTITY, &format!("{field} is required"));
        }
    }
    let mut store = state.db.write().await;
    if !store.exists(&collection, id) {
        return not_found();
    }
    let payment_id = store.next_id();
    let mut payment = instructions;
    payment.insert("id".into(), json!(payment_id));
    store
        .payments
        .entry((collection, id))
        .or_default()
        .insert(payment_id, payment.clone());
    (StatusCode::CREATED, Json(payment)).into_response()
}

async fn read_payment(
    State(state): State<AppState>,
    Path((collection, id, action, segment)): Path<(String, u64, String, String)>,
) -> Response {
    let Some(payment_id) = parse_id(&segment).filter(|_| action == "payments") else {
        return not_found();
    };
    let store = state.db.read().await;
    store
        .payments
        .get(&(collection, id))
        .and_then(|payments| payments.get(&payment_id))
        .map(|payment| Json(payment.clone()).into_response())
        .unwrap_or_else(not_found)
}

async fn delete_payment(
    State(state): State<AppState>,
    Path((collection, id, action, segment)): Path<(String, u64, String, String)>,
) -> Response {
    let Some(payment_id) = parse_id(&segment).filter(|_| action == "payments") else {
        return not_found();
    };
    let mut store = state.db.write().await;
    match store
        .payments
        .get_mut(&(collection, id))
        .and_then(|payments| payments.remove(&payment_id))
    {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

/// Standard VAT rates known to the mock, in percent.
fn standard_rate(country: &str) -> Option<(f64, &'static str)> {
    match country {
        "ES" => Some((21.0, "IVA")),
        "DE" => Some((19.0, "MwSt")),
        "FR" => Some((20.0, "TVA")),
        "GB" => Some((20.0, "VAT")),
        _ => None,
    }
}

fn calculate_tax(params: &TaxQuery) -> Response {
    let Some(country) = &params.country else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "country is required");
    };
    // Business customers with a VAT number are reverse-charged.
    let (rate, name) = match (standard_rate(country), &params.vat_number) {
        (Some(_), Some(_)) | (None, _) => (0.0, ""),
        (Some(found), None) => found,
    };
    let mut body = json!({
        "country": country,
        "name": name,
        "rate": rate,
    });
    if let Some(transaction_type) = &params.transaction_type {
        body["transaction_type"] = json!(transaction_type);
    }
    if let Some(postal_code) = &params.postal_code {
        body["postal_code"] = json!(postal_code);
    }
    Json(body).into_response()
}

fn validate_vat(params: &TaxQuery) -> Response {
    let (Some(country), Some(vat_number)) = (&params.country, &params.vat_number) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "country and vat_number are required");
    };
    let valid = vat_number.len() >= 8 && vat_number.chars().all(|c| c.is_ascii_alphanumeric());
    Json(json!({ "country": country, "vat_number": vat_number, "valid": valid })).into_response()
}
