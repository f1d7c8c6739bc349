//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through the default ureq transport. Validates
//! that request building, authentication, and response interpretation agree
//! with an actual server.

use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::NaiveDate;
use quaderno_core::{
    ApiError, Client, CrudOperation, DeliveryOperation, Entitlements, JsonObject, Payload, PaymentInstructions,
    PaymentMethod, PaymentOperation, Resource, Response, ServiceError, TaxOperation, Transaction,
    TransactionCategory,
};
use rust_decimal::Decimal;
use serde_json::json;

/// Start a mock server with `token` on a random port.
fn start_server(token: &'static str) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_token(listener, token).await
        })
        .unwrap();
    });

    addr
}

/// Serve a fixed raw HTTP response to every connection.
fn start_raw_server(response: &'static [u8]) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            stream.write_all(response).unwrap();
        }
    });

    addr
}

fn client(addr: SocketAddr) -> Client {
    Client::new(&format!("http://{addr}/"), mock_server::DEFAULT_TOKEN)
}

fn attributes(value: serde_json::Value) -> JsonObject {
    value.as_object().unwrap().clone()
}

fn id_of(record: &JsonObject) -> u64 {
    record["id"].as_u64().unwrap()
}

#[test]
fn ping_reports_entitlements() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));
    assert_eq!(client.entitlements(), None);

    assert_eq!(client.ping(), Response::Success((), None));
    assert_eq!(
        client.entitlements(),
        Some(Entitlements {
            reset_interval: mock_server::RATE_LIMIT_RESET_SECS as f64,
            remaining_requests: mock_server::RATE_LIMIT - 1,
        })
    );

    client.ping().into_result().unwrap();
    assert_eq!(client.entitlements().unwrap().remaining_requests, mock_server::RATE_LIMIT - 2);
}

#[test]
fn crud_lifecycle() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));

    // Step 1: list, empty with page metadata.
    let listed: Response<Vec<JsonObject>> = client.execute(Resource::Contact, CrudOperation::List);
    assert_eq!(listed.value(), Some(&Vec::new()));
    let page = listed.page().unwrap();
    assert_eq!((page.number, page.total_pages), (1, 1));
    assert!(page.is_last());

    // Step 2: create.
    let created: JsonObject = client
        .execute(
            Resource::Contact,
            CrudOperation::Create(attributes(json!({"first_name": "John", "last_name": "Doe"}))),
        )
        .into_result()
        .unwrap();
    assert_eq!(created["first_name"], "John");
    let id = id_of(&created);

    // Step 3: read.
    let read: JsonObject = client
        .execute(Resource::Contact, CrudOperation::Read(id))
        .into_result()
        .unwrap();
    assert_eq!(read, created);

    // Step 4: update merges attributes.
    let updated: JsonObject = client
        .execute(
            Resource::Contact,
            CrudOperation::Update(id, attributes(json!({"first_name": "Jane"}))),
        )
        .into_result()
        .unwrap();
    assert_eq!(updated["first_name"], "Jane");
    assert_eq!(updated["last_name"], "Doe");

    // Step 5: list holds the record.
    let listed: Vec<JsonObject> = client
        .execute(Resource::Contact, CrudOperation::List)
        .into_result()
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(id_of(&listed[0]), id);

    // Step 6: delete, then the record is gone.
    let deleted: Response<Payload> = client.execute(Resource::Contact, CrudOperation::Delete(id));
    assert_eq!(deleted, Response::Success(Payload::Empty, None));

    let missing: Response<JsonObject> = client.execute(Resource::Contact, CrudOperation::Read(id));
    assert_eq!(missing.error(), Some(&ApiError::Service(ServiceError::NotFound)));
    assert_eq!(missing.error().and_then(ApiError::status), Some(404));

    // Identifier zero is sent as is; the server knows no such record.
    let zero: Response<JsonObject> = client.execute(Resource::Contact, CrudOperation::Read(0));
    assert_eq!(zero.error(), Some(&ApiError::Service(ServiceError::NotFound)));
}

#[test]
fn a_collection_is_not_a_record() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));

    let response: Response<JsonObject> = client.execute(Resource::Item, CrudOperation::List);
    assert!(matches!(
        response.error(),
        Some(ApiError::TypeMismatch { found: quaderno_core::Shape::Collection, .. })
    ));
}

#[test]
fn invoice_payment_flow() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));

    let invoice: JsonObject = client
        .execute(Resource::Invoice, CrudOperation::Create(attributes(json!({"contact_id": 1}))))
        .into_result()
        .unwrap();
    let document = id_of(&invoice);

    let instructions = PaymentInstructions::new(Decimal::from_str("12.30").unwrap(), PaymentMethod::CreditCard)
        .on(NaiveDate::from_ymd_opt(2016, 1, 31).unwrap());
    let payment: JsonObject = client
        .execute(Resource::Invoice, PaymentOperation::Pay { document, instructions })
        .into_result()
        .unwrap();
    assert_eq!(payment["amount"], "12.30");
    assert_eq!(payment["payment_method"], "credit_card");
    assert_eq!(payment["date"], "2016-01-31");
    let payment_id = id_of(&payment);

    let payments: Vec<JsonObject> = client
        .execute(Resource::Invoice, PaymentOperation::List { document })
        .into_result()
        .unwrap();
    assert_eq!(payments.len(), 1);

    let read: JsonObject = client
        .execute(
            Resource::Invoice,
            PaymentOperation::Read {
                payment: payment_id,
                document,
            },
        )
        .into_result()
        .unwrap();
    assert_eq!(read, payment);

    let deleted: Response<()> = client.execute(
        Resource::Invoice,
        PaymentOperation::Delete {
            payment: payment_id,
            document,
        },
    );
    assert!(!deleted.is_failure());

    let payments: Vec<JsonObject> = client
        .execute(Resource::Invoice, PaymentOperation::List { document })
        .into_result()
        .unwrap();
    assert!(payments.is_empty());
}

#[test]
fn deliver_estimate() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));

    let estimate: JsonObject = client
        .execute(Resource::Estimate, CrudOperation::Create(JsonObject::new()))
        .into_result()
        .unwrap();

    let delivered: Response<Payload> = client.execute(Resource::Estimate, DeliveryOperation::Deliver(id_of(&estimate)));
    assert!(matches!(delivered, Response::Success(Payload::Record(_), None)));

    let missing: Response<Payload> = client.execute(Resource::Estimate, DeliveryOperation::Deliver(9999));
    assert_eq!(missing.error(), Some(&ApiError::Service(ServiceError::NotFound)));
}

#[test]
fn tax_calculation_and_validation() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));

    let tax: JsonObject = client
        .execute(
            Resource::Tax,
            TaxOperation::Calculate(
                Transaction::new("ES")
                    .postal_code("08080")
                    .category(TransactionCategory::Service),
            ),
        )
        .into_result()
        .unwrap();
    assert_eq!(tax["country"], "ES");
    assert_eq!(tax["rate"], 21.0);
    assert_eq!(tax["postal_code"], "08080");
    assert_eq!(tax["transaction_type"], "eservice");

    let reverse_charged: JsonObject = client
        .execute(
            Resource::Tax,
            TaxOperation::Calculate(Transaction::new("DE").vat_number("DE123456789")),
        )
        .into_result()
        .unwrap();
    assert_eq!(reverse_charged["rate"], 0.0);
    assert!(reverse_charged.get("transaction_type").is_none());

    let validation: JsonObject = client
        .execute(
            Resource::Tax,
            TaxOperation::Validate {
                vat_number: "98765432X".to_string(),
                country: "ES".to_string(),
            },
        )
        .into_result()
        .unwrap();
    assert_eq!(validation["valid"], true);
}

#[test]
fn unsupported_operation_never_reaches_the_server() {
    let client = client(start_server(mock_server::DEFAULT_TOKEN));

    let response: Response<Payload> = client.execute(Resource::Contact, DeliveryOperation::Deliver(1));
    assert_eq!(
        response.error(),
        Some(&ApiError::UnsupportedOperation {
            resource: Resource::Contact,
            operation: "deliver",
        })
    );
    // No exchange took place, so nothing was learned about the rate limit.
    assert_eq!(client.entitlements(), None);
}

#[test]
fn wrong_token_is_rejected() {
    let addr = start_server("the-real-token");
    let client = Client::new(&format!("http://{addr}"), "a-wrong-token");

    let response = client.ping();
    match response.error() {
        Some(ApiError::Service(ServiceError::Http { status, body })) => {
            assert_eq!(*status, 401);
            assert!(body.contains("Unauthorized"), "body: {body}");
        }
        other => panic!("expected a 401 failure, got {other:?}"),
    }
    // Rejections still carry rate-limit headers.
    assert!(client.entitlements().is_some());
}

#[test]
fn unreachable_server_is_a_transport_failure() {
    // Bind then drop to obtain a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let client = Client::new(&format!("http://{addr}"), mock_server::DEFAULT_TOKEN);

    let response = client.ping();
    assert!(matches!(response.error(), Some(ApiError::Service(ServiceError::Transport(_)))));
    assert_eq!(client.entitlements(), None);
}

#[test]
fn unreadable_body_still_reports_entitlements() {
    let addr = start_raw_server(
        b"HTTP/1.1 200 OK\r\n\
          X-RateLimit-Reset: 15\r\n\
          X-RateLimit-Remaining: 42\r\n\
          Content-Length: 3\r\n\
          Connection: close\r\n\
          \r\n\
          \xff\xfe\xfd",
    );
    let client = client(addr);

    let response: Response<JsonObject> = client.execute(Resource::Contact, CrudOperation::Read(1));
    assert!(matches!(response.error(), Some(ApiError::Service(ServiceError::Transport(_)))));
    assert_eq!(
        client.entitlements(),
        Some(Entitlements {
            reset_interval: 15.0,
            remaining_requests: 42,
        })
    );

    // Ping discards the body, so the exchange succeeds.
    assert_eq!(client.ping(), Response::Success((), None));
}
