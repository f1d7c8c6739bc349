//! Client core for the Quaderno accounting API.
//!
//! # Overview
//! Maps operations on remote resources (contacts, invoices, payments, taxes,
//! webhooks, ...) to HTTP requests, sends them through a pluggable transport,
//! and classifies the responses into typed results with pagination and
//! rate-limit metadata.
//!
//! # Design
//! - `request::build` is a pure function from (resource name, operation) to a
//!   `Request`; it can be tested without any I/O.
//! - `Client` splits each exchange into `prepare` (authenticated
//!   `HttpRequest`), transport execution, and `interpret` (typed `Response`),
//!   so the I/O boundary is explicit.
//! - The transport is a trait; `UreqTransport` is the default and tests plug
//!   in stubs or a live mock server.
//!
//! ```no_run
//! use quaderno_core::{Client, CrudOperation, JsonObject, Resource, Response};
//!
//! let client = Client::new("https://acme.quadernoapp.com/api/", "sk_test_token");
//! let contacts: Response<Vec<JsonObject>> = client.execute(Resource::Contact, CrudOperation::List);
//! if let Some(page) = contacts.page() {
//!     println!("page {} of {}", page.number, page.total_pages);
//! }
//! ```

pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod operation;
pub mod request;
pub mod resource;
pub mod response;

pub use account::Account;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, ServiceError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError, UreqTransport};
pub use operation::{
    Attributes, CrudOperation, DeliveryOperation, Id, Operation, PaymentInstructions, PaymentMethod,
    PaymentOperation, TaxOperation, Transaction, TransactionCategory,
};
pub use request::Request;
pub use resource::{Capability, Resource};
pub use response::{Entitlements, JsonObject, Page, Payload, Response, ResponseBody, Shape};
