//! Pure mapping from (resource name, operation) to a request descriptor.
//!
//! # Design
//! `build` never performs I/O and keeps no state: the same inputs always
//! produce the same `Request`. Paths are assembled segment by segment and
//! finished with a single `.json` suffix.
//!
//! Two conventions existed for listing collections and for the default tax
//! category. This builder sends no `page` parameter when listing (page
//! metadata comes back in response headers) and omits `transaction_type`
//! unless the caller chose a category.

use serde_json::Value;

use crate::http::HttpMethod;
use crate::operation::{
    Attributes, CrudOperation, DeliveryOperation, Operation, PaymentOperation, TaxOperation,
};

/// Base URL of the account-independent authorization endpoint.
pub const AUTHORIZATION_BASE_URL: &str = "https://quadernoapp.com/api";

const JSON_SUFFIX: &str = ".json";

/// A built request: method, absolute URL, and optional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: HttpMethod,
    pub url: String,
    pub parameters: Option<Attributes>,
}

/// Build the request performing `operation` on the resource called
/// `resource_name`, rooted at `base_url`.
pub fn build(base_url: &str, resource_name: &str, operation: &Operation) -> Request {
    match operation {
        Operation::Crud(op) => build_crud(base_url, resource_name, op),
        Operation::Payment(op) => build_payment(base_url, resource_name, op),
        Operation::Delivery(op) => build_delivery(base_url, resource_name, op),
        Operation::Tax(op) => build_tax(base_url, resource_name, op),
    }
}

/// Liveness probe against the configured service.
pub fn ping(base_url: &str) -> Request {
    Request {
        method: HttpMethod::Get,
        url: resource_url(base_url, &["ping"]),
        parameters: None,
    }
}

/// Account lookup. Always targets `AUTHORIZATION_BASE_URL` because the
/// account-specific base URL is what this request discovers.
pub fn authorization() -> Request {
    Request {
        method: HttpMethod::Get,
        url: resource_url(AUTHORIZATION_BASE_URL, &["authorization"]),
        parameters: None,
    }
}

fn build_crud(base_url: &str, name: &str, op: &CrudOperation) -> Request {
    let (method, parameters) = match op {
        CrudOperation::Create(attributes) => (HttpMethod::Post, Some(attributes.clone())),
        CrudOperation::List | CrudOperation::Read(_) => (HttpMethod::Get, None),
        CrudOperation::Update(_, attributes) => (HttpMethod::Put, Some(attributes.clone())),
        CrudOperation::Delete(_) => (HttpMethod::Delete, None),
    };
    let url = match op {
        CrudOperation::Create(_) | CrudOperation::List => resource_url(base_url, &[name]),
        CrudOperation::Read(id) | CrudOperation::Update(id, _) | CrudOperation::Delete(id) => {
            resource_url(base_url, &[name, &id.to_string()])
        }
    };
    Request { method, url, parameters }
}

fn build_payment(base_url: &str, name: &str, op: &PaymentOperation) -> Request {
    let method = match op {
        PaymentOperation::Pay { .. } => HttpMethod::Post,
        PaymentOperation::List { .. } | PaymentOperation::Read { .. } => HttpMethod::Get,
        PaymentOperation::Delete { .. } => HttpMethod::Delete,
    };
    let parameters = match op {
        PaymentOperation::Pay { instructions, .. } => {
            let mut parameters = Attributes::new();
            parameters.insert("amount".into(), Value::String(instructions.amount.to_string()));
            parameters.insert(
                "payment_method".into(),
                Value::String(instructions.method.code().to_string()),
            );
            if let Some(date) = instructions.date {
                parameters.insert("date".into(), Value::String(date.format("%Y-%m-%d").to_string()));
            }
            Some(parameters)
        }
        _ => None,
    };

    let document = op.document().to_string();
    let url = match op.payment() {
        Some(payment) => resource_url(base_url, &[name, &document, "payments", &payment.to_string()]),
        None => resource_url(base_url, &[name, &document, "payments"]),
    };
    Request { method, url, parameters }
}

fn build_delivery(base_url: &str, name: &str, op: &DeliveryOperation) -> Request {
    let DeliveryOperation::Deliver(id) = op;
    Request {
        method: HttpMethod::Get,
        url: resource_url(base_url, &[name, &id.to_string(), "deliver"]),
        parameters: None,
    }
}

fn build_tax(base_url: &str, name: &str, op: &TaxOperation) -> Request {
    let mut parameters = Attributes::new();
    let action = match op {
        TaxOperation::Calculate(transaction) => {
            parameters.insert("country".into(), Value::String(transaction.country.clone()));
            if let Some(category) = transaction.category {
                parameters.insert("transaction_type".into(), Value::String(category.code().to_string()));
            }
            if let Some(postal_code) = &transaction.postal_code {
                parameters.insert("postal_code".into(), Value::String(postal_code.clone()));
            }
            if let Some(vat_number) = &transaction.vat_number {
                parameters.insert("vat_number".into(), Value::String(vat_number.clone()));
            }
            "calculate"
        }
        TaxOperation::Validate { vat_number, country } => {
            parameters.insert("country".into(), Value::String(country.clone()));
            parameters.insert("vat_number".into(), Value::String(vat_number.clone()));
            "validate"
        }
    };
    Request {
        method: HttpMethod::Get,
        url: resource_url(base_url, &[name, action]),
        parameters: Some(parameters),
    }
}

/// Join `segments` under `base_url` and finish with `.json`.
fn resource_url(base_url: &str, segments: &[&str]) -> String {
    let mut url = base_url.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.trim_matches('/'));
    }
    append_json_suffix(&url)
}

/// Append `.json` unless `path` already ends with it.
pub fn append_json_suffix(path: &str) -> String {
    if path.ends_with(JSON_SUFFIX) {
        path.to_string()
    } else {
        format!("{path}{JSON_SUFFIX}")
    }
}
