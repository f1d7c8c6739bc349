//! Interpretation of service responses.
//!
//! # Design
//! `Response<T>` is the outcome of one exchange. `T` states the body shape the
//! call site expects through `ResponseBody`; a body of any other shape becomes
//! `ApiError::TypeMismatch`. Pagination and rate-limit metadata are parsed
//! leniently from headers: anything missing or malformed yields `None`.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::{ApiError, ServiceError};
use crate::http::find_header;

/// A single JSON record.
pub type JsonObject = serde_json::Map<String, Value>;

/// The outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response<T> {
    Success(T, Option<Page>),
    Failure(ApiError),
}

impl<T> Response<T> {
    pub fn is_failure(&self) -> bool {
        matches!(self, Response::Failure(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Response::Success(value, _) => Some(value),
            Response::Failure(_) => None,
        }
    }

    pub fn page(&self) -> Option<Page> {
        match self {
            Response::Success(_, page) => *page,
            Response::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Response::Success(..) => None,
            Response::Failure(err) => Some(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        match self {
            Response::Success(value, page) => Response::Success(f(value), page),
            Response::Failure(err) => Response::Failure(err),
        }
    }

    /// Drop the page and convert into a plain `Result`.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Response::Success(value, _) => Ok(value),
            Response::Failure(err) => Err(err),
        }
    }
}

/// Structural shape of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Record,
    Collection,
    Empty,
    /// An array holding something other than records.
    Array,
    String,
    Number,
    Bool,
    /// Any of record, collection or empty.
    Payload,
}

impl Shape {
    pub fn of(value: Option<&Value>) -> Shape {
        match value {
            None | Some(Value::Null) => Shape::Empty,
            Some(Value::Object(_)) => Shape::Record,
            Some(Value::Array(items)) if items.iter().all(Value::is_object) => Shape::Collection,
            Some(Value::Array(_)) => Shape::Array,
            Some(Value::String(_)) => Shape::String,
            Some(Value::Number(_)) => Shape::Number,
            Some(Value::Bool(_)) => Shape::Bool,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Shape::Record => "a record",
            Shape::Collection => "a collection",
            Shape::Empty => "an empty body",
            Shape::Array => "an array of non-records",
            Shape::String => "a string",
            Shape::Number => "a number",
            Shape::Bool => "a boolean",
            Shape::Payload => "a record, a collection or an empty body",
        };
        f.write_str(text)
    }
}

/// A successful body of any accepted shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Record(JsonObject),
    Collection(Vec<JsonObject>),
    Empty,
}

/// A type a successful response body can be decoded into.
pub trait ResponseBody: Sized {
    /// Shape reported in `TypeMismatch` when decoding fails.
    const EXPECTED: Shape;

    fn from_body(body: &str) -> Result<Self, ApiError>;
}

/// Parse `body` as JSON; a blank body is `None`.
pub fn decode_json(body: &str) -> Result<Option<Value>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| ServiceError::Deserialization(e.to_string()).into())
}

fn mismatch(expected: Shape, value: Option<&Value>) -> ApiError {
    ApiError::TypeMismatch {
        expected,
        found: Shape::of(value),
    }
}

fn into_records(items: Vec<Value>) -> Vec<JsonObject> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}

impl ResponseBody for Payload {
    const EXPECTED: Shape = Shape::Payload;

    fn from_body(body: &str) -> Result<Self, ApiError> {
        let value = decode_json(body)?;
        match Shape::of(value.as_ref()) {
            Shape::Empty => Ok(Payload::Empty),
            Shape::Record => match value {
                Some(Value::Object(record)) => Ok(Payload::Record(record)),
                other => Err(mismatch(Self::EXPECTED, other.as_ref())),
            },
            Shape::Collection => match value {
                Some(Value::Array(items)) => Ok(Payload::Collection(into_records(items))),
                other => Err(mismatch(Self::EXPECTED, other.as_ref())),
            },
            _ => Err(mismatch(Self::EXPECTED, value.as_ref())),
        }
    }
}

impl ResponseBody for JsonObject {
    const EXPECTED: Shape = Shape::Record;

    fn from_body(body: &str) -> Result<Self, ApiError> {
        match Payload::from_body(body) {
            Ok(Payload::Record(record)) => Ok(record),
            Ok(Payload::Collection(_)) => Err(ApiError::TypeMismatch {
                expected: Self::EXPECTED,
                found: Shape::Collection,
            }),
            Ok(Payload::Empty) => Err(ApiError::TypeMismatch {
                expected: Self::EXPECTED,
                found: Shape::Empty,
            }),
            Err(ApiError::TypeMismatch { found, .. }) => Err(ApiError::TypeMismatch {
                expected: Self::EXPECTED,
                found,
            }),
            Err(err) => Err(err),
        }
    }
}

impl ResponseBody for Vec<JsonObject> {
    const EXPECTED: Shape = Shape::Collection;

    fn from_body(body: &str) -> Result<Self, ApiError> {
        let value = decode_json(body)?;
        match value {
            Some(Value::Array(items)) if items.iter().all(Value::is_object) => Ok(into_records(items)),
            other => Err(mismatch(Self::EXPECTED, other.as_ref())),
        }
    }
}

/// The body is discarded; only the status matters.
impl ResponseBody for () {
    const EXPECTED: Shape = Shape::Empty;

    fn from_body(_body: &str) -> Result<Self, ApiError> {
        Ok(())
    }
}

/// Pagination metadata of a collection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub total_pages: u64,
}

impl Page {
    pub const CURRENT_PAGE_HEADER: &'static str = "X-Pages-CurrentPage";
    pub const TOTAL_PAGES_HEADER: &'static str = "X-Pages-TotalPages";

    /// Both headers must be present and hold non-negative integers.
    pub fn from_headers(headers: &[(String, String)]) -> Option<Page> {
        let number = find_header(headers, Self::CURRENT_PAGE_HEADER)?.trim().parse().ok()?;
        let total_pages = find_header(headers, Self::TOTAL_PAGES_HEADER)?.trim().parse().ok()?;
        Some(Page { number, total_pages })
    }

    pub fn is_last(&self) -> bool {
        self.number >= self.total_pages
    }
}

/// Rate-limit allowance granted to a client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entitlements {
    /// Seconds until `remaining_requests` is reset to the maximum.
    pub reset_interval: f64,
    pub remaining_requests: u64,
}

impl Entitlements {
    pub const RESET_HEADER: &'static str = "X-RateLimit-Reset";
    pub const REMAINING_HEADER: &'static str = "X-RateLimit-Remaining";

    /// Both headers must be present; the reset interval may be fractional
    /// but must fit in a `Duration`.
    pub fn from_headers(headers: &[(String, String)]) -> Option<Entitlements> {
        let reset_interval: f64 = find_header(headers, Self::RESET_HEADER)?.trim().parse().ok()?;
        Duration::try_from_secs_f64(reset_interval).ok()?;
        let remaining_requests = find_header(headers, Self::REMAINING_HEADER)?.trim().parse().ok()?;
        Some(Entitlements {
            reset_interval,
            remaining_requests,
        })
    }

    /// Saturates for intervals built by hand outside the `Duration` range.
    pub fn reset_after(&self) -> Duration {
        Duration::try_from_secs_f64(self.reset_interval).unwrap_or(if self.reset_interval > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}
