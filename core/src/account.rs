//! Account credentials returned by the authorization lookup.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::response::{decode_json, ResponseBody, Shape};

/// The account an authentication token belongs to.
///
/// `base_url` is the account-specific API root to configure further clients
/// with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(rename = "href")]
    pub base_url: String,
}

impl ResponseBody for Account {
    const EXPECTED: Shape = Shape::Record;

    fn from_body(body: &str) -> Result<Self, ApiError> {
        let value = decode_json(body)?;
        let mismatch = |found| ApiError::TypeMismatch {
            expected: Self::EXPECTED,
            found,
        };
        match value {
            Some(value @ Value::Object(_)) => {
                // A record missing any credential field is still the wrong shape.
                serde_json::from_value(value).map_err(|_| mismatch(Shape::Record))
            }
            other => Err(mismatch(Shape::of(other.as_ref()))),
        }
    }
}
