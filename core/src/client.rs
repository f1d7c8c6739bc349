//! Request orchestration for the accounting API.
//!
//! # Design
//! `Client` owns the base URL, the authentication token and the last known
//! rate-limit entitlements. Each exchange is split the way the I/O boundary
//! falls: `prepare` turns a built `Request` into an authenticated
//! `HttpRequest`, the `HttpTransport` executes it, and `interpret` classifies
//! the `HttpResponse`. `send` runs the three steps and records entitlements
//! in between.
//!
//! `send` takes `&self`, so exchanges may run concurrently from several
//! threads. The entitlements cell is last-writer-wins: it reflects whichever
//! exchange completed most recently, not the one sent most recently.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::account::Account;
use crate::config::ClientConfig;
use crate::error::{ApiError, ServiceError};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, UreqTransport};
use crate::operation::Operation;
use crate::request::{self, Request};
use crate::resource::Resource;
use crate::response::{Entitlements, Page, Response, ResponseBody, Shape};

/// Client for one account of the accounting API.
pub struct Client<T = UreqTransport> {
    base_url: String,
    authentication_token: String,
    entitlements: RwLock<Option<Entitlements>>,
    transport: T,
}

impl Client<UreqTransport> {
    /// Client with the default configuration, see `ClientConfig::new`.
    pub fn new(base_url: &str, authentication_token: &str) -> Self {
        Self::from_config(&ClientConfig::new(base_url, authentication_token))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(
            &config.base_url,
            &config.authentication_token,
            UreqTransport::new(config.timeout),
        )
    }
}

impl<T: HttpTransport> Client<T> {
    pub fn with_transport(base_url: &str, authentication_token: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authentication_token: authentication_token.to_string(),
            entitlements: RwLock::new(None),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn authentication_token(&self) -> &str {
        &self.authentication_token
    }

    /// Value of the `Authorization` header: the token as a Basic-auth user
    /// with an empty password.
    pub fn authorization_header(&self) -> String {
        let credentials = BASE64.encode(format!("{}:", self.authentication_token));
        format!("Basic {credentials}")
    }

    /// Entitlements reported by the most recently completed exchange.
    pub fn entitlements(&self) -> Option<Entitlements> {
        *self.entitlements.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the request for `operation` on `resource`, rejecting operations
    /// the resource does not accept.
    pub fn request(&self, resource: Resource, operation: &Operation) -> Result<Request, ApiError> {
        if !resource.supports(operation.capability()) {
            return Err(ApiError::UnsupportedOperation {
                resource,
                operation: operation.name(),
            });
        }
        Ok(request::build(&self.base_url, resource.name(), operation))
    }

    /// Attach credentials and encode parameters: as the query string for GET
    /// and DELETE, as a JSON body for POST and PUT.
    pub fn prepare(&self, request: &Request) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![
            ("authorization".to_string(), self.authorization_header()),
            ("accept".to_string(), "application/json".to_string()),
        ];
        let mut url = request.url.clone();
        let mut body = None;

        if let Some(parameters) = &request.parameters {
            if request.method.carries_body() {
                let json = serde_json::to_string(parameters)
                    .map_err(|e| ServiceError::Serialization(e.to_string()))?;
                headers.push(("content-type".to_string(), "application/json".to_string()));
                body = Some(json);
            } else if !parameters.is_empty() {
                let mut parsed =
                    Url::parse(&url).map_err(|e| ServiceError::Serialization(format!("{url}: {e}")))?;
                {
                    let mut query = parsed.query_pairs_mut();
                    for (key, value) in parameters {
                        match value {
                            Value::String(text) => query.append_pair(key, text),
                            other => query.append_pair(key, &other.to_string()),
                        };
                    }
                }
                url = parsed.into();
            }
        }

        Ok(HttpRequest {
            method: request.method,
            url,
            headers,
            body,
        })
    }

    /// Classify a raw response into the shape expected by the call site.
    pub fn interpret<V: ResponseBody>(&self, response: HttpResponse) -> Response<V> {
        if let Err(err) = check_status(&response) {
            warn!(status = response.status, error = %err, "service reported a failure");
            return Response::Failure(err.into());
        }
        // A discarded body may be unreadable; any other shape needs it.
        if let Some(reason) = &response.body_error {
            if V::EXPECTED != Shape::Empty {
                warn!(status = response.status, error = %reason, "response body unreadable");
                return Response::Failure(ServiceError::Transport(format!("unreadable body: {reason}")).into());
            }
        }
        let page = Page::from_headers(&response.headers);
        match V::from_body(&response.body) {
            Ok(value) => {
                debug!(status = response.status, ?page, "response accepted");
                Response::Success(value, page)
            }
            Err(err) => {
                warn!(expected = %V::EXPECTED, error = %err, "response rejected");
                Response::Failure(err)
            }
        }
    }

    /// Send a built request and classify the response.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub fn send<V: ResponseBody>(&self, request: &Request) -> Response<V> {
        let http_request = match self.prepare(request) {
            Ok(http_request) => http_request,
            Err(err) => return Response::Failure(err),
        };
        match self.transport.execute(&http_request) {
            Ok(response) => {
                self.record_entitlements(&response);
                self.interpret(response)
            }
            Err(err) => {
                warn!(error = %err, "no response received");
                Response::Failure(ServiceError::Transport(err.0).into())
            }
        }
    }

    /// Build, check and send `operation` on `resource`.
    pub fn execute<V: ResponseBody>(&self, resource: Resource, operation: impl Into<Operation>) -> Response<V> {
        match self.request(resource, &operation.into()) {
            Ok(request) => self.send(&request),
            Err(err) => Response::Failure(err),
        }
    }

    /// Check that the service is reachable and the token accepted.
    pub fn ping(&self) -> Response<()> {
        self.send(&request::ping(&self.base_url))
    }

    /// Look up the account the token belongs to. This request ignores the
    /// configured base URL.
    pub fn account(&self) -> Response<Account> {
        self.send(&request::authorization())
    }

    fn record_entitlements(&self, response: &HttpResponse) {
        let entitlements = Entitlements::from_headers(&response.headers);
        debug!(?entitlements, "entitlements updated");
        *self.entitlements.write().unwrap_or_else(PoisonError::into_inner) = entitlements;
    }
}

impl<T: fmt::Debug> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("authentication_token", &"<redacted>")
            .field("entitlements", &self.entitlements)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Map non-success status codes to the appropriate `ServiceError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ServiceError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ServiceError::NotFound);
    }
    Err(ServiceError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
