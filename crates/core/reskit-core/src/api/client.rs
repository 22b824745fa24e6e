//! Thin HTTP wrapper: auth header, body encoding, uniform rejection policy

use crate::config::ClientConfig;
use crate::session::Session;
use crate::{ReskitError, Result};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the auth token
pub const TOKEN_HEADER: &str = "x-access-token";

const GENERIC_FAILURE: &str = "An error occurred";
const INVALID_JSON: &str = "response body is not valid JSON";

/// Outgoing request body
#[derive(Debug, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// JSON body, sent with `Content-Type: application/json`
    Json(Value),
    /// Multipart form, sent as-is
    Multipart(reqwest::multipart::Form),
}

/// HTTP client bound to one service and one session
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    session: Session,
}

impl ApiClient {
    /// Create a client with a pooled connection set
    pub fn new(config: ClientConfig, session: Session) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    /// Connection settings
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session whose token is attached to authenticated calls
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Perform a request and return the parsed JSON body
    ///
    /// Rejects with [`ReskitError::Api`] when the status is not 2xx or the
    /// payload carries an `error` field.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: RequestBody,
        include_token: bool,
    ) -> Result<Value> {
        let url = self.config.endpoint(endpoint)?;
        let mut request = self.http.request(method.clone(), url);

        if include_token {
            // sent even when empty; the server answers with 401
            request = request.header(TOKEN_HEADER, self.session.token().unwrap_or_default());
        }

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        debug!(%method, endpoint, include_token, "API call");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let outcome = interpret_response(status, &bytes);
        if let Err(ref e) = outcome {
            warn!(%method, endpoint, error = %e, "API call rejected");
        }
        outcome
    }

    /// [`ApiClient::call`] followed by deserialization into `T`
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: RequestBody,
        include_token: bool,
    ) -> Result<T> {
        let value = self.call(endpoint, method, body, include_token).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Apply the rejection policy to a raw response
pub fn interpret_response(status: u16, body: &[u8]) -> Result<Value> {
    let ok = (200..300).contains(&status);
    let parsed: Option<Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Some(Value::Null)
    } else {
        serde_json::from_slice(body).ok()
    };

    match parsed {
        None if ok => Err(ReskitError::api(status, INVALID_JSON)),
        None => Err(ReskitError::api(status, GENERIC_FAILURE)),
        Some(value) => match payload_error(&value) {
            Some(message) => Err(ReskitError::api(status, message)),
            None if !ok => Err(ReskitError::api(
                status,
                payload_message(&value).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            )),
            None => Ok(value),
        },
    }
}

fn payload_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn payload_message(value: &Value) -> Option<String> {
    value.get("message")?.as_str().map(str::to_string)
}
