//! Error types for the API client.
//!
//! # Design
//! Every failure surfaces as one `ApiError`. Callers that need to branch do
//! so on `ApiError::kind()` or on `is_not_found`, never on raw status codes.
//! Non-2xx responses are normalized into an `HttpError` carrying the method,
//! path, status code, message and per-field validation errors decoded from
//! the server's error envelope.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::http::HttpMethod;

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was obtained (DNS, connect, TLS, read).
    Transport,
    /// The server answered with status 0 or 5xx.
    Server,
    /// The server answered with a 4xx (or another unexpected non-5xx) status.
    Client,
    /// A task or resource converged to a non-success terminal state.
    TaskFailed,
    RetriesExhausted,
    Cancelled,
    Encode,
    Decode,
    /// The server accepted an asynchronous action but returned no task id.
    InvalidTask,
    Config,
}

/// Why a `Context` stopped a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Canceled => f.write_str("context canceled"),
            CancelReason::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// A non-success HTTP response, decoded from the error envelope
/// `{"http_code": int, "message": string, "errors": {field: [string]}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub method: HttpMethod,
    pub path: String,
    pub status: u16,
    pub message: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

impl HttpError {
    /// Normalize a non-success response body.
    ///
    /// When the body is not a valid error envelope the whole body becomes the
    /// message. The status code always comes from the response, never from
    /// the envelope's `http_code`.
    pub fn from_response(method: HttpMethod, path: &str, status: u16, body: &str) -> Self {
        let (message, errors) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (envelope.message, envelope.errors),
            Err(_) => (body.to_string(), BTreeMap::new()),
        };
        Self {
            method,
            path: path.to_string(),
            status,
            message,
            errors,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Render field errors as `key: value, key: [v1 v2]`.
    ///
    /// A single message is rendered bare, several as a bracketed list.
    pub fn field_errors(&self) -> String {
        self.errors
            .iter()
            .map(|(field, messages)| match messages.as_slice() {
                [single] => format!("{field}: {single}"),
                many => format!("{field}: [{}]", many.join(" ")),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP {} {} returns {} status code",
            self.method, self.path, self.status
        )?;
        if !self.errors.is_empty() {
            f.write_str(" with errors")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl StdError for HttpError {}

/// Errors returned by `Client` and everything built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    /// A completed exchange with a status the caller did not expect.
    #[error(transparent)]
    Http(HttpError),

    #[error("exceeded retry limit after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ApiError>,
    },

    #[error("{0}")]
    Cancelled(CancelReason),

    #[error("task {id} finished with status {status}: {output}")]
    TaskFailed {
        id: u64,
        status: String,
        output: String,
    },

    #[error("virtual server {id} didn't start, actual status {status:?}")]
    ServerNotReady { id: u64, status: String },

    #[error("task doesn't have an id")]
    TaskWithoutId,

    #[error("serialization failed: {0}")]
    SerializationError(String),

    #[error("failed to decode {body:?}: {message}")]
    DeserializationError { body: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Http(e) if e.status == 0 || e.status >= 500 => ErrorKind::Server,
            ApiError::Http(_) => ErrorKind::Client,
            ApiError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            ApiError::Cancelled(_) => ErrorKind::Cancelled,
            ApiError::TaskFailed { .. } | ApiError::ServerNotReady { .. } => ErrorKind::TaskFailed,
            ApiError::TaskWithoutId => ErrorKind::InvalidTask,
            ApiError::SerializationError(_) => ErrorKind::Encode,
            ApiError::DeserializationError { .. } => ErrorKind::Decode,
            ApiError::Config(_) => ErrorKind::Config,
            ApiError::Context { source, .. } => source.kind(),
        }
    }

    /// The normalized HTTP error, looking through `Context` wrappers.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            ApiError::Http(e) => Some(e),
            ApiError::Context { source, .. } => source.http_error(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_error().is_some_and(HttpError::is_not_found)
    }

    /// Wrap with a description of the operation that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        ApiError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn decode(body: &str, err: serde_json::Error) -> Self {
        ApiError::DeserializationError {
            body: body.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        ApiError::Http(err)
    }
}

/// True iff `err`, or any error in its source chain, is an HTTP 404.
pub fn is_not_found(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            if api.is_not_found() {
                return true;
            }
        }
        if let Some(http) = e.downcast_ref::<HttpError>() {
            if http.is_not_found() {
                return true;
            }
        }
        current = e.source();
    }
    false
}
