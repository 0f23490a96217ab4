//! Request executor for the cloud management API.
//!
//! # Design
//! `Client` owns the base URL, the resolved credentials, the retry policy and
//! a `Transport`. `build_request` turns a method, a path and
//! `RequestOptions` into a plain `HttpRequest`. `execute` builds a fresh
//! request per attempt, sends it through the retry policy, and returns the
//! final `HttpResponse` without interpreting its status.
//!
//! The verb helpers (`create`, `get`, `list`, `update`, `patch`,
//! `sync_delete`, `async_delete`, `async_post`) pair a verb with its expected
//! success status and route anything else through `HttpError::from_response`.
//! Successful bodies are unwrapped from the `{"data": ...}` envelope.
//!
//! The client holds no mutable state after construction, so one instance can
//! be shared between threads; concurrent operations run independently.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::{Authenticator, Credentials, LoginRequest, LoginResponse};
use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::{ApiError, HttpError};
use crate::filter::Filter;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::pagination::{ListResponse, Page};
use crate::retry::{classify, Attempt, RetryPolicy};
use crate::services::tasks::Task;

/// Query parameters and body for a single request.
///
/// Query keys are unique and may carry several values; they are emitted in
/// key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    query: BTreeMap<String, Vec<String>>,
    body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.entry(key.to_string()).or_default().push(value.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        for (key, value) in filter.into().pairs() {
            self = self.with_query(key, value);
        }
        self
    }

    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Client for the cloud management API.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    user_agent: String,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    credentials: Option<Credentials>,
    authorization: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl Client {
    /// Build a client over the default `ureq` transport and authenticate.
    pub fn new(config: &ClientConfig, auth: &Authenticator) -> Result<Self, ApiError> {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::with_transport(config, auth, transport)
    }

    pub fn with_transport(
        config: &ClientConfig,
        auth: &Authenticator,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let mut client = Self {
            base_url: config.parsed_base_url()?,
            user_agent: config.user_agent.clone(),
            retry: config.retry_policy(),
            transport,
            credentials: None,
            authorization: None,
        };

        let credentials = client.authenticate(&Context::background(), auth)?;
        client.authorization = Some(credentials.authorization());
        client.credentials = Some(credentials);
        Ok(client)
    }

    fn authenticate(&self, ctx: &Context, auth: &Authenticator) -> Result<Credentials, ApiError> {
        match auth {
            Authenticator::StaticToken { token } => Ok(Credentials::bearer(token.as_str())),
            Authenticator::PasswordExchange { email, password } => {
                let opts = RequestOptions::new().with_body(&LoginRequest { email, password })?;
                let response = self.execute(ctx, HttpMethod::Post, LOGIN_PATH, &opts)?;
                let response = expect_status(response, 200, HttpMethod::Post, LOGIN_PATH)?;
                let login: LoginResponse = decode_data(&response.body)?;
                Ok(login.credentials)
            }
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Build the wire request for `path`, which may be relative to the base
    /// URL or absolute (as pagination links are).
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        opts: &RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("invalid request path {path:?}: {e}")))?;
        if !opts.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, values) in &opts.query {
                for value in values {
                    pairs.append_pair(key, value);
                }
            }
        }

        let body = opts
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ];
        if let Some(authorization) = &self.authorization {
            headers.push(("Authorization".to_string(), authorization.clone()));
        }

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Send one logical request, retrying transport and server failures.
    ///
    /// Returns the final response whatever its status; interpreting it is
    /// the caller's job.
    pub fn execute(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        opts: &RequestOptions,
    ) -> Result<HttpResponse, ApiError> {
        self.retry.run(ctx, |attempt| {
            let request = match self.build_request(method, path, opts) {
                Ok(request) => request,
                Err(e) => return Attempt::Fail(e),
            };
            debug!(
                attempt,
                method = %request.method,
                url = %request.url,
                body = loggable_body(path, request.body.as_deref()),
                "sending request"
            );
            classify(method, path, self.transport.send(&request))
        })
    }

    fn request_expecting(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        opts: &RequestOptions,
        expected: u16,
    ) -> Result<HttpResponse, ApiError> {
        let response = self.execute(ctx, method, path, opts)?;
        expect_status(response, expected, method, path)
    }

    /// `POST` expecting 201.
    pub fn create<B, T>(&self, ctx: &Context, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOptions::new().with_body(body)?;
        let response = self.request_expecting(ctx, HttpMethod::Post, path, &opts, 201)?;
        decode_data(&response.body)
    }

    /// `GET` expecting 200.
    pub fn get<T: DeserializeOwned>(&self, ctx: &Context, path: &str) -> Result<T, ApiError> {
        let response = self.request_expecting(ctx, HttpMethod::Get, path, &RequestOptions::new(), 200)?;
        decode_data(&response.body)
    }

    /// `GET` a paginated collection expecting 200.
    pub fn list<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        opts: &RequestOptions,
    ) -> Result<Page<'_, T>, ApiError> {
        let response = self.list_response(ctx, path, opts)?;
        Ok(Page::new(self, response))
    }

    pub(crate) fn list_response<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        opts: &RequestOptions,
    ) -> Result<ListResponse<T>, ApiError> {
        let response = self.request_expecting(ctx, HttpMethod::Get, path, opts, 200)?;
        decode(&response.body)
    }

    /// `PUT` expecting 200.
    pub fn update<B, T>(&self, ctx: &Context, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOptions::new().with_body(body)?;
        let response = self.request_expecting(ctx, HttpMethod::Put, path, &opts, 200)?;
        decode_data(&response.body)
    }

    /// `PATCH` expecting 200.
    pub fn patch<B, T>(&self, ctx: &Context, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOptions::new().with_body(body)?;
        let response = self.request_expecting(ctx, HttpMethod::Patch, path, &opts, 200)?;
        decode_data(&response.body)
    }

    /// `DELETE` expecting 204. The body is never decoded.
    pub fn sync_delete(&self, ctx: &Context, path: &str) -> Result<(), ApiError> {
        self.request_expecting(ctx, HttpMethod::Delete, path, &RequestOptions::new(), 204)?;
        Ok(())
    }

    /// `DELETE` expecting 200 and a task describing the deletion.
    pub fn async_delete(&self, ctx: &Context, path: &str) -> Result<Task, ApiError> {
        let response =
            self.request_expecting(ctx, HttpMethod::Delete, path, &RequestOptions::new(), 200)?;
        decode_task(&response.body)
    }

    /// `POST` an action expecting 200 and a task.
    pub fn async_post(&self, ctx: &Context, path: &str, opts: &RequestOptions) -> Result<Task, ApiError> {
        let response = self.request_expecting(ctx, HttpMethod::Post, path, opts, 200)?;
        decode_task(&response.body)
    }
}

const LOGIN_PATH: &str = "auth/login";

/// Request body as it may appear in logs. Login bodies carry a password.
fn loggable_body<'b>(path: &str, body: Option<&'b str>) -> &'b str {
    match body {
        Some(_) if path == LOGIN_PATH => "<redacted>",
        Some(body) => body,
        None => "",
    }
}

/// Map a status other than `expected` to a normalized `HttpError`.
fn expect_status(
    response: HttpResponse,
    expected: u16,
    method: HttpMethod,
    path: &str,
) -> Result<HttpResponse, ApiError> {
    if response.status == expected {
        return Ok(response);
    }
    Err(HttpError::from_response(method, path, response.status, &response.body).into())
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::decode(body, e))
}

fn decode_data<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    decode::<Envelope<T>>(body).map(|envelope| envelope.data)
}

fn decode_task(body: &str) -> Result<Task, ApiError> {
    let task: Task = decode_data(body)?;
    if task.id == 0 {
        return Err(ApiError::TaskWithoutId);
    }
    Ok(task)
}
