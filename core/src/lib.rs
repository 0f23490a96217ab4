//! Blocking client runtime for the Solus cloud management API.
//!
//! # Overview
//! Every API operation flows through one `Client`: it builds the wire
//! request, sends it through a pluggable `Transport` under a bounded retry
//! policy, normalizes non-success responses into `HttpError`, and unwraps
//! the `{"data": ...}` envelope. List endpoints return a `Page` cursor and
//! long-running operations return a `Task` that `wait_for_task` can follow
//! to completion.
//!
//! # Design
//! - All operations are synchronous and take a `&Context` for cancellation
//!   and deadlines. Waiting (retry delays, poll intervals) happens only
//!   inside `Context`, so a cancelled context interrupts it promptly.
//! - The network boundary is the `Transport` trait. `UreqTransport` is the
//!   default; `testing::ScriptedTransport` replays canned responses.
//! - One error type, `ApiError`, classified by `ApiError::kind`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod http;
pub mod pagination;
pub mod retry;
pub mod services;
pub mod testing;
pub mod wait;

pub use auth::{Authenticator, Credentials};
pub use client::{Client, RequestOptions};
pub use config::ClientConfig;
pub use context::{CancelHandle, Context};
pub use error::{ApiError, CancelReason, ErrorKind, HttpError};
pub use filter::{
    Filter, IconFilter, IpBlockFilter, LocationFilter, OsImageFilter, PlanFilter, TaskFilter, VirtualServerFilter,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use pagination::Page;
pub use retry::RetryPolicy;
pub use services::tasks::{Task, TaskStatus};
pub use services::virtual_servers::{VirtualServer, VirtualServerStatus};
pub use wait::{wait_for, wait_for_server_ready, wait_for_task};
