//! Virtual servers. Creation is synchronous but the server then spends some
//! time `processing`; power actions, resizes and deletion return a `Task`.

use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::VirtualServerFilter;
use crate::pagination::Page;
use crate::services::locations::Location;
use crate::services::projects::Project;
use crate::services::ssh_keys::SshKey;
use crate::services::tasks::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualServerStatus {
    #[serde(rename = "not exists")]
    NotExists,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "stopped")]
    Stopped,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "unavailable")]
    Unavailable,
    #[default]
    #[serde(other)]
    Unknown,
}

impl VirtualServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VirtualServerStatus::NotExists => "not exists",
            VirtualServerStatus::Processing => "processing",
            VirtualServerStatus::Started => "started",
            VirtualServerStatus::Stopped => "stopped",
            VirtualServerStatus::Paused => "paused",
            VirtualServerStatus::Unavailable => "unavailable",
            VirtualServerStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootMode {
    #[default]
    Disk,
    Rescue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Specifications {
    pub disk: u64,
    pub ram: u64,
    pub vcpu: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VirtualServer {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub uuid: String,
    pub specifications: Specifications,
    pub status: VirtualServerStatus,
    pub location: Location,
    pub fqdns: Vec<String>,
    pub boot_mode: BootMode,
    pub is_suspended: bool,
    pub is_processing: bool,
    pub project: Project,
    pub ssh_keys: Vec<SshKey>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualServerCreateRequest {
    pub name: String,
    /// Defaults to `disk` when left unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_mode: Option<BootMode>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_data: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fqdns: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub ssh_keys: Vec<u64>,
    #[serde(rename = "plan")]
    pub plan_id: u64,
    #[serde(rename = "project")]
    pub project_id: u64,
    #[serde(rename = "location")]
    pub location_id: u64,
    #[serde(rename = "os", skip_serializing_if = "Option::is_none")]
    pub os_image_version_id: Option<u64>,
    #[serde(rename = "application", skip_serializing_if = "Option::is_none")]
    pub application_id: Option<u64>,
    #[serde(rename = "applicationData", skip_serializing_if = "Option::is_none")]
    pub application_data: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VirtualServerUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_mode: Option<BootMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VirtualServerResizeRequest {
    pub preserve_disk: bool,
    pub plan_id: u64,
}

pub struct VirtualServersService<'c> {
    client: &'c Client,
}

impl<'c> VirtualServersService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(
        &self,
        ctx: &Context,
        mut data: VirtualServerCreateRequest,
    ) -> Result<VirtualServer, ApiError> {
        data.boot_mode.get_or_insert(BootMode::Disk);
        self.client.create(ctx, "servers", &data)
    }

    pub fn list(
        &self,
        ctx: &Context,
        filter: VirtualServerFilter,
    ) -> Result<Page<'c, VirtualServer>, ApiError> {
        self.client
            .list(ctx, "servers", &RequestOptions::new().with_filter(filter))
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<VirtualServer, ApiError> {
        self.client.get(ctx, &format!("servers/{id}"))
    }

    pub fn patch(
        &self,
        ctx: &Context,
        id: u64,
        data: &VirtualServerUpdateRequest,
    ) -> Result<VirtualServer, ApiError> {
        self.client.patch(ctx, &format!("servers/{id}"), data)
    }

    pub fn start(&self, ctx: &Context, id: u64) -> Result<Task, ApiError> {
        self.action(ctx, id, "start")
    }

    pub fn stop(&self, ctx: &Context, id: u64) -> Result<Task, ApiError> {
        self.action(ctx, id, "stop")
    }

    pub fn restart(&self, ctx: &Context, id: u64) -> Result<Task, ApiError> {
        self.action(ctx, id, "restart")
    }

    pub fn resize(
        &self,
        ctx: &Context,
        id: u64,
        data: &VirtualServerResizeRequest,
    ) -> Result<Task, ApiError> {
        let opts = RequestOptions::new().with_body(data)?;
        self.client
            .async_post(ctx, &format!("servers/{id}/resize"), &opts)
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<Task, ApiError> {
        self.client.async_delete(ctx, &format!("servers/{id}"))
    }

    fn action(&self, ctx: &Context, id: u64, action: &str) -> Result<Task, ApiError> {
        self.client
            .async_post(ctx, &format!("servers/{id}/{action}"), &RequestOptions::new())
    }
}
