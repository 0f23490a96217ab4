//! Pools of addresses handed out to servers. An IPv4 block is a `from`..`to`
//! range with a netmask; an IPv6 block is a `range` split into `subnet`-sized
//! allocations.

use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::IpBlockFilter;
use crate::pagination::Page;
use crate::services::plans::ResourceRef;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpVersion {
    #[default]
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpBlock {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub version: IpVersion,
    pub gateway: String,
    pub netmask: String,
    pub ns_1: String,
    pub ns_2: String,
    pub from: String,
    pub to: String,
    pub range: String,
    pub subnet: u32,
    pub compute_resources: Vec<ResourceRef>,
}

/// Create and update body. Fields of the other address family are left
/// empty and omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpBlockRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compute_resources: Vec<u64>,
    pub name: String,
    #[serde(rename = "type")]
    pub version: IpVersion,
    pub gateway: String,
    pub ns_1: String,
    pub ns_2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub netmask: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<u32>,
}

pub struct IpBlocksService<'c> {
    client: &'c Client,
}

impl<'c> IpBlocksService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(&self, ctx: &Context, data: &IpBlockRequest) -> Result<IpBlock, ApiError> {
        self.client.create(ctx, "ip_blocks", data)
    }

    pub fn list(&self, ctx: &Context, filter: IpBlockFilter) -> Result<Page<'c, IpBlock>, ApiError> {
        self.client
            .list(ctx, "ip_blocks", &RequestOptions::new().with_filter(filter))
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<IpBlock, ApiError> {
        self.client.get(ctx, &format!("ip_blocks/{id}"))
    }

    pub fn update(&self, ctx: &Context, id: u64, data: &IpBlockRequest) -> Result<IpBlock, ApiError> {
        self.client.update(ctx, &format!("ip_blocks/{id}"), data)
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("ip_blocks/{id}"))
    }
}
