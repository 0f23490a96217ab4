use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::LocationFilter;
use crate::pagination::Page;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub is_default: bool,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sent as `null` when unset.
    #[serde(default)]
    pub icon_id: Option<u64>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compute_resources: Vec<u64>,
}

pub struct LocationsService<'c> {
    client: &'c Client,
}

impl<'c> LocationsService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(&self, ctx: &Context, data: &LocationCreateRequest) -> Result<Location, ApiError> {
        self.client.create(ctx, "locations", data)
    }

    pub fn list(&self, ctx: &Context, filter: LocationFilter) -> Result<Page<'c, Location>, ApiError> {
        self.client
            .list(ctx, "locations", &RequestOptions::new().with_filter(filter))
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<Location, ApiError> {
        self.client.get(ctx, &format!("locations/{id}"))
    }

    pub fn update(
        &self,
        ctx: &Context,
        id: u64,
        data: &LocationCreateRequest,
    ) -> Result<Location, ApiError> {
        self.client.update(ctx, &format!("locations/{id}"), data)
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("locations/{id}"))
    }
}
