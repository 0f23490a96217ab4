use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::pagination::Page;
use crate::services::account::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub members: u32,
    pub is_owner: bool,
    pub is_default: bool,
    pub owner: User,
    pub servers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub struct ProjectsService<'c> {
    client: &'c Client,
}

impl<'c> ProjectsService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(&self, ctx: &Context, data: &ProjectCreateRequest) -> Result<Project, ApiError> {
        self.client.create(ctx, "projects", data)
    }

    pub fn list(&self, ctx: &Context) -> Result<Page<'c, Project>, ApiError> {
        self.client.list(ctx, "projects", &RequestOptions::new())
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<Project, ApiError> {
        self.client.get(ctx, &format!("projects/{id}"))
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("projects/{id}"))
    }
}
