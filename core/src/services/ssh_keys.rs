use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::pagination::Page;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyCreateRequest {
    pub name: String,
    pub body: String,
    pub user_id: u64,
}

pub struct SshKeysService<'c> {
    client: &'c Client,
}

impl<'c> SshKeysService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(&self, ctx: &Context, data: &SshKeyCreateRequest) -> Result<SshKey, ApiError> {
        self.client.create(ctx, "ssh_keys", data)
    }

    pub fn list(&self, ctx: &Context) -> Result<Page<'c, SshKey>, ApiError> {
        self.client.list(ctx, "ssh_keys", &RequestOptions::new())
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<SshKey, ApiError> {
        self.client.get(ctx, &format!("ssh_keys/{id}"))
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("ssh_keys/{id}"))
    }
}
