use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::context::Context;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub status: String,
    pub created_at: String,
}

/// The account the client is authenticated as.
pub struct AccountService<'c> {
    client: &'c Client,
}

impl<'c> AccountService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn get(&self, ctx: &Context) -> Result<User, ApiError> {
        self.client.get(ctx, "account")
    }
}
