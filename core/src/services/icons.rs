use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::IconFilter;
use crate::pagination::Page;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    #[default]
    Os,
    Application,
    Flags,
}

impl IconType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconType::Os => "os",
            IconType::Application => "application",
            IconType::Flags => "flags",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Icon {
    pub id: u64,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: IconType,
}

/// Read-only catalogue of icons for OS images, applications and locations.
pub struct IconsService<'c> {
    client: &'c Client,
}

impl<'c> IconsService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn list(&self, ctx: &Context, filter: IconFilter) -> Result<Page<'c, Icon>, ApiError> {
        self.client
            .list(ctx, "icons", &RequestOptions::new().with_filter(filter))
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<Icon, ApiError> {
        self.client.get(ctx, &format!("icons/{id}"))
    }
}
