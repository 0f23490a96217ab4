//! OS images and their versions. A server is created from an image
//! version (`VirtualServerCreateRequest::os_image_version_id`), not from the
//! image itself.

use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::OsImageFilter;
use crate::pagination::Page;
use crate::services::icons::Icon;
use crate::services::plans::{ResourceRef, VirtualizationType};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsImage {
    pub id: u64,
    pub name: String,
    pub icon: Icon,
    pub versions: Vec<OsImageVersion>,
    pub is_default: bool,
    pub is_visible: bool,
    pub position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OsImageRequest {
    pub name: String,
    /// Sent as `null` when unset.
    pub icon_id: Option<u64>,
    pub is_visible: bool,
}

/// cloud-init configuration flavour an image version boots with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudInitVersion {
    #[serde(rename = "v0")]
    V0,
    #[serde(rename = "v0-centos6")]
    V0Centos6,
    #[serde(rename = "v0-debian9")]
    V0Debian9,
    #[serde(rename = "v2")]
    V2,
    #[serde(rename = "v2-alpine")]
    V2Alpine,
    #[serde(rename = "v2-centos")]
    V2Centos,
    #[serde(rename = "v2-debian10")]
    V2Debian10,
    #[serde(rename = "cloudbase")]
    CloudBase,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsImageVersion {
    pub id: u64,
    pub virtualization_type: VirtualizationType,
    pub position: f64,
    pub version: String,
    pub url: String,
    pub cloud_init_version: Option<CloudInitVersion>,
    pub os_image_id: u64,
    pub is_visible: bool,
    pub is_ssh_keys_supported: bool,
    pub available_plans: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OsImageVersionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    pub version: String,
    pub virtualization_type: VirtualizationType,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_init_version: Option<CloudInitVersion>,
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_plans: Vec<u64>,
}

pub struct OsImagesService<'c> {
    client: &'c Client,
}

impl<'c> OsImagesService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(&self, ctx: &Context, data: &OsImageRequest) -> Result<OsImage, ApiError> {
        self.client.create(ctx, "os_images", data)
    }

    pub fn list(&self, ctx: &Context, filter: OsImageFilter) -> Result<Page<'c, OsImage>, ApiError> {
        self.client
            .list(ctx, "os_images", &RequestOptions::new().with_filter(filter))
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<OsImage, ApiError> {
        self.client.get(ctx, &format!("os_images/{id}"))
    }

    pub fn update(&self, ctx: &Context, id: u64, data: &OsImageRequest) -> Result<OsImage, ApiError> {
        self.client.update(ctx, &format!("os_images/{id}"), data)
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("os_images/{id}"))
    }

    pub fn create_version(
        &self,
        ctx: &Context,
        os_image_id: u64,
        data: &OsImageVersionRequest,
    ) -> Result<OsImageVersion, ApiError> {
        self.client
            .create(ctx, &format!("os_images/{os_image_id}/versions"), data)
    }

    /// Every version of the image, across all pages.
    pub fn list_versions(&self, ctx: &Context, os_image_id: u64) -> Result<Vec<OsImageVersion>, ApiError> {
        self.client
            .list(ctx, &format!("os_images/{os_image_id}/versions"), &RequestOptions::new())?
            .drain(ctx)
    }
}

/// Versions addressed directly by their own id.
pub struct OsImageVersionsService<'c> {
    client: &'c Client,
}

impl<'c> OsImageVersionsService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<OsImageVersion, ApiError> {
        self.client.get(ctx, &format!("os_image_versions/{id}"))
    }

    pub fn update(
        &self,
        ctx: &Context,
        id: u64,
        data: &OsImageVersionRequest,
    ) -> Result<OsImageVersion, ApiError> {
        self.client.update(ctx, &format!("os_image_versions/{id}"), data)
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("os_image_versions/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authenticator;
    use crate::config::ClientConfig;
    use crate::http::HttpMethod;
    use crate::testing::{reply, ScriptedTransport};
    use std::sync::Arc;
    use std::time::Duration;

    fn client(transport: Arc<ScriptedTransport>) -> Client {
        let config = ClientConfig::new("http://x/api/v1").with_retry_policy(0, Duration::from_millis(1));
        Client::with_transport(&config, &Authenticator::token("t"), transport).unwrap()
    }

    #[test]
    fn image_request_sends_null_icon() {
        let req = OsImageRequest {
            name: "Ubuntu".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"name": "Ubuntu", "icon_id": null, "is_visible": false})
        );
    }

    #[test]
    fn version_request_omits_unset_fields() {
        let req = OsImageVersionRequest {
            version: "22.04".to_string(),
            url: "http://images/jammy.qcow2".to_string(),
            cloud_init_version: Some(CloudInitVersion::V2),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["cloud_init_version"], "v2");
        assert_eq!(json["virtualization_type"], "kvm");
        assert!(json.get("position").is_none());
        assert!(json.get("available_plans").is_none());
    }

    #[test]
    fn create_version_then_manage_it_by_id() {
        let version = r#"{"data":{"id":11,"version":"22.04","os_image_id":5,"cloud_init_version":"v2-debian10"}}"#;
        let transport = ScriptedTransport::new(vec![
            reply(201, version),
            reply(200, version),
            reply(200, version),
            reply(204, ""),
        ]);
        let c = client(transport.clone());
        let ctx = Context::background();
        let req = OsImageVersionRequest {
            version: "22.04".to_string(),
            ..Default::default()
        };

        let created = c.os_images().create_version(&ctx, 5, &req).unwrap();
        assert_eq!(created.os_image_id, 5);
        assert_eq!(created.cloud_init_version, Some(CloudInitVersion::V2Debian10));

        let versions = c.os_image_versions();
        assert_eq!(versions.get(&ctx, created.id).unwrap().version, "22.04");
        versions.update(&ctx, created.id, &req).unwrap();
        versions.delete(&ctx, created.id).unwrap();

        let seen: Vec<(HttpMethod, String)> =
            transport.seen().into_iter().map(|r| (r.method, r.url)).collect();
        assert_eq!(
            seen,
            vec![
                (HttpMethod::Post, "http://x/api/v1/os_images/5/versions".to_string()),
                (HttpMethod::Get, "http://x/api/v1/os_image_versions/11".to_string()),
                (HttpMethod::Put, "http://x/api/v1/os_image_versions/11".to_string()),
                (HttpMethod::Delete, "http://x/api/v1/os_image_versions/11".to_string()),
            ]
        );
    }

    #[test]
    fn list_versions_follows_every_page() {
        let transport = ScriptedTransport::new(vec![
            reply(
                200,
                r#"{"data":[{"id":1,"version":"20.04"}],"links":{"next":"http://x/api/v1/os_images/5/versions?page=2"},"meta":{"current_page":1,"last_page":2}}"#,
            ),
            reply(
                200,
                r#"{"data":[{"id":2,"version":"22.04"}],"links":{"next":null},"meta":{"current_page":2,"last_page":2}}"#,
            ),
        ]);
        let c = client(transport);
        let versions = c.os_images().list_versions(&Context::background(), 5).unwrap();
        let ids: Vec<u64> = versions.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
