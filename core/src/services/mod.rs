//! Typed per-resource wrappers over the `Client` verb helpers.
//!
//! Each service borrows the client and maps one resource's endpoints to the
//! right verb and expected status. They carry no state of their own.

pub mod account;
pub mod icons;
pub mod ip_blocks;
pub mod locations;
pub mod os_images;
pub mod plans;
pub mod projects;
pub mod ssh_keys;
pub mod tasks;
pub mod virtual_servers;

use crate::client::Client;

use self::account::AccountService;
use self::icons::IconsService;
use self::ip_blocks::IpBlocksService;
use self::locations::LocationsService;
use self::os_images::{OsImageVersionsService, OsImagesService};
use self::plans::PlansService;
use self::projects::ProjectsService;
use self::ssh_keys::SshKeysService;
use self::tasks::TasksService;
use self::virtual_servers::VirtualServersService;

impl Client {
    pub fn account(&self) -> AccountService<'_> {
        AccountService::new(self)
    }

    pub fn icons(&self) -> IconsService<'_> {
        IconsService::new(self)
    }

    pub fn ip_blocks(&self) -> IpBlocksService<'_> {
        IpBlocksService::new(self)
    }

    pub fn locations(&self) -> LocationsService<'_> {
        LocationsService::new(self)
    }

    pub fn os_images(&self) -> OsImagesService<'_> {
        OsImagesService::new(self)
    }

    pub fn os_image_versions(&self) -> OsImageVersionsService<'_> {
        OsImageVersionsService::new(self)
    }

    pub fn plans(&self) -> PlansService<'_> {
        PlansService::new(self)
    }

    pub fn projects(&self) -> ProjectsService<'_> {
        ProjectsService::new(self)
    }

    pub fn ssh_keys(&self) -> SshKeysService<'_> {
        SshKeysService::new(self)
    }

    pub fn tasks(&self) -> TasksService<'_> {
        TasksService::new(self)
    }

    pub fn virtual_servers(&self) -> VirtualServersService<'_> {
        VirtualServersService::new(self)
    }
}
