//! Service plans: the size, limits and pricing a virtual server is created
//! from. Every limit unit has a default, so a request built with
//! `..Default::default()` is always complete on the wire.

use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::PlanFilter;
use crate::pagination::Page;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtualizationType {
    #[default]
    Kvm,
    Vz,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Fb,
    Lvm,
    ThinLvm,
    Nfs,
    Vz,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Fb => "fb",
            StorageType::Lvm => "lvm",
            StorageType::ThinLvm => "thinlvm",
            StorageType::Nfs => "nfs",
            StorageType::Vz => "vz",
        }
    }
}

/// On-disk format of a server's volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Qcow2,
    Raw,
    Ploop,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Qcow2 => "qcow2",
            ImageFormat::Raw => "raw",
            ImageFormat::Ploop => "ploop",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskBandwidthUnit {
    #[default]
    Bps,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandwidthUnit {
    #[default]
    Kbps,
    Mbps,
    Gbps,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IopsUnit {
    #[default]
    Iops,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrafficUnit {
    #[default]
    Kb,
    Mb,
    Gb,
    Tb,
    Pb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountUnit {
    #[default]
    Units,
}

/// One limit of a plan. Disabled limits are still sent with their unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimit<U: Default> {
    pub is_enabled: bool,
    pub limit: u64,
    pub unit: U,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    pub disk_bandwidth: PlanLimit<DiskBandwidthUnit>,
    pub disk_iops: PlanLimit<IopsUnit>,
    pub network_incoming_bandwidth: PlanLimit<BandwidthUnit>,
    pub network_outgoing_bandwidth: PlanLimit<BandwidthUnit>,
    pub network_incoming_traffic: PlanLimit<TrafficUnit>,
    pub network_outgoing_traffic: PlanLimit<TrafficUnit>,
    pub network_total_traffic: PlanLimit<TrafficUnit>,
    pub network_reduce_bandwidth: PlanLimit<BandwidthUnit>,
    pub backups_number: PlanLimit<CountUnit>,
}

/// The limits that can change after a plan exists; disk limits are fixed
/// at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanUpdateLimits {
    pub network_incoming_bandwidth: PlanLimit<BandwidthUnit>,
    pub network_outgoing_bandwidth: PlanLimit<BandwidthUnit>,
    pub network_incoming_traffic: PlanLimit<TrafficUnit>,
    pub network_outgoing_traffic: PlanLimit<TrafficUnit>,
    pub network_total_traffic: PlanLimit<TrafficUnit>,
    pub network_reduce_bandwidth: PlanLimit<BandwidthUnit>,
    pub backups_number: PlanLimit<CountUnit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetLimitPolicy {
    #[default]
    Never,
    FirstDayOfMonth,
    VmCreatedDay,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalTrafficType {
    #[default]
    Separate,
    Total,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanParams {
    pub disk: u64,
    pub ram: u64,
    pub vcpu: u32,
    pub vcpu_units: u32,
    pub vcpu_limit: u32,
    pub io_priority: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanBackupSettings {
    pub is_incremental_backup_enabled: bool,
    pub incremental_backups_limit: u32,
}

/// Id and display name of a related resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub id: u64,
    pub name: String,
    pub virtualization_type: VirtualizationType,
    pub params: PlanParams,
    pub storage_type: StorageType,
    pub image_format: ImageFormat,
    pub is_default: bool,
    pub is_visible: bool,
    pub is_snapshots_enabled: bool,
    pub is_backup_available: bool,
    pub is_additional_ips_available: bool,
    pub backup_settings: PlanBackupSettings,
    pub backup_price: f64,
    pub limits: PlanLimits,
    pub tokens_per_hour: u64,
    pub tokens_per_month: u64,
    pub ip_tokens_per_hour: u64,
    pub ip_tokens_per_month: u64,
    pub reset_limit_policy: ResetLimitPolicy,
    #[serde(rename = "network_traffic_limit_type")]
    pub total_traffic_type: TotalTrafficType,
    pub available_locations: Vec<ResourceRef>,
    pub available_os_image_versions: Vec<ResourceRef>,
    pub available_applications: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanCreateRequest {
    pub name: String,
    pub virtualization_type: VirtualizationType,
    pub params: PlanParams,
    pub storage_type: StorageType,
    pub image_format: ImageFormat,
    pub limits: PlanLimits,
    pub tokens_per_hour: u64,
    pub tokens_per_month: u64,
    pub ip_tokens_per_hour: u64,
    pub ip_tokens_per_month: u64,
    pub is_visible: bool,
    pub is_default: bool,
    pub is_snapshots_enabled: bool,
    pub is_backup_available: bool,
    pub is_additional_ips_available: bool,
    pub backup_settings: PlanBackupSettings,
    pub backup_price: f64,
    pub reset_limit_policy: ResetLimitPolicy,
    #[serde(rename = "network_traffic_limit_type")]
    pub total_traffic_type: TotalTrafficType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_locations: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_os_image_versions: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_applications: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanUpdateRequest {
    pub name: String,
    pub limits: PlanUpdateLimits,
    pub tokens_per_hour: u64,
    pub tokens_per_month: u64,
    pub ip_tokens_per_hour: u64,
    pub ip_tokens_per_month: u64,
    pub is_visible: bool,
    pub is_default: bool,
    pub is_snapshots_enabled: bool,
    pub is_backup_available: bool,
    pub is_additional_ips_available: bool,
    pub backup_settings: PlanBackupSettings,
    pub backup_price: f64,
    pub reset_limit_policy: ResetLimitPolicy,
    #[serde(rename = "network_traffic_limit_type")]
    pub total_traffic_type: TotalTrafficType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_locations: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_os_image_versions: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_applications: Vec<u64>,
}

pub struct PlansService<'c> {
    client: &'c Client,
}

impl<'c> PlansService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn create(&self, ctx: &Context, data: &PlanCreateRequest) -> Result<Plan, ApiError> {
        self.client.create(ctx, "plans", data)
    }

    pub fn list(&self, ctx: &Context, filter: PlanFilter) -> Result<Page<'c, Plan>, ApiError> {
        self.client
            .list(ctx, "plans", &RequestOptions::new().with_filter(filter))
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<Plan, ApiError> {
        self.client.get(ctx, &format!("plans/{id}"))
    }

    pub fn update(&self, ctx: &Context, id: u64, data: &PlanUpdateRequest) -> Result<Plan, ApiError> {
        self.client.update(ctx, &format!("plans/{id}"), data)
    }

    pub fn delete(&self, ctx: &Context, id: u64) -> Result<(), ApiError> {
        self.client.sync_delete(ctx, &format!("plans/{id}"))
    }
}
