//! Query filters for list operations.
//!
//! Filters are rendered as `filter[<field>]=<value>` query parameters. A
//! field set twice keeps the last value.

use std::collections::BTreeMap;

use crate::services::icons::IconType;
use crate::services::plans::{ImageFormat, StorageType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    params: BTreeMap<String, String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, field: &str, value: impl Into<String>) -> Self {
        self.params.insert(format!("filter[{field}]"), value.into());
        self
    }

    pub fn add_int(self, field: &str, value: u64) -> Self {
        self.add(field, value.to_string())
    }

    /// Raw (non-`filter[...]`) parameter, e.g. `page` or `per_page`.
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn page(self, page: u64) -> Self {
        self.param("page", page.to_string())
    }

    pub fn per_page(self, per_page: u64) -> Self {
        self.param("per_page", per_page.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter(Filter);

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_action(self, action: &str) -> Self {
        Self(self.0.add("action", action))
    }

    pub fn by_status(self, status: &str) -> Self {
        Self(self.0.add("status", status))
    }

    pub fn by_compute_resource_id(self, id: u64) -> Self {
        Self(self.0.add_int("compute_resource_id", id))
    }

    pub fn by_compute_resource_vm_id(self, id: u64) -> Self {
        Self(self.0.add_int("compute_resource_vm_id", id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualServerFilter(Filter);

impl VirtualServerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_user_id(self, id: u64) -> Self {
        Self(self.0.add_int("user_id", id))
    }

    pub fn by_status(self, status: &str) -> Self {
        Self(self.0.add("status", status))
    }

    pub fn by_compute_resource_id(self, id: u64) -> Self {
        Self(self.0.add_int("compute_resource_id", id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFilter(Filter);

impl LocationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_name(self, name: &str) -> Self {
        Self(self.0.add("name", name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanFilter(Filter);

impl PlanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substring match on the plan name.
    pub fn by_name(self, name: &str) -> Self {
        Self(self.0.add("search", name))
    }

    pub fn by_storage_type(self, storage_type: StorageType) -> Self {
        Self(self.0.add("storage_type", storage_type.as_str()))
    }

    pub fn by_image_format(self, format: ImageFormat) -> Self {
        Self(self.0.add("image_format", format.as_str()))
    }

    pub fn by_disk_size(self, gib: u64) -> Self {
        Self(self.0.add_int("disk", gib))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsImageFilter(Filter);

impl OsImageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_name(self, name: &str) -> Self {
        Self(self.0.add("search", name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconFilter(Filter);

impl IconFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_name(self, name: &str) -> Self {
        Self(self.0.add("search", name))
    }

    pub fn by_type(self, kind: IconType) -> Self {
        Self(self.0.add("type", kind.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpBlockFilter(Filter);

impl IpBlockFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_name(self, name: &str) -> Self {
        Self(self.0.add("search", name))
    }
}

macro_rules! into_filter {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Filter {
                fn from(f: $ty) -> Filter {
                    f.0
                }
            }
        )*
    };
}

into_filter!(
    TaskFilter,
    VirtualServerFilter,
    LocationFilter,
    PlanFilter,
    OsImageFilter,
    IconFilter,
    IpBlockFilter
);
