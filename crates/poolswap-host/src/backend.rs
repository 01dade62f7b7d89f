use crate::HostError;
use poolswap_schema::{DatasetAttributes, DatasetName, PoolName, ToolPaths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a `/dev/loopN` block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoopDevice(u32);

impl LoopDevice {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    pub fn path(self) -> PathBuf {
        PathBuf::from(format!("/dev/loop{}", self.0))
    }
}

impl fmt::Display for LoopDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/dev/loop{}", self.0)
    }
}

/// Host collaborators used by swap provisioning.
///
/// Each method performs exactly one external effect or query; sequencing and
/// policy live in the orchestration crate.
pub trait HostBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    fn dataset_exists(&self, pool: &PoolName, dataset: &DatasetName) -> Result<bool, HostError>;

    /// Create `<pool>/<dataset>` mounted at `mountpoint` with every attribute set.
    fn dataset_create(
        &self,
        pool: &PoolName,
        dataset: &DatasetName,
        mountpoint: &Path,
        attributes: &DatasetAttributes,
    ) -> Result<(), HostError>;

    fn get_attribute(
        &self,
        pool: &PoolName,
        dataset: &DatasetName,
        key: &str,
    ) -> Result<String, HostError>;

    fn is_mount_point(&self, path: &Path) -> Result<bool, HostError>;

    fn is_bound(&self, device: LoopDevice) -> Result<bool, HostError>;

    fn bind(&self, file: &Path, device: LoopDevice) -> Result<(), HostError>;

    fn format_swap(&self, file: &Path) -> Result<(), HostError>;

    fn activate(&self, device: LoopDevice) -> Result<(), HostError>;
}

/// Host collaborators used by the encrypted-disk startup sequence. Every
/// startup host is also a provisioning host, which supplies `name()`.
pub trait StartupBackend: HostBackend {
    /// Open a LUKS volume as `/dev/mapper/<mapper_name>`. Without a key file the
    /// tool prompts on the terminal.
    fn unlock_volume(
        &self,
        device: &str,
        mapper_name: &str,
        key_file: Option<&Path>,
    ) -> Result<(), HostError>;

    fn import_pool(&self, pool: &PoolName) -> Result<(), HostError>;

    fn mount(&self, source: &str, target: &Path) -> Result<(), HostError>;

    fn start_container(&self, runtime: &Path, container: &str) -> Result<(), HostError>;
}

pub fn select_backend(name: &str, tools: &ToolPaths) -> Result<Box<dyn HostBackend>, HostError> {
    match name {
        "system" => Ok(Box::new(crate::system::SystemHost::new(tools.clone()))),
        "mock" => Ok(Box::new(crate::mock::MockHost::new())),
        other => Err(HostError::BackendUnavailable(other.to_owned())),
    }
}

pub fn select_startup_backend(
    name: &str,
    tools: &ToolPaths,
) -> Result<Box<dyn StartupBackend>, HostError> {
    match name {
        "system" => Ok(Box::new(crate::system::SystemHost::new(tools.clone()))),
        "mock" => Ok(Box::new(crate::mock::MockHost::new())),
        other => Err(HostError::BackendUnavailable(other.to_owned())),
    }
}
