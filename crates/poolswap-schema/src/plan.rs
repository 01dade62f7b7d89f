use crate::attributes::DatasetAttributes;
use crate::config::{ConfigError, ConfigV1, StartupSection};
use crate::size::SwapSize;
use crate::types::{DatasetName, PoolName};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the swap file below the dataset mountpoint.
pub const SWAPFILE_NAME: &str = "swapfile";

/// Validated input to a provisioning run.
///
/// Pool order is preserved and duplicates are kept: each entry is one
/// reconcile-and-activate pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub pools: Vec<PoolName>,
    pub dataset: DatasetName,
    pub size: SwapSize,
    pub create: bool,
    pub mountpoint: PathBuf,
    pub attributes: DatasetAttributes,
}

impl ProvisionPlan {
    pub fn swapfile_path(&self) -> PathBuf {
        self.mountpoint.join(SWAPFILE_NAME)
    }
}

/// Validated encrypted-disk startup sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupPlan {
    pub device: String,
    pub mapper_name: String,
    pub key_file: Option<PathBuf>,
    pub pool: PoolName,
    pub mount_source: String,
    pub mount_target: PathBuf,
    pub container: String,
    pub container_runtime: PathBuf,
}

impl ConfigV1 {
    /// Validate the `[swap]` section into a provisioning plan.
    pub fn provision_plan(&self) -> Result<ProvisionPlan, ConfigError> {
        if self.config_version != 1 {
            return Err(ConfigError::UnsupportedVersion(self.config_version));
        }

        if self.swap.pools.is_empty() {
            return Err(ConfigError::NoPools);
        }
        let mut pools = Vec::with_capacity(self.swap.pools.len());
        for raw in &self.swap.pools {
            let name = raw.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyPool);
            }
            pools.push(PoolName::new(name));
        }

        let dataset = self.swap.dataset.trim();
        if dataset.is_empty() || dataset.contains('/') {
            return Err(ConfigError::InvalidDataset(self.swap.dataset.clone()));
        }

        let size = self.swap.parsed_size()?;
        if size.bytes() == 0 {
            return Err(ConfigError::ZeroSize);
        }

        if !self.swap.mountpoint.is_absolute() {
            return Err(ConfigError::RelativeMountpoint(
                self.swap.mountpoint.display().to_string(),
            ));
        }

        Ok(ProvisionPlan {
            pools,
            dataset: DatasetName::new(dataset),
            size,
            create: self.swap.create,
            mountpoint: self.swap.mountpoint.clone(),
            attributes: self.swap.attributes.clone(),
        })
    }

    /// Validate the `[startup]` section into a startup plan.
    pub fn startup_plan(&self) -> Result<StartupPlan, ConfigError> {
        if self.config_version != 1 {
            return Err(ConfigError::UnsupportedVersion(self.config_version));
        }
        let section = self
            .startup
            .as_ref()
            .ok_or(ConfigError::NoStartupSection)?;
        section.validate()
    }
}

impl StartupSection {
    fn validate(&self) -> Result<StartupPlan, ConfigError> {
        let required = [
            ("device", self.device.trim()),
            ("mapper_name", self.mapper_name.trim()),
            ("pool", self.pool.trim()),
            ("mount_source", self.mount_source.trim()),
            ("container", self.container.trim()),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ConfigError::MissingStartupField(field));
            }
        }
        if self.mount_target.as_os_str().is_empty() {
            return Err(ConfigError::MissingStartupField("mount_target"));
        }
        if !self.mount_target.is_absolute() {
            return Err(ConfigError::RelativeMountpoint(
                self.mount_target.display().to_string(),
            ));
        }

        Ok(StartupPlan {
            device: self.device.trim().to_owned(),
            mapper_name: self.mapper_name.trim().to_owned(),
            key_file: self.key_file.clone(),
            pool: PoolName::new(self.pool.trim()),
            mount_source: self.mount_source.trim().to_owned(),
            mount_target: self.mount_target.clone(),
            container: self.container.trim().to_owned(),
            container_runtime: self.container_runtime.clone(),
        })
    }
}
