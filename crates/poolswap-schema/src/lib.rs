//! Configuration schema for poolswap.
//!
//! This crate defines the input layer: TOML configuration parsing (`ConfigV1`),
//! human-readable swap sizes (`SwapSize`), the ZFS tuning attribute set
//! (`DatasetAttributes`), and the validated plans (`ProvisionPlan`,
//! `StartupPlan`) consumed by the orchestration crate.

pub mod attributes;
pub mod config;
pub mod plan;
pub mod size;
pub mod types;

pub use attributes::{AttributeOverrides, DatasetAttributes};
pub use config::{
    load_config, parse_config_file, parse_config_str, ConfigError, ConfigV1, HostSection,
    StartupSection, SwapSection, ToolPaths, DEFAULT_CONFIG_PATH, DEFAULT_DATASET,
    DEFAULT_LOCK_FILE, DEFAULT_MOUNTPOINT, DEFAULT_SIZE,
};
pub use plan::{ProvisionPlan, StartupPlan, SWAPFILE_NAME};
pub use size::{SizeError, SwapSize};
pub use types::{dataset_path, DatasetName, PoolName};
