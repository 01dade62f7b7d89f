//! Core orchestration for poolswap.
//!
//! This crate ties the validated plans from `poolswap-schema` to the host
//! backends from `poolswap-host`: loop-device allocation, idempotent dataset
//! reconciliation, swap-file activation, the multi-pool provisioning loop, the
//! encrypted-disk startup sequence, systemd unit rendering, and the run lock
//! that keeps two provisioning runs from racing.

pub mod activate;
pub mod allocator;
pub mod concurrency;
pub mod provision;
pub mod reconcile;
pub mod startup;
pub mod unit;

pub use activate::{activate_swap, swapfile_path};
pub use allocator::{allocate_loop_device, allocate_within, LOOP_NAMESPACE_SIZE};
pub use concurrency::RunLock;
pub use provision::{
    PoolReport, PoolStatus, ProvisionEvent, ProvisionOptions, ProvisionReport, Provisioner,
};
pub use reconcile::{ensure_dataset, DatasetDescriptor, DatasetOutcome};
pub use startup::{run_startup, StartupReport, StartupStep};
pub use unit::{install_units, render_provision_unit, render_startup_unit, UnitOptions};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no free loop device among /dev/loop0../dev/loop{}", .namespace_size.saturating_sub(1))]
    NoFreeDevice { namespace_size: u32 },
    #[error("dataset {dataset} exists with mountpoint '{actual}', expected '{expected}'")]
    ExistsWithWrongMountpoint {
        dataset: String,
        expected: String,
        actual: String,
    },
    #[error("{} is not a mount point", .0.display())]
    NotMounted(PathBuf),
    #[error("failed to {action} {}: {source}", .path.display())]
    SwapFile {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("host command failed: {0}")]
    Host(#[from] poolswap_host::HostError),
    #[error("config error: {0}")]
    Config(#[from] poolswap_schema::ConfigError),
    #[error("run lock: {0}")]
    Lock(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for failures caused by the host being in the wrong state rather
    /// than by a tool misbehaving.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotMounted(_) | Self::ExistsWithWrongMountpoint { .. }
        )
    }
}
