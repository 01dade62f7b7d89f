//! Host tool backends for poolswap.
//!
//! This crate is the execution layer: the pluggable `HostBackend` trait (ZFS
//! datasets, mount inspection, loop devices, swap) and `StartupBackend` trait
//! (LUKS unlock, pool import, mount, container start), a `system` backend that
//! shells out to the host tools, an in-memory `mock` backend with a call
//! journal, and prerequisite checking.

pub mod backend;
mod command;
pub mod mock;
pub mod prereq;
pub mod system;

pub use backend::{
    select_backend, select_startup_backend, HostBackend, LoopDevice, StartupBackend,
};
pub use mock::MockHost;
pub use prereq::{check_startup_prereqs, check_swap_prereqs, format_missing, MissingPrereq};
pub use system::SystemHost;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("`{tool} {args}` failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        args: String,
        status: String,
        stderr: String,
    },
    #[error("unexpected output from {tool}: {output:?}")]
    UnexpectedOutput { tool: String, output: String },
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("mock backend: {0}")]
    Mock(String),
}
