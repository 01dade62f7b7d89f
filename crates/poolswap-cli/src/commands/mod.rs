pub mod completions;
pub mod doctor;
pub mod install_unit;
pub mod man_pages;
pub mod provision;
pub mod startup;

use crate::SwapArgs;
use indicatif::{ProgressBar, ProgressStyle};
use poolswap_core::CoreError;
use poolswap_schema::{AttributeOverrides, ConfigV1};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_PRECONDITION: u8 = 3;
pub const EXIT_EXHAUSTED: u8 = 4;

/// Global flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub backend: Option<String>,
    pub json: bool,
}

impl Context {
    /// Load the config file and apply the global `--backend` override.
    pub fn load_config(&self) -> Result<ConfigV1, String> {
        let mut config = poolswap_schema::load_config(self.config_path.as_deref())
            .map_err(|e| format!("config error: {e}"))?;
        if let Some(backend) = &self.backend {
            config.host.backend.clone_from(backend);
        }
        Ok(config)
    }
}

impl SwapArgs {
    /// Layer command-line flags over the `[swap]` and `[host]` sections.
    pub fn apply(self, config: &mut ConfigV1) {
        if !self.pools.is_empty() {
            config.swap.pools = self.pools;
        }
        if let Some(dataset) = self.dataset {
            config.swap.dataset = dataset;
        }
        if let Some(size) = self.size {
            config.swap.size = size;
        }
        if self.create {
            config.swap.create = true;
        }
        if self.no_create {
            config.swap.create = false;
        }
        if let Some(mountpoint) = self.mountpoint {
            config.swap.mountpoint = mountpoint;
        }
        if let Some(lock_file) = self.lock_file {
            config.host.lock_file = lock_file;
        }
        AttributeOverrides {
            dedup: self.dedup,
            compression: self.compression,
            logbias: self.logbias,
            atime: self.atime,
            relatime: self.relatime,
            recordsize: self.recordsize,
            auto_snapshot: self.auto_snapshot,
            checksum: self.checksum,
            primarycache: self.primarycache,
            secondarycache: self.secondarycache,
            sync: self.sync,
        }
        .apply(&mut config.swap.attributes);
    }
}

/// Render a core error with the prefix `main` maps to an exit code.
pub fn describe_core_error(err: &CoreError) -> String {
    match err {
        CoreError::Config(_) => err.to_string(),
        CoreError::NoFreeDevice { .. } => format!("resource exhausted: {err}"),
        e if e.is_precondition() => format!("precondition failed: {e}"),
        e => e.to_string(),
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "activated" | "created" => Style::new().green().apply_to(status).to_string(),
        "existing" => Style::new().cyan().apply_to(status).to_string(),
        "skipped" => Style::new().yellow().apply_to(status).to_string(),
        "absent" => Style::new().red().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}
