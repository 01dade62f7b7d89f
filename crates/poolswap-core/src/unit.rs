use crate::CoreError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

pub const PROVISION_UNIT: &str = "poolswap-provision.service";
pub const STARTUP_UNIT: &str = "poolswap-startup.service";

#[derive(Debug, Clone)]
pub struct UnitOptions {
    /// Absolute path of the `poolswap` binary the units execute.
    pub binary: PathBuf,
    pub config: PathBuf,
    pub systemd_dir: PathBuf,
    pub include_startup: bool,
    /// Run `systemctl daemon-reload` after writing.
    pub reload: bool,
}

pub fn render_provision_unit(binary: &Path, config: &Path) -> String {
    format!(
        r"[Unit]
Description=Provision ZFS-backed swap on loop devices
DefaultDependencies=no
After=zfs-mount.service
Requires=zfs-mount.service
Before=swap.target

[Service]
Type=oneshot
RemainAfterExit=yes
ExecStart={} --config {} provision

[Install]
WantedBy=swap.target
",
        binary.display(),
        config.display()
    )
}

pub fn render_startup_unit(binary: &Path, config: &Path) -> String {
    format!(
        r"[Unit]
Description=Unlock encrypted pool, mount data and start container
After=network-online.target docker.service
Wants=network-online.target

[Service]
Type=oneshot
RemainAfterExit=yes
ExecStart={} --config {} startup

[Install]
WantedBy=multi-user.target
",
        binary.display(),
        config.display()
    )
}

/// Write the unit files and return their paths.
pub fn install_units(options: &UnitOptions) -> Result<Vec<PathBuf>, CoreError> {
    fs::create_dir_all(&options.systemd_dir)?;

    let mut units = vec![(
        PROVISION_UNIT,
        render_provision_unit(&options.binary, &options.config),
    )];
    if options.include_startup {
        units.push((
            STARTUP_UNIT,
            render_startup_unit(&options.binary, &options.config),
        ));
    }

    let mut written = Vec::with_capacity(units.len());
    for (name, content) in units {
        let path = options.systemd_dir.join(name);
        fs::write(&path, content)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;
        info!("installed unit {}", path.display());
        written.push(path);
    }

    if options.reload {
        reload_systemd();
    }
    Ok(written)
}

fn reload_systemd() {
    match Command::new("systemctl").arg("daemon-reload").output() {
        Ok(result) if result.status.success() => info!("systemd daemon reloaded"),
        Ok(result) => warn!(
            "systemctl daemon-reload failed: {}",
            String::from_utf8_lossy(&result.stderr).trim()
        ),
        Err(e) => warn!("systemctl daemon-reload failed: {e}"),
    }
}
