use std::fmt;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(binary: &Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }
    Command::new("which")
        .arg(binary)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn require(missing: &mut Vec<MissingPrereq>, binary: &Path, purpose: &'static str, hint: &'static str) {
    if !command_exists(binary) {
        missing.push(MissingPrereq {
            name: binary.display().to_string(),
            purpose,
            install_hint: hint,
        });
    }
}

const UTIL_LINUX: &str = "part of util-linux (usually pre-installed)";
const ZFS_UTILS: &str =
    "apt install zfsutils-linux | dnf install zfs | pacman -S zfs-utils | zypper install zfs";

/// Check the tools needed by `provision`. Empty list means all are present.
pub fn check_swap_prereqs(tools: &poolswap_schema::ToolPaths) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    require(&mut missing, &tools.zfs, "dataset creation and inspection", ZFS_UTILS);
    require(&mut missing, &tools.mountpoint, "mount verification", UTIL_LINUX);
    require(&mut missing, &tools.losetup, "loop device binding", UTIL_LINUX);
    require(&mut missing, &tools.mkswap, "swap area formatting", UTIL_LINUX);
    require(&mut missing, &tools.swapon, "swap activation", UTIL_LINUX);
    missing
}

/// Check the tools needed by `startup`.
pub fn check_startup_prereqs(
    tools: &poolswap_schema::ToolPaths,
    container_runtime: &Path,
) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    require(
        &mut missing,
        &tools.cryptsetup,
        "LUKS volume unlock",
        "apt install cryptsetup | dnf install cryptsetup | pacman -S cryptsetup",
    );
    require(&mut missing, &tools.zpool, "pool import", ZFS_UTILS);
    require(&mut missing, &tools.mount, "filesystem mount", UTIL_LINUX);
    require(&mut missing, &tools.mountpoint, "mount verification", UTIL_LINUX);
    require(
        &mut missing,
        container_runtime,
        "container start",
        "install docker or podman",
    );
    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\npoolswap requires these tools on the host.");
    msg
}
