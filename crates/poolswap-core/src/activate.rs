use crate::allocator::allocate_loop_device;
use crate::CoreError;
use poolswap_host::{HostBackend, LoopDevice};
use poolswap_schema::{SwapSize, SWAPFILE_NAME};
use std::fs::{self, OpenOptions, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SWAPFILE_MODE: u32 = 0o600;

pub fn swapfile_path(mount_path: &Path) -> PathBuf {
    mount_path.join(SWAPFILE_NAME)
}

/// Recreate the swap file under `mount_path`, bind it to a free loop device
/// and enable swapping on it.
///
/// Steps run strictly in order and nothing is rolled back: a failure leaves
/// the host as far as it got. Nothing is touched unless `mount_path` is an
/// active mount point.
pub fn activate_swap(
    host: &dyn HostBackend,
    mount_path: &Path,
    size: SwapSize,
) -> Result<LoopDevice, CoreError> {
    if !host.is_mount_point(mount_path)? {
        return Err(CoreError::NotMounted(mount_path.to_path_buf()));
    }

    let file = swapfile_path(mount_path);
    remove_existing(&file)?;
    allocate_file(&file, size)?;
    restrict_permissions(&file)?;

    info!("formatting {} as swap", file.display());
    host.format_swap(&file)?;

    let device = allocate_loop_device(host)?;
    info!("binding {} to {device}", file.display());
    host.bind(&file, device)?;

    host.activate(device)?;
    info!("swap active on {device} ({size})");
    Ok(device)
}

fn remove_existing(file: &Path) -> Result<(), CoreError> {
    match fs::remove_file(file) {
        Ok(()) => {
            debug!("removed previous swap file {}", file.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::SwapFile {
            action: "remove",
            path: file.to_path_buf(),
            source,
        }),
    }
}

fn allocate_file(file: &Path, size: SwapSize) -> Result<(), CoreError> {
    let map_err = |source| CoreError::SwapFile {
        action: "allocate",
        path: file.to_path_buf(),
        source,
    };
    info!("allocating {} ({size})", file.display());
    let handle = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(SWAPFILE_MODE)
        .open(file)
        .map_err(map_err)?;
    handle.set_len(size.bytes()).map_err(map_err)?;
    handle.sync_all().map_err(map_err)
}

fn restrict_permissions(file: &Path) -> Result<(), CoreError> {
    fs::set_permissions(file, Permissions::from_mode(SWAPFILE_MODE)).map_err(|source| {
        CoreError::SwapFile {
            action: "chmod",
            path: file.to_path_buf(),
            source,
        }
    })
}
