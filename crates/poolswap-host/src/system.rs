use crate::backend::{HostBackend, LoopDevice, StartupBackend};
use crate::command::ToolCommand;
use crate::HostError;
use poolswap_schema::{dataset_path, DatasetAttributes, DatasetName, PoolName, ToolPaths};
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Backend that drives the real host tools.
pub struct SystemHost {
    zfs: ToolCommand,
    zpool: ToolCommand,
    mountpoint: ToolCommand,
    losetup: ToolCommand,
    mkswap: ToolCommand,
    swapon: ToolCommand,
    cryptsetup: ToolCommand,
    mount: ToolCommand,
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new(ToolPaths::default())
    }
}

impl SystemHost {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            zfs: ToolCommand::new(tools.zfs),
            zpool: ToolCommand::new(tools.zpool),
            mountpoint: ToolCommand::new(tools.mountpoint),
            losetup: ToolCommand::new(tools.losetup),
            mkswap: ToolCommand::new(tools.mkswap),
            swapon: ToolCommand::new(tools.swapon),
            cryptsetup: ToolCommand::new(tools.cryptsetup),
            mount: ToolCommand::new(tools.mount),
        }
    }
}

impl HostBackend for SystemHost {
    fn name(&self) -> &'static str {
        "system"
    }

    fn available(&self) -> bool {
        self.zfs.run(["version"]).is_ok_and(|o| o.success())
    }

    fn dataset_exists(&self, pool: &PoolName, dataset: &DatasetName) -> Result<bool, HostError> {
        let target = dataset_path(pool, dataset);
        let args = ["list", "-H", "-o", "name", target.as_str()];
        let out = self.zfs.run(args)?;
        if out.success() {
            return Ok(true);
        }
        if dataset_missing(&out.stderr) {
            return Ok(false);
        }
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        Err(self.zfs.failure(&args, &out))
    }

    fn dataset_create(
        &self,
        pool: &PoolName,
        dataset: &DatasetName,
        mountpoint: &Path,
        attributes: &DatasetAttributes,
    ) -> Result<(), HostError> {
        self.zfs
            .run_checked(create_args(pool, dataset, mountpoint, attributes))?;
        Ok(())
    }

    fn get_attribute(
        &self,
        pool: &PoolName,
        dataset: &DatasetName,
        key: &str,
    ) -> Result<String, HostError> {
        let target = dataset_path(pool, dataset);
        let stdout = self
            .zfs
            .run_checked(["get", "-H", "-o", "value", key, target.as_str()])?;
        let value = stdout.trim();
        if value.is_empty() || value.contains('\n') {
            return Err(HostError::UnexpectedOutput {
                tool: self.zfs.binary().display().to_string(),
                output: stdout,
            });
        }
        Ok(value.to_owned())
    }

    fn is_mount_point(&self, path: &Path) -> Result<bool, HostError> {
        let out = self.mountpoint.run([OsString::from("-q"), path.into()])?;
        Ok(out.success())
    }

    fn is_bound(&self, device: LoopDevice) -> Result<bool, HostError> {
        // `losetup <dev>` only succeeds when the device has a backing file.
        let args = [device.path().into_os_string()];
        let out = self.losetup.run(&args)?;
        if out.success() {
            return Ok(true);
        }
        if loop_unbound(&out.stderr) {
            return Ok(false);
        }
        Err(self.losetup.failure(&args, &out))
    }

    fn bind(&self, file: &Path, device: LoopDevice) -> Result<(), HostError> {
        self.losetup
            .run_checked([device.path().into_os_string(), file.into()])?;
        Ok(())
    }

    fn format_swap(&self, file: &Path) -> Result<(), HostError> {
        self.mkswap.run_checked([file])?;
        Ok(())
    }

    fn activate(&self, device: LoopDevice) -> Result<(), HostError> {
        self.swapon.run_checked([device.path()])?;
        Ok(())
    }
}

impl StartupBackend for SystemHost {
    fn unlock_volume(
        &self,
        device: &str,
        mapper_name: &str,
        key_file: Option<&Path>,
    ) -> Result<(), HostError> {
        if Path::new("/dev/mapper").join(mapper_name).exists() {
            debug!("/dev/mapper/{mapper_name} already present; skipping unlock");
            return Ok(());
        }
        match key_file {
            Some(key) => {
                self.cryptsetup.run_checked([
                    OsString::from("open"),
                    device.into(),
                    mapper_name.into(),
                    "--key-file".into(),
                    key.into(),
                ])?;
            }
            None => self
                .cryptsetup
                .run_interactive(["open", device, mapper_name])?,
        }
        Ok(())
    }

    fn import_pool(&self, pool: &PoolName) -> Result<(), HostError> {
        let listed = self.zpool.run(["list", "-H", "-o", "name", pool.as_str()])?;
        if listed.success() {
            debug!("pool {pool} already imported");
            return Ok(());
        }
        self.zpool.run_checked(["import", pool.as_str()])?;
        Ok(())
    }

    fn mount(&self, source: &str, target: &Path) -> Result<(), HostError> {
        if self.is_mount_point(target)? {
            debug!("{} already mounted", target.display());
            return Ok(());
        }
        self.mount
            .run_checked([OsString::from(source), target.into()])?;
        Ok(())
    }

    fn start_container(&self, runtime: &Path, container: &str) -> Result<(), HostError> {
        ToolCommand::new(runtime).run_checked(["start", container])?;
        Ok(())
    }
}

fn create_args(
    pool: &PoolName,
    dataset: &DatasetName,
    mountpoint: &Path,
    attributes: &DatasetAttributes,
) -> Vec<OsString> {
    let mut args = vec![OsString::from("create")];
    let mut mount_opt = OsString::from("mountpoint=");
    mount_opt.push(mountpoint);
    args.push("-o".into());
    args.push(mount_opt);
    for (key, value) in attributes.properties() {
        args.push("-o".into());
        args.push(format!("{key}={value}").into());
    }
    args.push(dataset_path(pool, dataset).into());
    args
}

fn dataset_missing(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("does not exist")
}

/// ENXIO from `losetup <dev>` means no backing file. A missing device node is
/// unbound too; anything else (permissions, a crashed tool) is a real failure.
fn loop_unbound(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such device or address") || stderr.contains("no such file or directory")
}
