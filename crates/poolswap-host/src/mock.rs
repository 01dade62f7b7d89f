use crate::backend::{HostBackend, LoopDevice, StartupBackend};
use crate::HostError;
use poolswap_schema::{dataset_path, DatasetAttributes, DatasetName, PoolName};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// In-memory host used by tests and `--backend mock`.
///
/// Datasets, mounts, and loop bindings are tracked in memory; every call is
/// appended to a journal so tests can assert on ordering. Creating a dataset
/// also mounts it, as `zfs create` does. Swap files themselves live on the
/// real filesystem so size and mode can be checked.
pub struct MockHost {
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    datasets: BTreeMap<String, HashMap<String, String>>,
    mounted: BTreeSet<PathBuf>,
    bound: BTreeMap<u32, PathBuf>,
    formatted: BTreeSet<PathBuf>,
    active: BTreeSet<u32>,
    imported: BTreeSet<String>,
    unlocked: BTreeSet<String>,
    running: BTreeSet<String>,
    failures: Vec<(String, String)>,
    journal: Vec<String>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, HostError> {
        self.state
            .lock()
            .map_err(|e| HostError::Mock(format!("mutex poisoned: {e}")))
    }

    /// Register an existing dataset with the given mountpoint (not mounted).
    pub fn add_dataset(&self, pool: &str, dataset: &str, mountpoint: &Path) {
        if let Ok(mut state) = self.state() {
            let mut props = HashMap::new();
            props.insert(
                "mountpoint".to_owned(),
                mountpoint.to_string_lossy().into_owned(),
            );
            state.datasets.insert(format!("{pool}/{dataset}"), props);
        }
    }

    pub fn set_mounted(&self, path: &Path) {
        if let Ok(mut state) = self.state() {
            state.mounted.insert(path.to_path_buf());
        }
    }

    /// Mark a loop device as already bound to some other file.
    pub fn bind_existing(&self, index: u32) {
        if let Ok(mut state) = self.state() {
            state
                .bound
                .insert(index, PathBuf::from(format!("/external/backing-{index}")));
        }
    }

    /// Make the next matching call fail. `target` is the dataset path, file
    /// path, device path, pool, or container the call operates on.
    pub fn fail_on(&self, operation: &str, target: &str) {
        if let Ok(mut state) = self.state() {
            state
                .failures
                .push((operation.to_owned(), target.to_owned()));
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.state().map(|s| s.journal.clone()).unwrap_or_default()
    }

    pub fn dataset_attributes(&self, pool: &str, dataset: &str) -> Option<HashMap<String, String>> {
        self.state()
            .ok()
            .and_then(|s| s.datasets.get(&format!("{pool}/{dataset}")).cloned())
    }

    pub fn bound_file(&self, device: LoopDevice) -> Option<PathBuf> {
        self.state()
            .ok()
            .and_then(|s| s.bound.get(&device.index()).cloned())
    }

    pub fn is_active(&self, device: LoopDevice) -> bool {
        self.state()
            .map(|s| s.active.contains(&device.index()))
            .unwrap_or(false)
    }

    pub fn is_formatted(&self, file: &Path) -> bool {
        self.state()
            .map(|s| s.formatted.contains(file))
            .unwrap_or(false)
    }

    pub fn is_unlocked(&self, mapper_name: &str) -> bool {
        self.state()
            .map(|s| s.unlocked.contains(mapper_name))
            .unwrap_or(false)
    }

    pub fn is_imported(&self, pool: &str) -> bool {
        self.state()
            .map(|s| s.imported.contains(pool))
            .unwrap_or(false)
    }

    pub fn is_running(&self, container: &str) -> bool {
        self.state()
            .map(|s| s.running.contains(container))
            .unwrap_or(false)
    }
}

impl MockState {
    fn record(&mut self, operation: &str, target: &str) -> Result<(), HostError> {
        self.journal.push(format!("{operation} {target}"));
        if let Some(pos) = self
            .failures
            .iter()
            .position(|(op, t)| op == operation && t == target)
        {
            self.failures.remove(pos);
            return Err(HostError::ToolFailed {
                tool: "mock".to_owned(),
                args: format!("{operation} {target}"),
                status: "exit status: 1".to_owned(),
                stderr: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

fn tool_failed(operation: &str, target: &str, stderr: &str) -> HostError {
    HostError::ToolFailed {
        tool: "mock".to_owned(),
        args: format!("{operation} {target}"),
        status: "exit status: 1".to_owned(),
        stderr: stderr.to_owned(),
    }
}

impl HostBackend for MockHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn dataset_exists(&self, pool: &PoolName, dataset: &DatasetName) -> Result<bool, HostError> {
        let target = dataset_path(pool, dataset);
        let mut state = self.state()?;
        state.record("dataset_exists", &target)?;
        Ok(state.datasets.contains_key(&target))
    }

    fn dataset_create(
        &self,
        pool: &PoolName,
        dataset: &DatasetName,
        mountpoint: &Path,
        attributes: &DatasetAttributes,
    ) -> Result<(), HostError> {
        let target = dataset_path(pool, dataset);
        let mut state = self.state()?;
        state.record("dataset_create", &target)?;
        if state.datasets.contains_key(&target) {
            return Err(tool_failed(
                "dataset_create",
                &target,
                "dataset already exists",
            ));
        }
        let mut props: HashMap<String, String> = attributes
            .properties()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        props.insert(
            "mountpoint".to_owned(),
            mountpoint.to_string_lossy().into_owned(),
        );
        state.datasets.insert(target, props);
        state.mounted.insert(mountpoint.to_path_buf());
        Ok(())
    }

    fn get_attribute(
        &self,
        pool: &PoolName,
        dataset: &DatasetName,
        key: &str,
    ) -> Result<String, HostError> {
        let target = dataset_path(pool, dataset);
        let mut state = self.state()?;
        state.record("get_attribute", &format!("{target} {key}"))?;
        state
            .datasets
            .get(&target)
            .and_then(|props| props.get(key).cloned())
            .ok_or_else(|| tool_failed("get_attribute", &target, "dataset does not exist"))
    }

    fn is_mount_point(&self, path: &Path) -> Result<bool, HostError> {
        let mut state = self.state()?;
        state.record("is_mount_point", &path.to_string_lossy())?;
        Ok(state.mounted.contains(path))
    }

    fn is_bound(&self, device: LoopDevice) -> Result<bool, HostError> {
        let mut state = self.state()?;
        state.record("is_bound", &device.to_string())?;
        Ok(state.bound.contains_key(&device.index()))
    }

    fn bind(&self, file: &Path, device: LoopDevice) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record("bind", &format!("{} {device}", file.display()))?;
        if state.bound.contains_key(&device.index()) {
            return Err(tool_failed(
                "bind",
                &device.to_string(),
                "device is busy",
            ));
        }
        if !file.is_file() {
            return Err(tool_failed(
                "bind",
                &file.to_string_lossy(),
                "no such file",
            ));
        }
        state.bound.insert(device.index(), file.to_path_buf());
        Ok(())
    }

    fn format_swap(&self, file: &Path) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record("format_swap", &file.to_string_lossy())?;
        if !file.is_file() {
            return Err(tool_failed(
                "format_swap",
                &file.to_string_lossy(),
                "no such file",
            ));
        }
        state.formatted.insert(file.to_path_buf());
        Ok(())
    }

    fn activate(&self, device: LoopDevice) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record("activate", &device.to_string())?;
        let Some(file) = state.bound.get(&device.index()).cloned() else {
            return Err(tool_failed(
                "activate",
                &device.to_string(),
                "no backing file",
            ));
        };
        if !state.formatted.contains(&file) {
            return Err(tool_failed(
                "activate",
                &device.to_string(),
                "read swap header failed",
            ));
        }
        state.active.insert(device.index());
        Ok(())
    }
}

impl StartupBackend for MockHost {
    fn unlock_volume(
        &self,
        device: &str,
        mapper_name: &str,
        _key_file: Option<&Path>,
    ) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record("unlock_volume", device)?;
        state.unlocked.insert(mapper_name.to_owned());
        Ok(())
    }

    fn import_pool(&self, pool: &PoolName) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record("import_pool", pool)?;
        state.imported.insert(pool.to_string());
        Ok(())
    }

    fn mount(&self, source: &str, target: &Path) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record("mount", &format!("{source} {}", target.display()))?;
        state.mounted.insert(target.to_path_buf());
        Ok(())
    }

    fn start_container(&self, runtime: &Path, container: &str) -> Result<(), HostError> {
        let mut state = self.state()?;
        state.record(
            "start_container",
            &format!("{} {container}", runtime.display()),
        )?;
        state.running.insert(container.to_owned());
        Ok(())
    }
}
