use crate::activate::activate_swap;
use crate::reconcile::{ensure_dataset, DatasetDescriptor, DatasetOutcome};
use crate::CoreError;
use poolswap_host::{HostBackend, LoopDevice};
use poolswap_schema::{PoolName, ProvisionPlan};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    /// Treat an already-present swap file as success and leave that pool
    /// untouched. The size of the existing file is not checked.
    pub skip_if_swapfile_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    Activated,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub pool: PoolName,
    pub dataset: String,
    pub status: PoolStatus,
    pub dataset_outcome: Option<DatasetOutcome>,
    pub swapfile: PathBuf,
    pub bytes: u64,
    pub loop_device: Option<LoopDevice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub started_at: String,
    pub backend: String,
    pub pools: Vec<PoolReport>,
}

/// Progress notifications emitted while a plan runs.
#[derive(Debug)]
pub enum ProvisionEvent<'a> {
    PoolStarted(&'a PoolName),
    PoolFinished(&'a PoolReport),
    PoolFailed(&'a PoolName, &'a CoreError),
}

/// Runs a [`ProvisionPlan`] against a host, one pool at a time.
pub struct Provisioner<'h> {
    host: &'h dyn HostBackend,
    options: ProvisionOptions,
}

impl<'h> Provisioner<'h> {
    pub fn new(host: &'h dyn HostBackend) -> Self {
        Self {
            host,
            options: ProvisionOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self, plan: &ProvisionPlan) -> Result<ProvisionReport, CoreError> {
        self.run_with_progress(plan, &mut |_| {})
    }

    /// Process every pool in plan order. The first failure aborts the run and
    /// later pools are not attempted.
    pub fn run_with_progress(
        &self,
        plan: &ProvisionPlan,
        progress: &mut dyn FnMut(ProvisionEvent<'_>),
    ) -> Result<ProvisionReport, CoreError> {
        let started_at = chrono::Utc::now().to_rfc3339();
        info!(
            "provisioning {} pool(s) via {} backend",
            plan.pools.len(),
            self.host.name()
        );

        let mut pools = Vec::with_capacity(plan.pools.len());
        for pool in &plan.pools {
            progress(ProvisionEvent::PoolStarted(pool));
            match self.provision_pool(plan, pool) {
                Ok(report) => {
                    progress(ProvisionEvent::PoolFinished(&report));
                    pools.push(report);
                }
                Err(e) => {
                    error!("pool {pool}: provisioning failed: {e}");
                    progress(ProvisionEvent::PoolFailed(pool, &e));
                    return Err(e);
                }
            }
        }

        Ok(ProvisionReport {
            started_at,
            backend: self.host.name().to_owned(),
            pools,
        })
    }

    /// Reconcile and activate a single pool.
    pub fn provision_pool(
        &self,
        plan: &ProvisionPlan,
        pool: &PoolName,
    ) -> Result<PoolReport, CoreError> {
        let descriptor = DatasetDescriptor::for_pool(plan, pool);
        let swapfile = plan.swapfile_path();

        if self.options.skip_if_swapfile_present && swapfile.exists() {
            info!(
                "pool {pool}: {} already present, skipping",
                swapfile.display()
            );
            return Ok(PoolReport {
                pool: pool.clone(),
                dataset: descriptor.path(),
                status: PoolStatus::Skipped,
                dataset_outcome: None,
                swapfile,
                bytes: 0,
                loop_device: None,
            });
        }

        info!("pool {pool}: reconciling dataset {}", descriptor.path());
        let outcome = ensure_dataset(self.host, &descriptor, plan.create)?;

        info!("pool {pool}: activating swap at {}", plan.mountpoint.display());
        let device = activate_swap(self.host, &plan.mountpoint, plan.size)?;

        Ok(PoolReport {
            pool: pool.clone(),
            dataset: descriptor.path(),
            status: PoolStatus::Activated,
            dataset_outcome: Some(outcome),
            swapfile,
            bytes: plan.size.bytes(),
            loop_device: Some(device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolswap_host::MockHost;
    use poolswap_schema::{DatasetAttributes, DatasetName, SwapSize};
    use std::path::Path;

    fn plan(pools: &[&str], mountpoint: &Path) -> ProvisionPlan {
        ProvisionPlan {
            pools: pools.iter().map(|p| PoolName::from(*p)).collect(),
            dataset: DatasetName::from("swap"),
            size: SwapSize::from_bytes(64 * 1024),
            create: true,
            mountpoint: mountpoint.to_path_buf(),
            attributes: DatasetAttributes::default(),
        }
    }

    #[test]
    fn single_pool_creates_and_activates() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        let report = Provisioner::new(&host)
            .run(&plan(&["alpha"], dir.path()))
            .unwrap();

        assert_eq!(report.backend, "mock");
        assert_eq!(report.pools.len(), 1);
        let pool = &report.pools[0];
        assert_eq!(pool.status, PoolStatus::Activated);
        assert_eq!(pool.dataset_outcome, Some(DatasetOutcome::Created));
        assert_eq!(pool.loop_device, Some(LoopDevice::new(0)));
        assert_eq!(pool.bytes, 64 * 1024);
        assert!(host.is_active(LoopDevice::new(0)));
    }

    #[test]
    fn pools_processed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        let mut started = Vec::new();
        let report = Provisioner::new(&host)
            .run_with_progress(&plan(&["gamma", "alpha", "beta"], dir.path()), &mut |ev| {
                if let ProvisionEvent::PoolStarted(p) = ev {
                    started.push(p.to_string());
                }
            })
            .unwrap();

        assert_eq!(started, vec!["gamma", "alpha", "beta"]);
        let order: Vec<&str> = report.pools.iter().map(|p| p.pool.as_str()).collect();
        assert_eq!(order, vec!["gamma", "alpha", "beta"]);
        // Each run grabs a fresh loop device; earlier ones are never released.
        let devices: Vec<u32> = report
            .pools
            .iter()
            .map(|p| p.loop_device.unwrap().index())
            .collect();
        assert_eq!(devices, vec![0, 1, 2]);
    }

    #[test]
    fn failure_on_second_pool_stops_the_third() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        host.fail_on("dataset_create", "p2/swap");

        let mut failed = None;
        let err = Provisioner::new(&host)
            .run_with_progress(&plan(&["p1", "p2", "p3"], dir.path()), &mut |ev| {
                if let ProvisionEvent::PoolFailed(p, _) = ev {
                    failed = Some(p.to_string());
                }
            })
            .unwrap_err();

        assert!(matches!(err, CoreError::Host(_)));
        assert_eq!(failed.as_deref(), Some("p2"));
        let journal = host.journal();
        assert!(journal.iter().any(|l| l == "dataset_create p1/swap"));
        assert!(!journal.iter().any(|l| l.contains("p3")));
    }

    #[test]
    fn duplicate_pools_run_twice() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        let report = Provisioner::new(&host)
            .run(&plan(&["alpha", "alpha"], dir.path()))
            .unwrap();
        assert_eq!(report.pools[0].dataset_outcome, Some(DatasetOutcome::Created));
        assert_eq!(report.pools[1].dataset_outcome, Some(DatasetOutcome::Existing));
    }

    #[test]
    fn skip_when_swapfile_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("swapfile"), b"").unwrap();
        let host = MockHost::new();

        let report = Provisioner::new(&host)
            .with_options(ProvisionOptions {
                skip_if_swapfile_present: true,
            })
            .run(&plan(&["alpha"], dir.path()))
            .unwrap();

        assert_eq!(report.pools[0].status, PoolStatus::Skipped);
        assert!(host.journal().is_empty());
    }

    #[test]
    fn absent_dataset_without_create_fails_on_mount_check() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        let mut p = plan(&["alpha"], dir.path());
        p.create = false;

        let err = Provisioner::new(&host).run(&p).unwrap_err();
        assert!(matches!(err, CoreError::NotMounted(_)));
        assert!(!dir.path().join("swapfile").exists());
    }

    #[test]
    fn report_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        let report = Provisioner::new(&host)
            .run(&plan(&["alpha"], dir.path()))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pools"][0]["status"], "activated");
        assert_eq!(json["pools"][0]["dataset_outcome"], "created");
        assert_eq!(json["pools"][0]["loop_device"], 0);
        assert_eq!(json["pools"][0]["dataset"], "alpha/swap");
    }
}
