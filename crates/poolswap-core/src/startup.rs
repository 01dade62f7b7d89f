use crate::CoreError;
use poolswap_host::StartupBackend;
use poolswap_schema::StartupPlan;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupStep {
    UnlockVolume,
    ImportPool,
    Mount,
    StartContainer,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub started_at: String,
    pub completed: Vec<StartupStep>,
}

/// Unlock the encrypted volume, import its pool, mount the data filesystem
/// and start the container, stopping at the first failure.
pub fn run_startup(
    host: &dyn StartupBackend,
    plan: &StartupPlan,
) -> Result<StartupReport, CoreError> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let mut completed = Vec::with_capacity(4);

    let mut step = |which: StartupStep, result: Result<(), poolswap_host::HostError>| {
        match result {
            Ok(()) => {
                completed.push(which);
                Ok(())
            }
            Err(e) => {
                error!("startup step {which:?} failed: {e}");
                Err(CoreError::from(e))
            }
        }
    };

    info!("unlocking {} as /dev/mapper/{}", plan.device, plan.mapper_name);
    step(
        StartupStep::UnlockVolume,
        host.unlock_volume(&plan.device, &plan.mapper_name, plan.key_file.as_deref()),
    )?;

    info!("importing pool {}", plan.pool);
    step(StartupStep::ImportPool, host.import_pool(&plan.pool))?;

    info!(
        "mounting {} at {}",
        plan.mount_source,
        plan.mount_target.display()
    );
    step(
        StartupStep::Mount,
        host.mount(&plan.mount_source, &plan.mount_target),
    )?;

    info!("starting container {}", plan.container);
    step(
        StartupStep::StartContainer,
        host.start_container(&plan.container_runtime, &plan.container),
    )?;

    Ok(StartupReport {
        started_at,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolswap_host::MockHost;
    use poolswap_schema::PoolName;
    use std::path::PathBuf;

    fn plan() -> StartupPlan {
        StartupPlan {
            device: "/dev/sdb1".to_owned(),
            mapper_name: "cryptdata".to_owned(),
            key_file: Some(PathBuf::from("/etc/keys/data.key")),
            pool: PoolName::from("tank"),
            mount_source: "tank/data".to_owned(),
            mount_target: PathBuf::from("/srv/data"),
            container: "app".to_owned(),
            container_runtime: PathBuf::from("docker"),
        }
    }

    #[test]
    fn runs_all_steps_in_order() {
        let host = MockHost::new();
        let report = run_startup(&host, &plan()).unwrap();
        assert_eq!(
            report.completed,
            vec![
                StartupStep::UnlockVolume,
                StartupStep::ImportPool,
                StartupStep::Mount,
                StartupStep::StartContainer,
            ]
        );
        assert_eq!(
            host.journal(),
            vec![
                "unlock_volume /dev/sdb1",
                "import_pool tank",
                "mount tank/data /srv/data",
                "start_container docker app",
            ]
        );
        assert!(host.is_unlocked("cryptdata"));
        assert!(host.is_imported("tank"));
        assert!(host.is_running("app"));
    }

    #[test]
    fn import_failure_skips_mount_and_container() {
        let host = MockHost::new();
        host.fail_on("import_pool", "tank");
        let err = run_startup(&host, &plan()).unwrap_err();
        assert!(matches!(err, CoreError::Host(_)));
        assert!(!host.journal().iter().any(|l| l.starts_with("mount")));
        assert!(!host.is_running("app"));
    }
}
