use crate::CoreError;
use poolswap_host::HostBackend;
use poolswap_schema::{dataset_path, DatasetAttributes, DatasetName, PoolName, ProvisionPlan};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One swap dataset: where it lives, where it must be mounted, how it is tuned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub pool: PoolName,
    pub name: DatasetName,
    pub mountpoint: PathBuf,
    pub attributes: DatasetAttributes,
}

impl DatasetDescriptor {
    pub fn for_pool(plan: &ProvisionPlan, pool: &PoolName) -> Self {
        Self {
            pool: pool.clone(),
            name: plan.dataset.clone(),
            mountpoint: plan.mountpoint.clone(),
            attributes: plan.attributes.clone(),
        }
    }

    pub fn path(&self) -> String {
        dataset_path(&self.pool, &self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetOutcome {
    Created,
    Existing,
    /// Missing and creation was not requested.
    Absent,
}

impl DatasetOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Existing => "existing",
            Self::Absent => "absent",
        }
    }
}

/// Make sure the dataset exists with the expected mountpoint.
///
/// An existing dataset is never modified; its `mountpoint` must already match.
pub fn ensure_dataset(
    host: &dyn HostBackend,
    descriptor: &DatasetDescriptor,
    create: bool,
) -> Result<DatasetOutcome, CoreError> {
    let path = descriptor.path();

    if !host.dataset_exists(&descriptor.pool, &descriptor.name)? {
        if !create {
            warn!("dataset {path} does not exist and creation was not requested");
            return Ok(DatasetOutcome::Absent);
        }
        info!(
            "creating dataset {path} mounted at {}",
            descriptor.mountpoint.display()
        );
        host.dataset_create(
            &descriptor.pool,
            &descriptor.name,
            &descriptor.mountpoint,
            &descriptor.attributes,
        )?;
        return Ok(DatasetOutcome::Created);
    }

    let actual = host.get_attribute(&descriptor.pool, &descriptor.name, "mountpoint")?;
    if Path::new(actual.trim()) != descriptor.mountpoint {
        return Err(CoreError::ExistsWithWrongMountpoint {
            dataset: path,
            expected: descriptor.mountpoint.display().to_string(),
            actual,
        });
    }
    debug!("dataset {path} exists with mountpoint {actual}");
    Ok(DatasetOutcome::Existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolswap_host::MockHost;

    fn descriptor(pool: &str) -> DatasetDescriptor {
        DatasetDescriptor {
            pool: PoolName::from(pool),
            name: DatasetName::from("swap"),
            mountpoint: PathBuf::from("/swap"),
            attributes: DatasetAttributes::default(),
        }
    }

    #[test]
    fn creates_missing_dataset_with_attributes() {
        let host = MockHost::new();
        let outcome = ensure_dataset(&host, &descriptor("alpha"), true).unwrap();
        assert_eq!(outcome, DatasetOutcome::Created);

        let props = host.dataset_attributes("alpha", "swap").unwrap();
        assert_eq!(props["mountpoint"], "/swap");
        assert_eq!(props["compression"], "zle");
        assert_eq!(props["com.sun:auto-snapshot"], "false");
        assert_eq!(props["secondarycache"], "none");
    }

    #[test]
    fn second_call_is_idempotent() {
        let host = MockHost::new();
        let desc = descriptor("alpha");
        ensure_dataset(&host, &desc, true).unwrap();
        let first = host.dataset_attributes("alpha", "swap");

        let outcome = ensure_dataset(&host, &desc, true).unwrap();
        assert_eq!(outcome, DatasetOutcome::Existing);
        assert_eq!(host.dataset_attributes("alpha", "swap"), first);
        let creates = host
            .journal()
            .iter()
            .filter(|l| l.starts_with("dataset_create"))
            .count();
        assert_eq!(creates, 1);
    }

    #[test]
    fn wrong_mountpoint_is_fatal() {
        let host = MockHost::new();
        host.add_dataset("alpha", "swap", Path::new("/mnt/elsewhere"));
        let err = ensure_dataset(&host, &descriptor("alpha"), true).unwrap_err();
        match err {
            CoreError::ExistsWithWrongMountpoint {
                dataset,
                expected,
                actual,
            } => {
                assert_eq!(dataset, "alpha/swap");
                assert_eq!(expected, "/swap");
                assert_eq!(actual, "/mnt/elsewhere");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn existing_dataset_validated_without_create_flag() {
        let host = MockHost::new();
        host.add_dataset("alpha", "swap", Path::new("/swap"));
        assert_eq!(
            ensure_dataset(&host, &descriptor("alpha"), false).unwrap(),
            DatasetOutcome::Existing
        );

        let host = MockHost::new();
        host.add_dataset("alpha", "swap", Path::new("/other"));
        assert!(ensure_dataset(&host, &descriptor("alpha"), false).is_err());
    }

    #[test]
    fn missing_dataset_without_create_flag_is_absent() {
        let host = MockHost::new();
        let outcome = ensure_dataset(&host, &descriptor("alpha"), false).unwrap();
        assert_eq!(outcome, DatasetOutcome::Absent);
        assert!(host.dataset_attributes("alpha", "swap").is_none());
    }

    #[test]
    fn create_failure_surfaces_host_error() {
        let host = MockHost::new();
        host.fail_on("dataset_create", "alpha/swap");
        assert!(matches!(
            ensure_dataset(&host, &descriptor("alpha"), true),
            Err(CoreError::Host(_))
        ));
    }
}
