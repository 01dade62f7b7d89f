//! Newtype wrappers for pool and dataset names.
//!
//! Both serialize as plain strings so they can appear directly in TOML and JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Name of a ZFS pool, as passed to `zfs`/`zpool`.
    PoolName
);

string_newtype!(
    /// Name of a dataset directly below a pool (no slashes).
    DatasetName
);

/// Full `<pool>/<dataset>` path as understood by `zfs`.
pub fn dataset_path(pool: &PoolName, dataset: &DatasetName) -> String {
    format!("{pool}/{dataset}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_name_display_and_as_ref() {
        let pool = PoolName::new("alpha");
        assert_eq!(pool.to_string(), "alpha");
        assert_eq!(pool.as_str(), "alpha");
        assert_eq!(AsRef::<str>::as_ref(&pool), "alpha");
    }

    #[test]
    fn dataset_name_serializes_as_plain_string() {
        let name = DatasetName::new("swap");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"swap\"");
    }

    #[test]
    fn dataset_path_joins_with_slash() {
        let path = dataset_path(&PoolName::from("tank"), &DatasetName::from("swap"));
        assert_eq!(path, "tank/swap");
    }
}
