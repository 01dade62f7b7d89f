use crate::attributes::DatasetAttributes;
use crate::size::{SizeError, SwapSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location consulted when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/poolswap.toml";
pub const DEFAULT_MOUNTPOINT: &str = "/swap";
pub const DEFAULT_DATASET: &str = "swap";
pub const DEFAULT_SIZE: &str = "4G";
pub const DEFAULT_LOCK_FILE: &str = "/run/poolswap.lock";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported config_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("at least one pool is required")]
    NoPools,
    #[error("pool name must not be empty")]
    EmptyPool,
    #[error("invalid dataset name '{0}': must be non-empty and must not contain '/'")]
    InvalidDataset(String),
    #[error("invalid swap size: {0}")]
    Size(#[from] SizeError),
    #[error("swap size must be greater than zero")]
    ZeroSize,
    #[error("mountpoint must be an absolute path, got '{0}'")]
    RelativeMountpoint(String),
    #[error("startup.{0} must not be empty")]
    MissingStartupField(&'static str),
    #[error("no [startup] section configured")]
    NoStartupSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigV1 {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub swap: SwapSection,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub startup: Option<StartupSection>,
}

impl Default for ConfigV1 {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            swap: SwapSection::default(),
            host: HostSection::default(),
            startup: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SwapSection {
    #[serde(default)]
    pub pools: Vec<String>,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub create: bool,
    #[serde(default = "default_mountpoint")]
    pub mountpoint: PathBuf,
    #[serde(default)]
    pub attributes: DatasetAttributes,
}

impl Default for SwapSection {
    fn default() -> Self {
        Self {
            pools: Vec::new(),
            dataset: default_dataset(),
            size: default_size(),
            create: false,
            mountpoint: default_mountpoint(),
            attributes: DatasetAttributes::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
    #[serde(default)]
    pub tools: ToolPaths,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            lock_file: default_lock_file(),
            tools: ToolPaths::default(),
        }
    }
}

/// Binaries invoked by the system backend. Bare names are resolved via `PATH`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ToolPaths {
    pub zfs: PathBuf,
    pub zpool: PathBuf,
    pub mountpoint: PathBuf,
    pub losetup: PathBuf,
    pub mkswap: PathBuf,
    pub swapon: PathBuf,
    pub cryptsetup: PathBuf,
    pub mount: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            zfs: PathBuf::from("zfs"),
            zpool: PathBuf::from("zpool"),
            mountpoint: PathBuf::from("mountpoint"),
            losetup: PathBuf::from("losetup"),
            mkswap: PathBuf::from("mkswap"),
            swapon: PathBuf::from("swapon"),
            cryptsetup: PathBuf::from("cryptsetup"),
            mount: PathBuf::from("mount"),
        }
    }
}

/// Encrypted-disk startup: unlock, import, mount, start container.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StartupSection {
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub mapper_name: String,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub mount_source: String,
    #[serde(default)]
    pub mount_target: PathBuf,
    #[serde(default)]
    pub container: String,
    #[serde(default = "default_container_runtime")]
    pub container_runtime: PathBuf,
}

fn default_config_version() -> u32 {
    1
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_owned()
}

fn default_size() -> String {
    DEFAULT_SIZE.to_owned()
}

fn default_mountpoint() -> PathBuf {
    PathBuf::from(DEFAULT_MOUNTPOINT)
}

fn default_backend() -> String {
    "system".to_owned()
}

fn default_lock_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_FILE)
}

fn default_container_runtime() -> PathBuf {
    PathBuf::from("docker")
}

impl SwapSection {
    pub fn parsed_size(&self) -> Result<SwapSize, ConfigError> {
        Ok(self.size.parse()?)
    }
}

pub fn parse_config_str(input: &str) -> Result<ConfigV1, ConfigError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<ConfigV1, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Load `path` if given, else the default location if it exists, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<ConfigV1, ConfigError> {
    match path {
        Some(p) => parse_config_file(p),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                parse_config_file(default_path)
            } else {
                Ok(ConfigV1::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let input = r#"
config_version = 1

[swap]
pools = ["alpha", "beta"]
dataset = "swap"
size = "8G"
create = true
mountpoint = "/swap"

[swap.attributes]
compression = "lz4"
sync = "standard"

[host]
backend = "mock"
lock_file = "/tmp/poolswap.lock"

[host.tools]
zfs = "/usr/sbin/zfs"

[startup]
device = "/dev/sdb1"
mapper_name = "cryptdata"
key_file = "/etc/keys/data.key"
pool = "tank"
mount_source = "tank/data"
mount_target = "/srv/data"
container = "app"
container_runtime = "podman"
"#;
        let config = parse_config_str(input).expect("should parse");
        assert_eq!(config.swap.pools, vec!["alpha", "beta"]);
        assert!(config.swap.create);
        assert_eq!(config.swap.parsed_size().unwrap().bytes(), 8 << 30);
        assert_eq!(config.swap.attributes.compression, "lz4");
        assert_eq!(config.swap.attributes.logbias, "throughput");
        assert_eq!(config.host.backend, "mock");
        assert_eq!(config.host.tools.zfs, PathBuf::from("/usr/sbin/zfs"));
        assert_eq!(config.host.tools.losetup, PathBuf::from("losetup"));
        let startup = config.startup.unwrap();
        assert_eq!(startup.container_runtime, PathBuf::from("podman"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config_str("").expect("should parse");
        assert_eq!(config, ConfigV1::default());
        assert_eq!(config.swap.dataset, "swap");
        assert_eq!(config.swap.size, "4G");
        assert!(!config.swap.create);
        assert_eq!(config.swap.mountpoint, PathBuf::from("/swap"));
        assert_eq!(config.host.backend, "system");
        assert!(config.startup.is_none());
    }

    #[test]
    fn rejects_unknown_fields() {
        let input = r#"
[swap]
pools = ["alpha"]
sise = "4G"
"#;
        assert!(parse_config_str(input).is_err());
    }

    #[test]
    fn rejects_unknown_attribute() {
        let input = r#"
[swap.attributes]
volblocksize = "4K"
"#;
        assert!(parse_config_str(input).is_err());
    }

    #[test]
    fn load_config_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolswap.toml");
        std::fs::write(&path, "[swap]\npools = [\"tank\"]\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.swap.pools, vec!["tank"]);
    }

    #[test]
    fn load_config_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
