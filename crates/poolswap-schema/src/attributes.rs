use serde::{Deserialize, Serialize};

/// Tuning properties applied when the swap dataset is created.
///
/// Values are opaque: they are handed to `zfs create -o key=value` verbatim and
/// any invalid value is reported by `zfs` itself.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct DatasetAttributes {
    pub dedup: String,
    pub compression: String,
    pub logbias: String,
    pub atime: String,
    pub relatime: String,
    pub recordsize: String,
    /// Written as the `com.sun:auto-snapshot` user property.
    pub auto_snapshot: String,
    pub checksum: String,
    pub primarycache: String,
    pub secondarycache: String,
    pub sync: String,
}

impl Default for DatasetAttributes {
    fn default() -> Self {
        Self {
            dedup: "off".to_owned(),
            compression: "zle".to_owned(),
            logbias: "throughput".to_owned(),
            atime: "off".to_owned(),
            relatime: "off".to_owned(),
            recordsize: "4K".to_owned(),
            auto_snapshot: "false".to_owned(),
            checksum: "on".to_owned(),
            primarycache: "metadata".to_owned(),
            secondarycache: "none".to_owned(),
            sync: "always".to_owned(),
        }
    }
}

impl DatasetAttributes {
    /// Property list in the order it is passed to `zfs create`.
    pub fn properties(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("dedup", self.dedup.as_str()),
            ("compression", self.compression.as_str()),
            ("logbias", self.logbias.as_str()),
            ("atime", self.atime.as_str()),
            ("relatime", self.relatime.as_str()),
            ("recordsize", self.recordsize.as_str()),
            ("com.sun:auto-snapshot", self.auto_snapshot.as_str()),
            ("checksum", self.checksum.as_str()),
            ("primarycache", self.primarycache.as_str()),
            ("secondarycache", self.secondarycache.as_str()),
            ("sync", self.sync.as_str()),
        ]
    }
}

/// Per-attribute overrides, typically sourced from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeOverrides {
    pub dedup: Option<String>,
    pub compression: Option<String>,
    pub logbias: Option<String>,
    pub atime: Option<String>,
    pub relatime: Option<String>,
    pub recordsize: Option<String>,
    pub auto_snapshot: Option<String>,
    pub checksum: Option<String>,
    pub primarycache: Option<String>,
    pub secondarycache: Option<String>,
    pub sync: Option<String>,
}

impl AttributeOverrides {
    pub fn apply(self, attrs: &mut DatasetAttributes) {
        let Self {
            dedup,
            compression,
            logbias,
            atime,
            relatime,
            recordsize,
            auto_snapshot,
            checksum,
            primarycache,
            secondarycache,
            sync,
        } = self;
        let pairs = [
            (dedup, &mut attrs.dedup),
            (compression, &mut attrs.compression),
            (logbias, &mut attrs.logbias),
            (atime, &mut attrs.atime),
            (relatime, &mut attrs.relatime),
            (recordsize, &mut attrs.recordsize),
            (auto_snapshot, &mut attrs.auto_snapshot),
            (checksum, &mut attrs.checksum),
            (primarycache, &mut attrs.primarycache),
            (secondarycache, &mut attrs.secondarycache),
            (sync, &mut attrs.sync),
        ];
        for (value, slot) in pairs {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}
