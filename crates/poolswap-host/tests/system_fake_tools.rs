//! Exercise `SystemHost` against fake `zfs`/`losetup`/`mkswap`/`swapon`
//! scripts that log their arguments, so argument shapes and exit-status
//! handling are checked without touching real devices.

use poolswap_host::{HostBackend, HostError, LoopDevice, StartupBackend, SystemHost};
use poolswap_schema::{DatasetAttributes, DatasetName, PoolName, ToolPaths};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

struct FakeTools {
    _dir: tempfile::TempDir,
    log: PathBuf,
    tools: ToolPaths,
}

fn fake_tools() -> FakeTools {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let log = dir.path().join("calls.log");

    // zfs knows exactly one dataset: alpha/swap mounted at /swap.
    write_executable(
        &bin.join("zfs"),
        &format!(
            r#"#!/bin/sh
echo "zfs $*" >> "{log}"
case "$1" in
  list)
    if [ "$5" = "alpha/swap" ]; then echo "alpha/swap"; exit 0; fi
    echo "cannot open '$5': dataset does not exist" >&2
    exit 1
    ;;
  get)
    if [ "$6" = "alpha/swap" ]; then echo "/swap"; exit 0; fi
    echo "cannot open '$6': dataset does not exist" >&2
    exit 1
    ;;
  create) exit 0 ;;
  version) exit 0 ;;
esac
echo "unsupported" >&2
exit 2
"#,
            log = log.display()
        ),
    );

    // Only /dev/loop0 and /dev/loop1 are bound; /dev/loop7 cannot be read.
    write_executable(
        &bin.join("losetup"),
        &format!(
            r#"#!/bin/sh
echo "losetup $*" >> "{log}"
if [ $# -eq 1 ]; then
  case "$1" in
    /dev/loop0|/dev/loop1) echo "$1: []: (/other)"; exit 0 ;;
    /dev/loop7) echo "losetup: $1: failed to use device: Permission denied" >&2; exit 1 ;;
    *) echo "$1: No such device or address" >&2; exit 1 ;;
  esac
fi
exit 0
"#,
            log = log.display()
        ),
    );

    for tool in ["mkswap", "swapon", "mount", "cryptsetup", "zpool"] {
        write_executable(
            &bin.join(tool),
            &format!(
                "#!/bin/sh\necho \"{tool} $*\" >> \"{log}\"\nexit 0\n",
                log = log.display()
            ),
        );
    }

    write_executable(
        &bin.join("mountpoint"),
        &format!(
            r#"#!/bin/sh
echo "mountpoint $*" >> "{log}"
[ "$2" = "/swap" ] && exit 0
exit 32
"#,
            log = log.display()
        ),
    );

    let tools = ToolPaths {
        zfs: bin.join("zfs"),
        zpool: bin.join("zpool"),
        mountpoint: bin.join("mountpoint"),
        losetup: bin.join("losetup"),
        mkswap: bin.join("mkswap"),
        swapon: bin.join("swapon"),
        cryptsetup: bin.join("cryptsetup"),
        mount: bin.join("mount"),
    };
    FakeTools {
        _dir: dir,
        log,
        tools,
    }
}

fn calls(fake: &FakeTools) -> Vec<String> {
    fs::read_to_string(&fake.log)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn dataset_exists_distinguishes_missing_from_present() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());
    assert!(host
        .dataset_exists(&PoolName::from("alpha"), &DatasetName::from("swap"))
        .unwrap());
    assert!(!host
        .dataset_exists(&PoolName::from("beta"), &DatasetName::from("swap"))
        .unwrap());
}

#[test]
fn get_attribute_returns_trimmed_value() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());
    let value = host
        .get_attribute(
            &PoolName::from("alpha"),
            &DatasetName::from("swap"),
            "mountpoint",
        )
        .unwrap();
    assert_eq!(value, "/swap");

    let err = host
        .get_attribute(
            &PoolName::from("beta"),
            &DatasetName::from("swap"),
            "mountpoint",
        )
        .unwrap_err();
    assert!(matches!(err, HostError::ToolFailed { .. }));
}

#[test]
fn dataset_create_passes_every_property() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());
    host.dataset_create(
        &PoolName::from("beta"),
        &DatasetName::from("swap"),
        Path::new("/swap"),
        &DatasetAttributes::default(),
    )
    .unwrap();

    let log = calls(&fake);
    let create = log.iter().find(|l| l.starts_with("zfs create")).unwrap();
    assert!(create.contains("-o mountpoint=/swap"));
    assert!(create.contains("-o sync=always"));
    assert!(create.contains("-o primarycache=metadata"));
    assert!(create.ends_with("beta/swap"));
}

#[test]
fn loop_and_swap_commands() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());

    assert!(host.is_bound(LoopDevice::new(0)).unwrap());
    assert!(!host.is_bound(LoopDevice::new(2)).unwrap());

    let file = Path::new("/swap/swapfile");
    host.format_swap(file).unwrap();
    host.bind(file, LoopDevice::new(2)).unwrap();
    host.activate(LoopDevice::new(2)).unwrap();

    let log = calls(&fake);
    assert!(log.contains(&"mkswap /swap/swapfile".to_owned()));
    assert!(log.contains(&"losetup /dev/loop2 /swap/swapfile".to_owned()));
    assert!(log.contains(&"swapon /dev/loop2".to_owned()));
}

#[test]
fn unreadable_loop_device_is_an_error() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());
    let err = host.is_bound(LoopDevice::new(7)).unwrap_err();
    match err {
        HostError::ToolFailed { args, stderr, .. } => {
            assert_eq!(args, "/dev/loop7");
            assert!(stderr.contains("Permission denied"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mount_point_follows_exit_status() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());
    assert!(host.is_mount_point(Path::new("/swap")).unwrap());
    assert!(!host.is_mount_point(Path::new("/elsewhere")).unwrap());
}

#[test]
fn startup_commands_use_key_file() {
    let fake = fake_tools();
    let host = SystemHost::new(fake.tools.clone());
    host.unlock_volume(
        "/dev/sdb1",
        "poolswap-test-nonexistent-mapping",
        Some(Path::new("/etc/keys/data.key")),
    )
    .unwrap();
    host.start_container(&fake.tools.mkswap, "app").unwrap();

    let log = calls(&fake);
    assert!(log.contains(
        &"cryptsetup open /dev/sdb1 poolswap-test-nonexistent-mapping --key-file /etc/keys/data.key"
            .to_owned()
    ));
    assert!(log.contains(&"mkswap start app".to_owned()));
}

#[test]
fn spawn_failure_surfaces_tool_name() {
    let tools = ToolPaths {
        losetup: "/nonexistent/losetup".into(),
        ..ToolPaths::default()
    };
    let host = SystemHost::new(tools);
    let err = host.is_bound(LoopDevice::new(0)).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/losetup"));
}
