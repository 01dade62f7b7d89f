use super::{Context, EXIT_FAILURE, EXIT_SUCCESS};
use poolswap_core::RunLock;
use poolswap_schema::{ConfigError, ConfigV1, ProvisionPlan};
use std::path::Path;

pub fn run(ctx: &Context) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let config = match ctx.load_config() {
        Ok(config) => {
            checks.push(Check::pass("config", "Configuration parsed"));
            config
        }
        Err(e) => {
            checks.push(Check::fail("config", &e));
            return print_results(&checks, false, ctx.json);
        }
    };

    check_root(&mut checks);
    check_backend(&config, &mut checks, &mut all_pass);
    let plan = check_plans(&config, &mut checks, &mut all_pass);
    if config.host.backend == "system" {
        check_prereqs(&config, &mut checks, &mut all_pass);
        if let Some(plan) = &plan {
            check_free_space(plan, &mut checks);
        }
        check_active_swaps(&mut checks);
    }
    check_lock(&config.host.lock_file, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, ctx.json)
}

fn check_root(checks: &mut Vec<Check>) {
    // SAFETY: geteuid has no preconditions and cannot fail.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        checks.push(Check::pass("root", "Running as root"));
    } else {
        checks.push(Check::warn(
            "root",
            &format!("Running as uid {euid}; provisioning needs root"),
        ));
    }
}

fn check_backend(config: &ConfigV1, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match poolswap_host::select_backend(&config.host.backend, &config.host.tools) {
        Ok(backend) if backend.available() => checks.push(Check::pass(
            "backend",
            &format!("Backend '{}' available", backend.name()),
        )),
        Ok(backend) => {
            *all_pass = false;
            checks.push(Check::fail(
                "backend",
                &format!("Backend '{}' cannot reach ZFS", backend.name()),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("backend", &e.to_string()));
        }
    }
}

fn check_plans(
    config: &ConfigV1,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> Option<ProvisionPlan> {
    let plan = match config.provision_plan() {
        Ok(plan) => {
            let pools: Vec<&str> = plan.pools.iter().map(|p| p.as_str()).collect();
            checks.push(Check::pass(
                "swap_plan",
                &format!(
                    "{} of swap per pool at {} on {}",
                    plan.size,
                    plan.mountpoint.display(),
                    pools.join(", ")
                ),
            ));
            Some(plan)
        }
        Err(ConfigError::NoPools) => {
            checks.push(Check::info("swap_plan", "No pools configured in [swap]"));
            None
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("swap_plan", &format!("Invalid [swap]: {e}")));
            None
        }
    };

    if config.startup.is_some() {
        match config.startup_plan() {
            Ok(startup) => checks.push(Check::pass(
                "startup_plan",
                &format!("Startup imports {} and starts {}", startup.pool, startup.container),
            )),
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail(
                    "startup_plan",
                    &format!("Invalid [startup]: {e}"),
                ));
            }
        }
    }
    plan
}

fn check_prereqs(config: &ConfigV1, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let mut missing = poolswap_host::check_swap_prereqs(&config.host.tools);
    if let Some(startup) = &config.startup {
        for m in poolswap_host::check_startup_prereqs(&config.host.tools, &startup.container_runtime)
        {
            if !missing.iter().any(|known| known.name == m.name) {
                missing.push(m);
            }
        }
    }
    if missing.is_empty() {
        checks.push(Check::pass("host_prereqs", "Host tools present"));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "host_prereqs",
            &poolswap_host::format_missing(&missing),
        ));
    }
}

fn check_free_space(plan: &ProvisionPlan, checks: &mut Vec<Check>) {
    let Ok(c_path) = std::ffi::CString::new(plan.mountpoint.to_string_lossy().as_bytes()) else {
        return;
    };

    // SAFETY: zeroed statvfs is a valid initial state for the struct.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: valid NUL-terminated path and a zeroed output struct that is
    // only read after a successful call.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &raw mut stat) };
    if ret != 0 {
        checks.push(Check::info(
            "free_space",
            &format!("{} does not exist yet", plan.mountpoint.display()),
        ));
        return;
    }

    let avail_bytes = stat.f_bavail * stat.f_frsize;
    if avail_bytes < plan.size.bytes() {
        checks.push(Check::warn(
            "free_space",
            &format!(
                "{} has {} MB free, swap file needs {}",
                plan.mountpoint.display(),
                avail_bytes / (1024 * 1024),
                plan.size
            ),
        ));
    } else {
        checks.push(Check::pass(
            "free_space",
            &format!(
                "{} has room for a {} swap file",
                plan.mountpoint.display(),
                plan.size
            ),
        ));
    }
}

fn check_active_swaps(checks: &mut Vec<Check>) {
    match std::fs::read_to_string("/proc/swaps") {
        Ok(content) => {
            let loops = content
                .lines()
                .skip(1)
                .filter(|l| l.starts_with("/dev/loop"))
                .count();
            let total = content.lines().skip(1).filter(|l| !l.trim().is_empty()).count();
            checks.push(Check::info(
                "active_swaps",
                &format!("{total} active swap areas ({loops} on loop devices)"),
            ));
        }
        Err(e) => checks.push(Check::warn(
            "active_swaps",
            &format!("Cannot read /proc/swaps: {e}"),
        )),
    }
}

fn check_lock(lock_file: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match RunLock::try_acquire(lock_file) {
        Ok(Some(_)) => checks.push(Check::pass("run_lock", "Run lock is free")),
        Ok(None) => checks.push(Check::warn(
            "run_lock",
            "Run lock is held by another poolswap process",
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "run_lock",
                &format!("Cannot check run lock {}: {e}", lock_file.display()),
            ));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("poolswap doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
