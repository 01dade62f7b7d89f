use super::{
    colorize_status, describe_core_error, json_pretty, spin_fail, spin_ok, spinner, Context,
    EXIT_SUCCESS,
};
use crate::SwapArgs;
use indicatif::ProgressBar;
use poolswap_core::{
    PoolReport, PoolStatus, ProvisionEvent, ProvisionOptions, ProvisionReport, Provisioner,
    RunLock,
};
use tracing::debug;

/// `provision` and `single`. `single` demands exactly one pool and leaves a
/// pool alone when its swap file is already in place.
pub fn run(ctx: &Context, swap: SwapArgs, single: bool) -> Result<u8, String> {
    let mut config = ctx.load_config()?;
    swap.apply(&mut config);
    let plan = config
        .provision_plan()
        .map_err(|e| format!("config error: {e}"))?;
    if single && plan.pools.len() != 1 {
        return Err(format!(
            "config error: single provisions exactly one pool, got {}",
            plan.pools.len()
        ));
    }

    let backend = poolswap_host::select_backend(&config.host.backend, &config.host.tools)
        .map_err(|e| e.to_string())?;
    let skip_prereqs = std::env::var("POOLSWAP_SKIP_PREREQS").as_deref() == Ok("1");
    if backend.name() == "system" && !skip_prereqs {
        let missing = poolswap_host::check_swap_prereqs(&config.host.tools);
        if !missing.is_empty() {
            return Err(poolswap_host::format_missing(&missing));
        }
    }

    let _lock = RunLock::acquire(&config.host.lock_file).map_err(|e| e.to_string())?;
    debug!("holding run lock {}", config.host.lock_file.display());

    let provisioner = Provisioner::new(backend.as_ref()).with_options(ProvisionOptions {
        skip_if_swapfile_present: single,
    });

    let report = if ctx.json {
        provisioner.run(&plan)
    } else {
        let mut current: Option<ProgressBar> = None;
        provisioner.run_with_progress(&plan, &mut |event| match event {
            ProvisionEvent::PoolStarted(pool) => {
                current = Some(spinner(&format!("provisioning pool {pool}...")));
            }
            ProvisionEvent::PoolFinished(report) => {
                if let Some(pb) = current.take() {
                    spin_ok(&pb, &summary(report));
                }
            }
            ProvisionEvent::PoolFailed(pool, _) => {
                if let Some(pb) = current.take() {
                    spin_fail(&pb, &format!("pool {pool} failed"));
                }
            }
        })
    }
    .map_err(|e| describe_core_error(&e))?;

    print_report(&report, ctx.json)?;
    Ok(EXIT_SUCCESS)
}

fn summary(report: &PoolReport) -> String {
    match (report.status, report.loop_device) {
        (PoolStatus::Activated, Some(device)) => format!(
            "{}: {} on {device} ({} bytes)",
            report.pool,
            colorize_status("activated"),
            report.bytes
        ),
        _ => format!(
            "{}: {} ({} already present)",
            report.pool,
            colorize_status("skipped"),
            report.swapfile.display()
        ),
    }
}

fn print_report(report: &ProvisionReport, json: bool) -> Result<(), String> {
    if json {
        println!("{}", json_pretty(report)?);
        return Ok(());
    }
    for pool in &report.pools {
        let outcome = pool
            .dataset_outcome
            .map_or_else(|| "-".to_owned(), |o| colorize_status(o.as_str()));
        println!(
            "  {}  dataset: {outcome}  swapfile: {}",
            pool.dataset,
            pool.swapfile.display()
        );
    }
    Ok(())
}
