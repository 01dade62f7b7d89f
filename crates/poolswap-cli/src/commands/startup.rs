use super::{describe_core_error, json_pretty, spin_fail, spin_ok, spinner, Context, EXIT_SUCCESS};
use poolswap_core::run_startup;

pub fn run(ctx: &Context) -> Result<u8, String> {
    let config = ctx.load_config()?;
    let plan = config
        .startup_plan()
        .map_err(|e| format!("config error: {e}"))?;

    let backend = poolswap_host::select_startup_backend(&config.host.backend, &config.host.tools)
        .map_err(|e| e.to_string())?;
    let skip_prereqs = std::env::var("POOLSWAP_SKIP_PREREQS").as_deref() == Ok("1");
    if backend.name() == "system" && !skip_prereqs {
        let missing =
            poolswap_host::check_startup_prereqs(&config.host.tools, &plan.container_runtime);
        if !missing.is_empty() {
            return Err(poolswap_host::format_missing(&missing));
        }
    }

    let pb = (!ctx.json).then(|| spinner(&format!("starting {}...", plan.container)));
    match run_startup(backend.as_ref(), &plan) {
        Ok(report) => {
            if let Some(pb) = &pb {
                spin_ok(
                    pb,
                    &format!(
                        "pool {} imported, {} mounted, {} started",
                        plan.pool,
                        plan.mount_target.display(),
                        plan.container
                    ),
                );
            }
            if ctx.json {
                println!("{}", json_pretty(&report)?);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "startup failed");
            }
            Err(describe_core_error(&e))
        }
    }
}
