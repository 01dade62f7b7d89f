use super::{json_pretty, Context, EXIT_SUCCESS};
use poolswap_core::{install_units, UnitOptions};
use std::path::PathBuf;

pub fn run(
    ctx: &Context,
    systemd_dir: PathBuf,
    unit_config: PathBuf,
    with_startup: bool,
    reload: bool,
) -> Result<u8, String> {
    let binary =
        std::env::current_exe().map_err(|e| format!("cannot resolve own executable: {e}"))?;
    let options = UnitOptions {
        binary,
        config: unit_config,
        systemd_dir,
        include_startup: with_startup,
        reload,
    };
    let written = install_units(&options).map_err(|e| e.to_string())?;

    if ctx.json {
        let json = serde_json::json!({
            "binary": options.binary,
            "units": written,
        });
        println!("{}", json_pretty(&json)?);
    } else {
        for path in &written {
            println!("installed {}", path.display());
        }
        println!("enable with: systemctl enable {}", poolswap_core::unit::PROVISION_UNIT);
    }
    Ok(EXIT_SUCCESS)
}
