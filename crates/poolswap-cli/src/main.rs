mod commands;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_EXHAUSTED, EXIT_FAILURE, EXIT_PRECONDITION};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "poolswap",
    version,
    about = "Provision ZFS-backed swap files on loop devices"
)]
struct Cli {
    /// Path to the configuration file [default: /etc/poolswap.toml if present].
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Host backend: "system" or "mock" (overrides host.backend).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Swap provisioning flags. Unset flags fall back to the config file, then
/// to the built-in defaults shown in brackets.
#[derive(Debug, Clone, Default, Args)]
pub struct SwapArgs {
    /// Pool to provision; repeat or comma-separate for several.
    #[arg(short, long = "pool", value_delimiter = ',')]
    pub pools: Vec<String>,
    /// Dataset name below each pool [default: swap].
    #[arg(short, long)]
    pub dataset: Option<String>,
    /// Swap file size, e.g. 4G or 512M [default: 4G].
    #[arg(short, long)]
    pub size: Option<String>,
    /// Create the dataset when it does not exist.
    #[arg(short, long, default_value_t = false)]
    pub create: bool,
    /// Never create the dataset, even if the config file says to.
    #[arg(long, default_value_t = false, conflicts_with = "create")]
    pub no_create: bool,
    /// Mountpoint every swap dataset must have [default: /swap].
    #[arg(long)]
    pub mountpoint: Option<PathBuf>,
    /// Lock file guarding against concurrent runs [default: /run/poolswap.lock].
    #[arg(long)]
    pub lock_file: Option<PathBuf>,
    /// Deduplication [default: off].
    #[arg(long)]
    pub dedup: Option<String>,
    /// Compression algorithm [default: zle].
    #[arg(long)]
    pub compression: Option<String>,
    /// ZIL log bias [default: throughput].
    #[arg(long)]
    pub logbias: Option<String>,
    /// Access time updates [default: off].
    #[arg(long)]
    pub atime: Option<String>,
    /// Relative access time updates [default: off].
    #[arg(long)]
    pub relatime: Option<String>,
    /// Record size [default: 4K].
    #[arg(long)]
    pub recordsize: Option<String>,
    /// com.sun:auto-snapshot policy [default: false].
    #[arg(long)]
    pub auto_snapshot: Option<String>,
    /// Checksum algorithm [default: on].
    #[arg(long)]
    pub checksum: Option<String>,
    /// Primary (ARC) cache mode [default: metadata].
    #[arg(long)]
    pub primarycache: Option<String>,
    /// Secondary (L2ARC) cache mode [default: none].
    #[arg(long)]
    pub secondarycache: Option<String>,
    /// Sync mode [default: always].
    #[arg(long)]
    pub sync: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile the swap dataset and activate a swap file on every listed pool.
    Provision {
        #[command(flatten)]
        swap: SwapArgs,
    },
    /// Provision exactly one pool, leaving it alone if its swap file already exists.
    Single {
        #[command(flatten)]
        swap: SwapArgs,
    },
    /// Unlock the encrypted volume, import its pool, mount data, start the container.
    Startup,
    /// Write systemd units that run provision (and startup) at boot.
    InstallUnit {
        /// Destination directory for unit files.
        #[arg(long, default_value = "/etc/systemd/system")]
        systemd_dir: PathBuf,
        /// Config path baked into ExecStart.
        #[arg(long, default_value = poolswap_schema::DEFAULT_CONFIG_PATH)]
        unit_config: PathBuf,
        /// Also install the startup unit.
        #[arg(long, default_value_t = false)]
        with_startup: bool,
        /// Skip `systemctl daemon-reload`.
        #[arg(long, default_value_t = false)]
        no_reload: bool,
    },
    /// Run diagnostic checks on the host and configuration.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("POOLSWAP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        backend: cli.backend,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Provision { swap } => commands::provision::run(&ctx, swap, false),
        Commands::Single { swap } => commands::provision::run(&ctx, swap, true),
        Commands::Startup => commands::startup::run(&ctx),
        Commands::InstallUnit {
            systemd_dir,
            unit_config,
            with_startup,
            no_reload,
        } => commands::install_unit::run(
            &ctx,
            systemd_dir,
            unit_config,
            with_startup,
            !no_reload,
        ),
        Commands::Doctor => commands::doctor::run(&ctx),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("precondition failed:") {
                EXIT_PRECONDITION
            } else if msg.starts_with("resource exhausted:") {
                EXIT_EXHAUSTED
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
