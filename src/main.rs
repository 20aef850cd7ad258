// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use valwatchd::{
    commands,
    config::{
        default_home_dir, load_chains_config, AppConfig, LoggingConfig, UsersConfig,
        CONFIG_FILE_NAME, USERS_FILE_NAME,
    },
    reload,
    worker::HealthWorker,
    AppContext,
};

#[derive(Parser)]
#[command(
    name = "valwatchd",
    about = "valwatchd — always-on validator health-watch daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Home directory holding config.yaml, users.yaml and chain.<name>.yaml
    #[arg(long, env = "VALWATCHD_HOME")]
    home: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the home directory and default config files.
    ///
    /// Files are created with permission 600; existing files are never
    /// overwritten. Safe to re-run.
    Init,
    /// Load and validate all config files.
    ///
    /// Exit code 0 when everything is valid, 1 otherwise.
    Check,
    /// Run the daemon in the foreground.
    ///
    /// Traps interrupt for a graceful shutdown; exit code 0 on clean exit.
    Start,
    /// Show binary version.
    Version {
        /// Print extra version information
        #[arg(long)]
        long: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let home_dir = args.home.unwrap_or_else(default_home_dir);

    match args.command {
        Command::Init => run_init(&home_dir),
        Command::Check => run_check(&home_dir),
        Command::Version { long } => {
            run_version(long);
            Ok(())
        }
        Command::Start => run_start(home_dir).await,
    }
}

// ─── valwatchd init ───────────────────────────────────────────────────────────

const CONFIG_TEMPLATE: &str = "\
# valwatchd configuration file
general:
  hot-reload: 5m
  health-check: 5m
worker:
  health-check-count: 5
logging:
  level: info # trace || debug || info || warn || error
  format: text # text || json
";

const USERS_TEMPLATE: &str = "\
# valwatchd users file
#
# users:
#   alice:
#     root: true
#     telegram:
#       username: alice
#       id: 12345678
#       token: \"bot-token\"
users: {}
";

fn run_init(home_dir: &Path) -> Result<()> {
    if !home_dir.exists() {
        println!("Home dir '{}' does not exist, creating it", home_dir.display());
        std::fs::create_dir_all(home_dir)
            .with_context(|| format!("unable to create home dir {}", home_dir.display()))?;
        set_permission(home_dir, 0o700)?;
    }

    for (file_name, template) in [(CONFIG_FILE_NAME, CONFIG_TEMPLATE), (USERS_FILE_NAME, USERS_TEMPLATE)] {
        let path = home_dir.join(file_name);
        if path.exists() {
            continue;
        }
        println!("Creating '{}' with permission 600", path.display());
        std::fs::write(&path, template)
            .with_context(|| format!("unable to write {}", path.display()))?;
        set_permission(&path, 0o600)?;
    }

    println!("Done");
    Ok(())
}

#[cfg(unix)]
fn set_permission(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("unable to set permission of {}", path.display()))
}

#[cfg(not(unix))]
fn set_permission(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

// ─── valwatchd check ──────────────────────────────────────────────────────────

fn run_check(home_dir: &Path) -> Result<()> {
    let mut failures = 0usize;

    match AppConfig::load(home_dir) {
        Ok(_) => println!("config.yaml: OK"),
        Err(e) => {
            eprintln!("config.yaml: {e}");
            failures += 1;
        }
    }

    let users = match UsersConfig::load(home_dir).and_then(|u| {
        u.validate()?;
        Ok(u)
    }) {
        Ok(users) => {
            println!("users.yaml: OK ({} users)", users.users.len());
            Some(users)
        }
        Err(e) => {
            eprintln!("users.yaml: {e}");
            failures += 1;
            None
        }
    };

    match load_chains_config(home_dir) {
        Ok(chains) => {
            if let Some(users) = &users {
                match valwatchd::config::validate_chains_config(&chains, users) {
                    Ok(()) => println!("chain configs: OK ({} chains)", chains.len()),
                    Err(e) => {
                        eprintln!("chain configs: {e}");
                        failures += 1;
                    }
                }
            } else {
                println!("chain configs: loaded {} (validation skipped, users invalid)", chains.len());
            }
        }
        Err(e) => {
            eprintln!("chain configs: {e}");
            failures += 1;
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ─── valwatchd version ────────────────────────────────────────────────────────

fn run_version(long: bool) {
    println!("valwatchd — always-on validator health-watch daemon");
    println!("{:<11} {}", "Version:", env!("CARGO_PKG_VERSION"));
    println!("{:<11} {}", "Commit:", option_env!("VALWATCHD_COMMIT").unwrap_or("unknown"));
    println!(
        "{:<11} {}",
        "Build date:",
        option_env!("VALWATCHD_BUILD_DATE").unwrap_or("unknown")
    );
    if long {
        println!(
            "{:<11} {}/{}",
            "Platform:",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
    }
}

// ─── valwatchd start ──────────────────────────────────────────────────────────

async fn run_start(home_dir: PathBuf) -> Result<()> {
    let config = AppConfig::load(&home_dir)
        .with_context(|| format!("unable to load configuration from {}", home_dir.display()))?;
    setup_logging(&config.logging);

    info!(pid = std::process::id(), home = %home_dir.display(), "daemon starting");

    let (ctx, announced) = AppContext::new(Arc::new(config), home_dir);

    let mut handles = Vec::new();
    handles.push(tokio::spawn(reload::run_hot_reload(ctx.clone())));
    handles.push(tokio::spawn(ctx.pusher.clone().run(
        ctx.users.clone(),
        ctx.bots.clone(),
        ctx.silencer.clone(),
        ctx.shutdown.clone(),
    )));
    for id in 0..ctx.config.health_check_workers() {
        handles.push(tokio::spawn(HealthWorker::new(ctx.clone(), id).run()));
    }
    handles.push(tokio::spawn(commands::run_dispatch_service(ctx.clone(), announced)));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for interrupt signal")?;
    info!("caught interrupt — shutting down");

    // No new bots from here on; then unblock every loop.
    ctx.bots.set_shutting_down();
    ctx.shutdown.cancel();

    for handle in handles {
        let _ = handle.await;
    }

    info!("clean exit");
    Ok(())
}

fn setup_logging(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
    }
}
