use std::{
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use napthe_core::{NapTheConfig, config::CONFIG_FILE_NAME};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod charge;
mod check;
mod host;
mod init;

#[derive(Clone, Debug)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: NapTheConfig,
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "NapThe - prepaid card top-up operator CLI", long_about = None)]
struct Opts {
    /// Path to the napthe.yaml config file
    #[arg(long = "config", short = 'c', global = true, default_value = CONFIG_FILE_NAME)]
    config_path: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Write a default config file
    Init(init::InitCommand),
    /// Submit a card and optionally follow it until it resolves
    Charge(charge::ChargeCommand),
    /// Look up the provider status of a request
    Check(check::CheckCommand),
}

#[tokio::main]
async fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    let config_dir = opts
        .config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let is_init_command = matches!(opts.command, Command::Init(_));

    let config = if is_init_command {
        NapTheConfig::default()
    } else {
        load_env_file(&config_dir);
        let mut config = match NapTheConfig::load(&opts.config_path) {
            Ok(config) => {
                eprintln!("✓ Loaded config from {}", opts.config_path.display());
                config
            }
            Err(e) => {
                eprintln!("Warning: {}", e);
                eprintln!("Using default configuration...");
                NapTheConfig::default()
            }
        };
        config.apply_env();
        config
    };

    init_tracing(&config.log_level);

    let ctx = Context {
        config_path: opts.config_path.clone(),
        config,
    };

    if let Err(e) = handle_command(opts.command, &ctx).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Load environment variables from the .env file next to the config
fn load_env_file(config_dir: &Path) {
    let env_file_path = config_dir.join(".env");

    match dotenvy::from_path(&env_file_path) {
        Ok(_) => {
            eprintln!("✓ Loaded environment from {}", env_file_path.display());
        }
        Err(e) if e.not_found() => {}
        Err(e) => {
            eprintln!(
                "Warning: Failed to load .env file at {}: {}",
                env_file_path.display(),
                e
            );
        }
    }
}

fn init_tracing(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn handle_command(command: Command, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Command::Init(cmd) => cmd.execute(ctx),
        Command::Charge(cmd) => cmd.execute(ctx).await,
        Command::Check(cmd) => cmd.execute(ctx).await,
    }
}
