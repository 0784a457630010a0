use std::{
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod manifest;
mod output;
mod session;

use commands::{AddCommand, RemoveCommand, ShowCommand, execute};
use manifest::Manifest;

#[derive(Clone, Debug)]
pub struct Context {
    pub manifest_dir: PathBuf,
    pub manifest: Manifest,
    pub use_sandbox: bool,
    pub api_key: Option<String>,
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Manage the saved card of a marketplace user", long_about = None)]
struct Opts {
    /// Path to the payments.yaml manifest file (default: ./payments.yaml)
    #[arg(
        long = "manifest-path",
        short = 'm',
        global = true,
        default_value = "./payments.yaml"
    )]
    manifest_path: PathBuf,

    /// Run against the in-memory sandbox processor instead of Stripe
    #[arg(long = "sandbox", short = 's', global = true, default_value = "false")]
    sandbox: bool,

    /// Stripe API secret key. If not provided, will check STRIPE_SECRET_KEY env var
    #[arg(long = "api-key", short = 'k', global = true)]
    api_key: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Show the saved card
    Show(ShowCommand),
    /// Save a card as the default payment method, replacing the current one
    Add(AddCommand),
    /// Delete the saved card
    Remove(RemoveCommand),
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

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Get the directory containing the manifest file
    let manifest_dir = opts
        .manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    // Load environment variables from .env file in manifest directory
    load_env_file(&manifest_dir);

    let manifest = match Manifest::load(&opts.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red(), e);
            process::exit(1);
        }
    };

    let api_key = opts
        .api_key
        .clone()
        .or_else(|| std::env::var("STRIPE_SECRET_KEY").ok())
        .filter(|key| !key.trim().is_empty());

    let ctx = Context {
        manifest_dir,
        use_sandbox: manifest.use_sandbox(opts.sandbox),
        manifest,
        api_key,
    };

    if let Err(e) = handle_command(opts, &ctx).await {
        eprintln!("{} {}", style("Error:").red(), e);
        process::exit(1);
    }
}

/// Load environment variables from .env file in the manifest directory
fn load_env_file(manifest_dir: &Path) {
    let env_file_path = manifest_dir.join(".env");

    match dotenvy::from_path(&env_file_path) {
        Ok(_) => {
            tracing::debug!(path = %env_file_path.display(), "Loaded environment file");
        }
        Err(e) if e.not_found() => {}
        Err(e) => {
            eprintln!(
                "{} Failed to load .env file at {}: {}",
                style("⚠").yellow(),
                env_file_path.display(),
                e
            );
        }
    }
}

async fn handle_command(opts: Opts, ctx: &Context) -> Result<(), String> {
    match opts.command {
        Command::Show(cmd) => execute(&cmd, ctx).await,
        Command::Add(cmd) => execute(&cmd, ctx).await,
        Command::Remove(cmd) => execute(&cmd, ctx).await,
    }
}
