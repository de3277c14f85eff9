use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use winecap::capsule::Capsule;
use winecap::launch;
use winecap::lock::LockGuard;

#[derive(Parser)]
#[command(
    name = "winecap-run",
    version,
    about = "Run and maintain winecap game capsules"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Launch an executable inside the capsule's sandbox.
    Launch {
        /// Path to the capsule bundle.
        bundle: PathBuf,
        /// Executable name inside the bundled game directory.
        executable: String,
        /// Arguments passed to the executable verbatim.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Delete the Wine prefix so the next launch recreates it.
    RebuildPrefix {
        /// Path to the capsule bundle.
        bundle: PathBuf,
    },
    /// Empty the capsule's shader/pipeline-state cache.
    ClearCache {
        /// Path to the capsule bundle.
        bundle: PathBuf,
    },
}

fn print_error_chain(err: &anyhow::Error) {
    eprintln!("Error: {err}");

    // Print the cause chain, if any, indented.
    let mut n = 0;
    let mut cur = err.source();
    while let Some(cause) = cur {
        eprintln!("  {n}: {cause}");
        n += 1;
        cur = cause.source();
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match real_main(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            print_error_chain(&err);
            std::process::exit(1);
        }
    }
}

fn real_main(cli: Cli) -> Result<i32> {
    match cli.command {
        CliCommand::Launch {
            bundle,
            executable,
            args,
        } => launch::launch(&bundle, &executable, &args),
        CliCommand::RebuildPrefix { bundle } => {
            let capsule = Capsule::open(&bundle)?;
            let _lock = LockGuard::acquire(&capsule.lock_path())?;
            capsule.rebuild_prefix()?;
            println!("Prefix removed; it will be recreated on the next launch.");
            Ok(0)
        }
        CliCommand::ClearCache { bundle } => {
            let capsule = Capsule::open(&bundle)?;
            let _lock = LockGuard::acquire(&capsule.lock_path())?;
            capsule.clear_cache()?;
            println!("Cache cleared.");
            Ok(0)
        }
    }
}
