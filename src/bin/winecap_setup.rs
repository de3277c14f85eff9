use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use winecap::feed::GithubFeed;
use winecap::fetch::DownloadCache;
use winecap::host::OsRelease;
use winecap::pm::Apt;
use winecap::provision::provision;

#[derive(Parser)]
#[command(
    name = "winecap-setup",
    version,
    about = "Provision this host so winecap capsules can run"
)]
struct Cli {
    /// Re-fetch cached downloads and force package reinstalls.
    #[arg(long)]
    reinstall: bool,
}

fn print_error_chain(err: &anyhow::Error) {
    eprintln!("Error: {err}");

    let mut n = 0;
    let mut cur = err.source();
    while let Some(cause) = cur {
        eprintln!("  {n}: {cause}");
        n += 1;
        cur = cause.source();
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = real_main() {
        print_error_chain(&err);
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();

    let os = OsRelease::load()?;
    let mut pm = Apt::new();
    let feed = GithubFeed::new();
    let cache = DownloadCache::host_default()?;

    provision(os, &mut pm, &feed, cache, cli.reinstall)?;

    println!("Provisioning complete. Capsules can now run on this host.");
    Ok(())
}
