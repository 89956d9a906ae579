mod config;
mod gerrit;
mod git;
mod grab;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use git::SystemGitClient;

/// Fetches every Gerrit change matching a query into a local
/// `review/<author>/<topic>` branch and exports each one as a patch file,
/// ready for offline review.
#[derive(Parser, Debug)]
#[command(name = "gerrit-grab", version, about)]
struct Cli {
    /// Gerrit hostname (default: review.openstack.org, or [gerrit] host
    /// in .gerrit-grab.toml)
    #[arg(long)]
    host: Option<String>,

    /// Gerrit username (falls back to config file, then GERRIT_USER)
    #[arg(long)]
    user: Option<String>,

    /// Gerrit HTTP password (falls back to config file, then
    /// GERRIT_HTTP_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Gerrit query matching *ALL* reviews to grab
    #[arg(long)]
    query: String,

    /// Full path to the project repo
    #[arg(long)]
    repo: PathBuf,

    /// Full path to where you want the patch files
    #[arg(long = "out-dir")]
    out_dir: PathBuf,

    /// The maximum number of reviews to grab. 0 for no limit
    #[arg(long, default_value_t = 0)]
    limit: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("gerrit_grab", query = %cli.query).entered();

    info!("loading configuration");
    let file_config = config::Config::load()?;
    let host = file_config.resolve_host(cli.host);
    let credentials = file_config.resolve_credentials(cli.user, cli.password)?;
    debug!(host = %host, user = %credentials.user, "resolved Gerrit endpoint");

    info!("querying Gerrit for matching changes");
    let records = gerrit::fetch_changes(&credentials, &host, &cli.query, cli.limit).await?;
    info!(changes = records.len(), "query complete");

    let git = SystemGitClient::new(cli.repo.clone());
    let mut grabbed = 0usize;
    for record in &records {
        let change = gerrit::Change::from_record(record)?;
        grab::materialize(&git, &change, &cli.out_dir)?;
        grabbed += 1;
    }

    println!(
        "{} {} change(s) into {}",
        "Grabbed".green(),
        grabbed,
        cli.out_dir.display()
    );
    Ok(())
}
