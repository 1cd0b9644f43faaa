//! `rpmrepo`: bring the metadata of a local RPM repository up to date.
//!
//! ```text
//! rpmrepo -n=sha256 -d=sha1 -f=true /srv/repo/el7
//! ```
//!
//! Settings come from `--config` (or the user's config directory), then
//! `RPMREPO_*` environment variables, then the flags given here.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser};
use exn::ResultExt;
use rpmrepo_config::RepoConfig;
use rpmrepo_metadata::NamingPolicy;
use rpmrepo_rpm::Digest;
use rpmrepo_storage::backend::LocalBackend;
use rpmrepo_update::{LeaseRegistry, Scheduler, UpdateCoordinator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rpmrepo", version, about)]
struct Cli {
    /// Repository root directory.
    repository: PathBuf,

    /// Metadata file naming: `plain`, `sha1` or `sha256`.
    #[arg(short = 'n', long = "naming-policy", value_parser = parse_naming)]
    naming: Option<NamingPolicy>,

    /// Package checksum algorithm: `sha1` or `sha256`.
    #[arg(short, long, value_parser = parse_digest)]
    digest: Option<Digest>,

    /// Whether to generate filelists.xml.
    #[arg(short, long)]
    filelists: Option<bool>,

    /// Settings file (YAML, TOML or JSON by extension).
    #[arg(short, long, env = "RPMREPO_CONFIG")]
    config: Option<PathBuf>,

    /// Keep running and rescan on the configured cron schedule.
    #[arg(long)]
    watch: bool,

    /// Log more; repeat for more detail. `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_naming(value: &str) -> std::result::Result<NamingPolicy, String> {
    value.parse::<NamingPolicy>().map_err(|err| (*err).to_string())
}

fn parse_digest(value: &str) -> std::result::Result<Digest, String> {
    value.parse::<Digest>().map_err(|err| (*err).to_string())
}

impl Cli {
    fn settings(&self) -> Result<RepoConfig> {
        let path = self.config.clone().or_else(|| RepoConfig::default_path().filter(|path| path.is_file()));
        let mut config = RepoConfig::load(path.as_deref()).or_raise(|| ErrorKind::Config)?;
        if let Some(naming) = self.naming {
            config.naming = naming;
        }
        if let Some(digest) = self.digest {
            config.digest = digest;
        }
        if let Some(filelists) = self.filelists {
            config.filelists = filelists;
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.settings()?;
    let name = cli.repository.display().to_string();
    let root = std::path::absolute(&cli.repository).or_raise(|| ErrorKind::Storage(name.clone()))?;
    let backend = LocalBackend::new(name.clone(), root).or_raise(|| ErrorKind::Storage(name.clone()))?;
    let coordinator = Arc::new(UpdateCoordinator::new(name, Arc::new(backend), config, LeaseRegistry::new()));

    let report = coordinator.rescan(None).await.or_raise(|| ErrorKind::Update)?;
    tracing::info!(
        revision = report.revision,
        packages = report.packages,
        added = report.added,
        removed = report.removed,
        "repository updated"
    );
    if !cli.watch {
        return Ok(());
    }

    let Some(scheduler) = Scheduler::for_coordinator(coordinator) else {
        exn::bail!(ErrorKind::NotScheduled);
    };
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted; stopping after the current update");
                token.cancel();
            }
        }
    });
    let runs = scheduler.run(token).await;
    tracing::info!(runs, "scheduler stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "rpmrepo failed");
            ExitCode::FAILURE
        },
    }
}
