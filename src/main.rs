//! cloud-image-pool CLI
//!
//! Usage:
//!   cloud-image-pool ensure [distro] [version] [arch]   Make sure the image is in the pool
//!   cloud-image-pool resolve [distro] [version] [arch]  Show what would be downloaded
//!   cloud-image-pool list <distro> <version> <arch>     List cached entries for a tuple
//!
//! Missing positional values are picked interactively.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cloud_image_pool::helpers::http::ClientSettings;
use cloud_image_pool::helpers::{arch_options_for, choose_one};
use cloud_image_pool::pool::{Pool, PoolEntry};
use cloud_image_pool::repositories::{REPOS_ENV_VAR, Repositories};
use cloud_image_pool::{DirPool, Provisioner, ResolverRegistry, cache};

fn default_repos_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources").join("indexes.json")
}

#[derive(Parser)]
#[command(name = "cloud-image-pool")]
#[command(about = "Fetch and cache verified cloud base images in a storage pool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pool directory
    #[arg(short, long, global = true, default_value = "pool")]
    pool: PathBuf,

    /// Repository index JSON (falls back to $CLOUD_IMAGE_POOL_REPOS, then the bundled index)
    #[arg(short, long, global = true)]
    repos: Option<PathBuf>,

    /// Whole-request timeout in seconds; unlimited when unset
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct Tuple {
    distro: Option<String>,
    version: Option<String>,
    arch: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the image is present in the pool, downloading it if needed
    Ensure(Tuple),

    /// Resolve the upstream artifact without touching the pool
    Resolve(Tuple),

    /// List cached entries for a tuple, newest last
    List {
        distro: String,
        version: String,
        arch: String,
    },
}

fn load_repositories(path: Option<&PathBuf>) -> Result<Repositories> {
    if let Some(path) = path {
        return Repositories::from_file(path).with_context(|| format!("read repositories from {}", path.display()));
    }
    if std::env::var_os(REPOS_ENV_VAR).is_some() {
        return Repositories::from_env(REPOS_ENV_VAR).with_context(|| format!("parse ${REPOS_ENV_VAR}"));
    }
    let bundled = default_repos_path();
    if bundled.exists() {
        return Repositories::from_file(&bundled).with_context(|| format!("read {}", bundled.display()));
    }
    Ok(Repositories::builtin())
}

/// Fill in whatever the user left off the command line.
fn complete_tuple(tuple: Tuple, registry: &ResolverRegistry) -> Result<(String, String, String)> {
    let distro = match tuple.distro {
        Some(d) => d,
        None => choose_one("Select Distro", registry.distros())?,
    };

    let version = match tuple.version {
        Some(v) => v,
        None => {
            let versions = registry
                .get(&distro)
                .map(|s| s.known_versions())
                .unwrap_or_default();
            choose_one("Select Distro Version", versions)
                .with_context(|| format!("no known versions for '{distro}', pass one explicitly"))?
        }
    };

    let arch = match tuple.arch {
        Some(a) => a,
        None => choose_one("Select Architecture", arch_options_for(&distro))?,
    };

    Ok((distro, version, arch))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let repos = load_repositories(cli.repos.as_ref())?;
    let registry = ResolverRegistry::from_repositories(&repos);
    let settings = ClientSettings {
        timeout: cli.timeout_secs.map(Duration::from_secs),
        ..ClientSettings::default()
    };
    let provisioner = Provisioner::from_settings(&settings, registry)?.with_progress(true);

    match cli.command {
        Commands::Ensure(tuple) => {
            let (distro, version, arch) = complete_tuple(tuple, provisioner.registry())?;
            let pool = DirPool::open(&cli.pool)
                .await
                .with_context(|| format!("open pool {}", cli.pool.display()))?;
            let entry = provisioner
                .ensure(&pool, &distro, &version, &arch)
                .await
                .with_context(|| format!("ensure {distro} {version} {arch}"))?;
            println!("{}", entry.path().display());
        }
        Commands::Resolve(tuple) => {
            let (distro, version, arch) = complete_tuple(tuple, provisioner.registry())?;
            let artifact = provisioner
                .resolve(&distro, &version, &arch)
                .await
                .with_context(|| format!("resolve {distro} {version} {arch}"))?;
            println!("url:       {}", artifact.url());
            println!("serial:    {}", artifact.serial());
            println!(
                "checksum:  {} {}",
                artifact
                    .hash_algorithm()
                    .map(|a| a.as_str())
                    .unwrap_or("<none>"),
                artifact.checksum_value().unwrap_or("<none>")
            );
        }
        Commands::List { distro, version, arch } => {
            let pool = DirPool::open(&cli.pool)
                .await
                .with_context(|| format!("open pool {}", cli.pool.display()))?;
            let names = pool.list_names().await?;
            let mut cached = cache::list_cached(&names, &distro, &version, &arch);
            cached.sort();
            for name in cached {
                let entry = pool.lookup(name.as_str()).await?;
                println!("{}\t{}", entry.name(), entry.size().await?);
            }
        }
    }

    Ok(())
}
