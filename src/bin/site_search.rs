//! CLI binary for site search.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use site_search::{Permission, Site, SiteSearchConfig, User};
use site_search_core::RecordType;
use tracing_subscriber::EnvFilter;

/// Search a JSON dataset across every configured record type.
#[derive(Parser)]
#[command(name = "site-search", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset JSON file, overriding the configured one.
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Search for a term and print one JSON line per record type.
    Query {
        /// The search term.
        term: String,

        /// Name of the user to search as; configured users bring their
        /// permissions along.
        #[arg(long, default_value = "anonymous")]
        user: String,

        /// Search as a superuser.
        #[arg(long)]
        superuser: bool,

        /// Grant the user a permission (repeatable).
        #[arg(long = "grant", value_name = "PERMISSION")]
        grants: Vec<Permission>,

        /// Deny the user a permission (repeatable).
        #[arg(long = "deny", value_name = "PERMISSION")]
        denies: Vec<Permission>,

        /// Stop after the first record type with results.
        #[arg(long)]
        first: bool,
    },

    /// List the registered indices, one JSON line each.
    Indices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries results, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("site_search=info,site_search_core=info")
        }))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => SiteSearchConfig::from_file(path)?,
        None => {
            let path = SiteSearchConfig::default_config_path();
            if path.exists() {
                SiteSearchConfig::from_file(&path)?
            } else {
                SiteSearchConfig::default()
            }
        }
    };
    if let Some(dataset) = cli.dataset {
        config.dataset = Some(dataset);
    }

    let site = Site::from_config(&config)?;

    match cli.command {
        Command::Query {
            term,
            user,
            superuser,
            grants,
            denies,
            first,
        } => {
            let mut user = config.user(&user);
            if superuser {
                user = User::superuser(user.name()).with_permissions(user.permissions().clone());
            }
            for permission in grants {
                user.grant(permission);
            }
            for permission in denies {
                user.deny(permission);
            }
            run_query(&site, &user, &term, first).await
        }
        Command::Indices => list_indices(&site),
    }
}

async fn run_query(site: &Site, user: &User, term: &str, first: bool) -> anyhow::Result<()> {
    let limit = if first { 1 } else { usize::MAX };
    let results = site.search(user, term).take(limit);
    futures_util::pin_mut!(results);

    let mut printed = 0usize;
    while let Some(result) = results.next().await {
        println!("{}", serde_json::to_string(&result?)?);
        printed += 1;
    }
    tracing::info!(record_types = printed, "search finished");
    Ok(())
}

fn list_indices(site: &Site) -> anyhow::Result<()> {
    for group in site.registry().grouped() {
        for index in group.by_relevance() {
            let line = serde_json::json!({
                "record_type": group.record_type.name(),
                "type_label": group.record_type.plural_label(),
                "field": index.match_field(),
                "precondition": index.precondition().map(|p| p.as_str()),
                "max_results": index.max_results(),
                "relevance": index.relevance(),
            });
            println!("{line}");
        }
    }
    Ok(())
}
