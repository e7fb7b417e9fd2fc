//! Souk CLI - catalog seeding and inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # Seed an empty catalog (generator first, fallback list on failure)
//! souk-cli seed
//!
//! # Seed from the built-in list without calling the generator
//! souk-cli seed --fallback
//!
//! # List the catalog, filtered and sorted like the storefront does
//! souk-cli catalog list --category women --max-price 400 --sort price-asc
//!
//! # Allow the next start to seed again
//! souk-cli catalog reset-seed-marker
//! ```
//!
//! # Commands
//!
//! - `seed` - Initialize the configured catalog backend
//! - `catalog list` - Print products matching a browse query
//! - `catalog reset-seed-marker` - Clear the "already seeded" marker
//!
//! The backend is chosen from the same environment variables as the
//! storefront (`STOREFRONT_CATALOG_BACKEND`, `STOREFRONT_DATA_DIR`, ...).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;
use commands::catalog::ListArgs;

#[derive(Parser)]
#[command(name = "souk-cli")]
#[command(author, version, about = "Souk catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load or seed the catalog
    Seed {
        /// Number of products to request from the generator
        #[arg(short, long, default_value_t = 12)]
        count: usize,

        /// Skip the generator and seed the built-in products
        #[arg(long)]
        fallback: bool,
    },
    /// Inspect and maintain the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Print products matching a browse query
    List(ListArgs),
    /// Clear the "already seeded" marker
    ResetSeedMarker,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Seed { count, fallback } => {
            commands::seed::catalog(count, fallback).await?;
        }
        Commands::Catalog { action } => match action {
            CatalogAction::List(args) => commands::catalog::list(&args).await?,
            CatalogAction::ResetSeedMarker => commands::catalog::reset_seed_marker().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed() {
        let cli = Cli::try_parse_from(["souk-cli", "seed", "--count", "5", "--fallback"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Seed {
                count: 5,
                fallback: true
            }
        ));
    }

    #[test]
    fn test_parse_catalog_list() {
        let cli = Cli::try_parse_from([
            "souk-cli",
            "catalog",
            "list",
            "--category",
            "kids",
            "--sort",
            "rating-desc",
        ])
        .unwrap();
        let Commands::Catalog {
            action: CatalogAction::List(args),
        } = cli.command
        else {
            panic!("expected catalog list");
        };
        assert_eq!(args.category.as_deref(), Some("kids"));
        assert_eq!(args.sort.as_deref(), Some("rating-desc"));
    }

    #[test]
    fn test_parse_reset_seed_marker() {
        let cli = Cli::try_parse_from(["souk-cli", "catalog", "reset-seed-marker"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Catalog {
                action: CatalogAction::ResetSeedMarker
            }
        ));
    }
}
