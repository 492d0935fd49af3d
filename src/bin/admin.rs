//! CLI administration tool for the redirect registry.
//!
//! Runs registry maintenance directly against the database, without going
//! through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Import `old|new` pairs, one per line
//! cargo run --bin redirect-admin -- import redirects.txt
//!
//! # Review disabled entries matching a search
//! cargo run --bin redirect-admin -- list --state 0 --search "old page"
//!
//! # Delete every disabled entry
//! cargo run --bin redirect-admin -- purge
//!
//! # Check database connection
//! cargo run --bin redirect-admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server: `DATABASE_URL` (or `DB_*`), `SITE_ROOT_URL`, and optionally
//! `REDIS_URL` so imports and purges clear cached listings.

use redirect_registry::config::{self, Config};
use redirect_registry::domain::entities::{PublishState, RedirectEntry};
use redirect_registry::domain::listing::{
    DEFAULT_PAGE_SIZE, ListFilter, ListOrdering, ListQuery, PageRequest,
};
use redirect_registry::server;
use redirect_registry::state::DynRedirectService;
use redirect_registry::utils::batch_lines::parse_batch_lines;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::path::PathBuf;

/// CLI tool for managing the redirect registry.
#[derive(Parser)]
#[command(name = "redirect-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Import redirects from a file of `old|new` lines
    Import {
        /// Input file; blank lines and lines starting with `#` are skipped
        file: PathBuf,
    },

    /// List redirects
    List {
        /// `id:<n>` or a substring where spaces act as wildcards
        #[arg(short, long)]
        search: Option<String>,

        /// 0 = disabled, 1 = enabled, 2 = archived
        #[arg(long)]
        state: Option<String>,

        /// Ordering field (id, old_url, new_url, referer, hits, created_date, published)
        #[arg(short, long)]
        ordering: Option<String>,

        /// asc or desc
        #[arg(short, long)]
        direction: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Delete every disabled redirect
    Purge {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env()?;
    let pool = server::connect_pool(&config).await?;

    match cli.command {
        Commands::Import { file } => {
            let service = build_service(&config, pool).await?;
            handle_import(&service, file).await?
        }
        Commands::List {
            search,
            state,
            ordering,
            direction,
            page,
            page_size,
        } => {
            let filter = ListFilter::parse(search.as_deref(), state.as_deref())?;
            let ordering = ListOrdering::parse(ordering.as_deref(), direction.as_deref())?;
            let query = ListQuery::new(filter, ordering, PageRequest::new(page, page_size)?);

            let service = build_service(&config, pool).await?;
            handle_list(&service, &query).await?
        }
        Commands::Purge { yes } => {
            let service = build_service(&config, pool).await?;
            handle_purge(&service, yes).await?
        }
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

async fn build_service(config: &Config, pool: PgPool) -> Result<DynRedirectService> {
    let cache = server::connect_cache(config).await;
    server::redirect_service(config, pool, cache)
}

/// Imports a redirect file as one batch.
///
/// Duplicates are reported, not fatal. On a store failure nothing is imported,
/// and the duplicates found before the failure are still printed.
async fn handle_import(service: &DynRedirectService, file: PathBuf) -> Result<()> {
    println!("{}", "📥 Import Redirects".bright_blue().bold());
    println!();

    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let pairs = parse_batch_lines(&content)?;

    if pairs.is_empty() {
        println!("{}", "  Nothing to import".yellow());
        return Ok(());
    }

    println!("  Site root: {}", service.site_root().as_str().cyan());
    println!("  Pairs:     {}", pairs.len().to_string().bright_white());
    println!();

    match service.ingest(pairs).await {
        Ok(report) => {
            print_rejected(&report.rejected);
            println!(
                "{} {} imported, {} rejected",
                "✅".green(),
                report.accepted.to_string().bright_green().bold(),
                report.rejected.len().to_string().yellow().bold()
            );
            println!();
            Ok(())
        }
        Err(failure) => {
            print_rejected(&failure.rejected);
            println!("{}", "❌ Import failed, nothing was written".red().bold());
            Err(failure.into())
        }
    }
}

fn print_rejected(rejected: &[String]) {
    if rejected.is_empty() {
        return;
    }

    println!("{}", "Already registered:".bright_white().bold());
    for url in rejected {
        println!("  {}", url.yellow());
    }
    println!();
}

/// Prints one page of the listing.
///
/// # Output Format
///
/// ```text
/// 📋 Redirects (page 1 of 3, 61 total)
///
///   ID     State     Hits    Old URL                                  New URL
///   ──────────────────────────────────────────────────────────────────────────────
///   12     disabled  0       https://www.example.com/old-page         https://www.example.com/new
/// ```
async fn handle_list(service: &DynRedirectService, query: &ListQuery) -> Result<()> {
    let page = service.list(query).await?;

    println!(
        "{} (page {} of {}, {} total)",
        "📋 Redirects".bright_blue().bold(),
        page.page,
        page.total_pages().max(1),
        page.total.to_string().bright_white().bold()
    );
    println!();

    if page.items.is_empty() {
        println!("{}", "  No redirects found".yellow());
        return Ok(());
    }

    println!(
        "  {:<6} {:<9} {:<7} {:<40} {}",
        "ID".bright_white().bold(),
        "State".bright_white().bold(),
        "Hits".bright_white().bold(),
        "Old URL".bright_white().bold(),
        "New URL".bright_white().bold()
    );
    println!("  {}", "─".repeat(100).bright_black());

    for entry in &page.items {
        print_entry(entry);
    }

    println!();
    if page.has_next() {
        println!(
            "  Next page: {} {}",
            "--page".bright_cyan(),
            page.page + 1
        );
        println!();
    }

    Ok(())
}

fn print_entry(entry: &RedirectEntry) {
    let state = match entry.published {
        PublishState::Disabled => "disabled".red(),
        PublishState::Enabled => "enabled".green(),
        PublishState::Archived => "archived".bright_black(),
    };
    let target = if entry.has_target() {
        entry.new_url.cyan()
    } else {
        "(none)".bright_black()
    };

    println!(
        "  {:<6} {:<9} {:<7} {:<40} {}",
        entry.id.to_string().bright_black(),
        state,
        entry.hits,
        entry.old_url,
        target
    );
}

/// Deletes disabled redirects after confirmation (default: No).
async fn handle_purge(service: &DynRedirectService, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Purge Disabled Redirects".bright_blue().bold());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete every disabled redirect?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let removed = service.purge().await?;

    println!(
        "{} {} redirects removed",
        "✅".green(),
        removed.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            let (total, disabled): (i64, i64) = sqlx::query_as(
                "SELECT COUNT(*), COUNT(*) FILTER (WHERE published = 0) FROM redirect_links",
            )
            .fetch_one(pool)
            .await
            .context("Failed to count redirects (are migrations applied?)")?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Redirects:  {}", total.to_string().bright_green().bold());
            println!("  Disabled:   {}", disabled.to_string().yellow().bold());
            println!();
        }
        DbAction::Migrate => {
            println!("{}", "🛠  Applying migrations...".bright_blue());

            sqlx::migrate!("./migrations")
                .run(pool)
                .await
                .context("Failed to migrate")?;

            println!("{}", "✅ Migrations applied".green().bold());
        }
    }

    Ok(())
}
