use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use miniscrape_client::{DefaultService, build_service};
use miniscrape_core::config::AppConfig;
use miniscrape_core::models::{RunResult, RunSelector, RunStatus};

#[derive(Parser)]
#[command(name = "miniscrape", version, about = "Daily menu scraper")]
struct Cli {
    /// Directory with category definition files
    #[arg(long, global = true, env = "MINISCRAPE_CATEGORIES_DIR")]
    categories_dir: Option<PathBuf>,

    /// Disable the day cache for this invocation
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve pages and print their content
    Scrape {
        /// Category name (exact match)
        #[arg(short, long, default_value = "")]
        category: String,

        /// Required tag; repeat for several
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Page codename (substring match)
        #[arg(short = 'n', long, default_value = "")]
        page: String,

        /// Include disabled pages and bypass the cache
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the configured categories and pages
    Pages,

    /// Drop today's cached content
    Invalidate {
        /// Category name; empty drops the page in every category
        #[arg(short, long, default_value = "")]
        category: String,

        /// Page codename; empty drops the whole category
        #[arg(short = 'n', long, default_value = "")]
        page: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("miniscrape=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.categories_dir {
        config.categories_dir = dir;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    let service = build_service(&config).context("Failed to create scrape service")?;

    match cli.command {
        Commands::Scrape {
            category,
            tags,
            page,
            force,
            json,
        } => {
            let selector = RunSelector::new()
                .with_category(category)
                .with_page(page)
                .with_tags(tags)
                .forced(force);
            cmd_scrape(&service, &selector, json).await?;
        }
        Commands::Pages => cmd_pages(&service).await?,
        Commands::Invalidate { category, page } => {
            let selector = RunSelector::new().with_category(category).with_page(page);
            service.invalidate_cache(&selector).await;
            if !service.cache_enabled() {
                eprintln!("Cache is disabled, nothing to invalidate");
            }
        }
    }

    Ok(())
}

async fn cmd_scrape(service: &DefaultService, selector: &RunSelector, json: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling pending pages");
            on_signal.cancel();
        }
    });

    let mut results = service.scrape(&cancel, selector).await;
    results.sort_by(|a, b| {
        (&a.page().category, &a.page().codename).cmp(&(&b.page().category, &b.page().codename))
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No pages matched");
        return Ok(());
    }

    for result in &results {
        print_result(result);
    }

    let failed = results
        .iter()
        .filter(|r| r.status() == RunStatus::Error)
        .count();
    println!("\nTotal: {} pages ({} failed)", results.len(), failed);

    Ok(())
}

fn print_result(result: &RunResult) {
    let page = result.page();
    println!(
        "=== {} ({}) [{}] ===",
        if page.name.is_empty() {
            &page.codename
        } else {
            &page.name
        },
        page.namespace(),
        result.status()
    );
    match result.status() {
        RunStatus::Empty => println!("(no content)"),
        _ => println!("{}", result.content().trim_end()),
    }
    println!();
}

async fn cmd_pages(service: &DefaultService) -> Result<()> {
    let categories = service.categories().await?;

    if categories.is_empty() {
        println!("No categories found");
        return Ok(());
    }

    for category in categories.iter() {
        println!("{} ({} pages)", category.name, category.pages.len());
        for page in &category.pages {
            let tags = page.tags.iter().cloned().collect::<Vec<_>>().join(", ");
            println!(
                "  {:<20} {:<10} {}{}{}",
                page.codename,
                page.resolver,
                page.url,
                if tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{tags}]")
                },
                if page.disabled { " (disabled)" } else { "" },
            );
        }
    }

    Ok(())
}
