//! # Annotation Block CLI (`annot`)
//!
//! ## Usage
//!
//! ```bash
//! annot --config ./config/annotation.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `annot fetch` | Fetch annotations for a course/module/user and print them |
//! | `annot render` | Print the rendered block HTML |
//! | `annot key` | Print the cache key for a request |
//! | `annot serve` | Start the HTTP server |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use annotation_block::cache::cache_key;
use annotation_block::config::{self, Config};
use annotation_block::fetch::AnnotationFetcher;
use annotation_block::models::RequestContext;
use annotation_block::render::render_block;
use annotation_block::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Annotation Block: fetch, cache and render annotation cards from an
/// external API.
#[derive(Parser)]
#[command(name = "annot", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, defaults are used (except for `serve`).
    #[arg(long, global = true, default_value = "./config/annotation.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch annotations and print them.
    Fetch {
        #[command(flatten)]
        request: RequestArgs,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Fetch annotations and print the rendered block HTML.
    Render {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Print the cache key for a request.
    Key {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Args)]
struct RequestArgs {
    /// Course id.
    #[arg(long, default_value_t = 1)]
    course: i64,

    /// Course module id (0 outside a module).
    #[arg(long, default_value_t = 0)]
    module: i64,

    /// Viewing user id.
    #[arg(long)]
    user: i64,
}

impl RequestArgs {
    fn context(&self) -> RequestContext {
        RequestContext::new(self.course, self.module, self.user)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "annotation_block=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = match cli.command {
        Commands::Serve => config::load_config(&cli.config)?,
        _ => config::load_config_or_default(&cli.config)?,
    };

    match cli.command {
        Commands::Fetch { request, json } => {
            run_fetch(&cfg, &request.context(), json).await?;
        }
        Commands::Render { request } => {
            let fetcher = AnnotationFetcher::with_defaults();
            let annotations = fetcher.fetch(&request.context(), &cfg.fetch_config()).await;
            let block = render_block(cfg.block_title(), &annotations);
            println!("{}", block.text);
        }
        Commands::Key { request } => {
            println!("{}", cache_key(&cfg.fetch_config().api_url, &request.context()));
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_fetch(cfg: &Config, context: &RequestContext, json: bool) -> anyhow::Result<()> {
    let fetcher = AnnotationFetcher::with_defaults();
    let outcome = fetcher.fetch_outcome(context, &cfg.fetch_config()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(outcome.annotations())?);
        return Ok(());
    }

    println!(
        "{}: {} annotation(s) [{}]",
        cfg.block_title(),
        outcome.annotations().len(),
        outcome.label()
    );
    if outcome.is_fallback() {
        println!("  (API unavailable: showing fallback data; see log for details)");
    }
    println!();
    for (i, a) in outcome.annotations().iter().enumerate() {
        println!("{}. {}", i + 1, a.title);
        if !a.kind.is_empty() {
            println!("   type:        {}", a.kind);
        }
        if !a.description.is_empty() {
            println!("   description: {}", a.description);
        }
        if !a.image_url.is_empty() {
            println!("   image:       {}", a.image_url);
        }
        if !a.content.is_empty() {
            println!("   content:     {}", a.content);
        }
    }

    Ok(())
}
