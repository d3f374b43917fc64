use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use font_core::{AppConfig, MatchMethod, MatchResult};
use font_acquisition::{GoogleFontsProvider, HttpFontFetcher};
use font_parser::FontParser;
use font_resolver_engine::{FontResolver, MatchRequest, MatchResponse};
use font_setup::{get_config_path, load_config, load_config_from, render_config, save_config_to};
use font_similarity::FeatureExtractor;
use font_updater::CatalogBuilder;

#[derive(Parser)]
#[command(name = "fr",
          about = "Free font alternatives finder",
          version,
          long_about = "Suggests free, visually similar replacements for a font family using\ncurated overrides, a reference catalog of feature vectors and\nkeyword-based category fallback.",
          arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// trace, debug, info, warn or error (RUST_LOG takes precedence when set)
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest free alternatives for a font family.
    #[command(alias = "m")]
    Match {
        /// Declared family name, as found in CSS or a document.
        #[arg(value_name = "FAMILY")]
        family: String,

        /// Declared weight, echoed back in the query summary.
        #[arg(long)]
        weight: Option<String>,

        /// Declared style, echoed back in the query summary.
        #[arg(long)]
        style: Option<String>,

        /// Local font file (TTF, OTF, WOFF or WOFF2) enabling visual matching.
        #[arg(short = 'f', long, value_name = "PATH", conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Font file URL fetched with the configured timeout.
        #[arg(short = 'u', long, value_name = "URL")]
        url: Option<String>,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,

        /// Reference catalog to use instead of the configured one.
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
    },

    /// Print the feature vector of a local font file.
    Extract {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Build the reference catalog from the Google Fonts listing (resumable).
    BuildCatalog {
        /// Catalog file to write; a `.gz` extension compresses it.
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Pause between two downloads in milliseconds.
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,

        /// Only process the first N families of the listing.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Inspect or create the configuration file.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show,
    /// Print where the configuration file lives.
    Path,
    /// Write a configuration file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load configuration")?;

    match cli.command {
        Commands::Match { family, weight, style, file, url, json, catalog } => {
            let mut request = MatchRequest::new(family);
            request.weight = weight;
            request.style = style;
            if let Some(path) = file {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                request = request.with_bytes(bytes);
            }
            if let Some(url) = url {
                request = request.with_url(url);
            }
            run_match(config, request, catalog, json).await?;
        }

        Commands::Extract { path, json } => run_extract(&path, json)?,

        Commands::BuildCatalog { output, delay_ms, limit } => {
            let mut builder_config = config.builder;
            if let Some(output) = output {
                builder_config.output_path = output;
            }
            if let Some(delay) = delay_ms {
                builder_config.download_delay_ms = delay;
            }
            run_build_catalog(builder_config, limit).await?;
        }

        Commands::Config(command) => {
            let path = match cli.config {
                Some(path) => path,
                None => get_config_path()?,
            };
            match command {
                ConfigCommands::Show => print!("{}", render_config(&config)),
                ConfigCommands::Path => println!("{}", path.display()),
                ConfigCommands::Init { force } => {
                    if path.exists() && !force {
                        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
                    }
                    save_config_to(&AppConfig::default(), &path)?;
                    println!("{} {}", "✅ Wrote default configuration to".green(), path.display());
                }
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level))?,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run_match(
    config: AppConfig,
    request: MatchRequest,
    catalog: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mut matcher_config = config.matcher;
    if let Some(path) = catalog {
        matcher_config.catalog_path = path;
    }
    debug!(catalog = %matcher_config.catalog_path.display(), "matching");

    let fetcher = HttpFontFetcher::new(Duration::from_millis(matcher_config.fetch_timeout_ms))?;
    let resolver = FontResolver::new(matcher_config).with_fetcher(Arc::new(fetcher));
    let response = resolver.resolve(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_match_response(&response);
    }
    Ok(())
}

fn print_match_response(response: &MatchResponse) {
    println!("🎯 Alternatives for: '{}'", response.query.family.bold());
    if let Some(category) = response.query.inferred_category {
        println!("   Looks like: {}", category);
    }
    if response.query.features.is_some() {
        println!("   Visual features: extracted from the supplied font");
    }
    println!("{}", "-".repeat(50));

    if response.method() == Some(MatchMethod::NoDatabase) {
        if let Some(result) = response.results.first() {
            println!("{}", "⚠️  REFERENCE CATALOG UNAVAILABLE".yellow().bold());
            println!("   {}", result.reason);
        }
        return;
    }

    for (rank, result) in response.results.iter().enumerate() {
        print_result(rank + 1, result);
    }
}

fn print_result(rank: usize, result: &MatchResult) {
    let score = format!("{:>3}%", result.similarity);
    let score = match result.similarity {
        90..=100 => score.green(),
        70..=89 => score.yellow(),
        _ => score.red(),
    };
    let method = match result.method {
        MatchMethod::NameOverride => "curated".cyan(),
        MatchMethod::ExactMatch => "exact".green(),
        MatchMethod::FeatureSimilarity => "visual".blue(),
        MatchMethod::CategoryFallback => "category".dimmed(),
        MatchMethod::NoDatabase => "no catalog".red(),
    };

    println!("{:>2}. {} {} [{}]", rank, score, result.family.bold(), method);
    println!("      {}", result.reason);
    if let Some(url) = &result.url {
        println!("      {}", url.dimmed());
    }
}

fn run_extract(path: &Path, json: bool) -> anyhow::Result<()> {
    let font = FontParser
        .parse_font_file(path)
        .with_context(|| format!("cannot decode {}", path.display()))?;
    let view = font.view()?;
    let vector = FeatureExtractor.extract(&view);
    let family = view.family_name();

    if json {
        let features: serde_json::Map<String, serde_json::Value> = vector
            .named()
            .map(|(dim, value)| (dim.name().to_string(), serde_json::json!(value)))
            .collect();
        let out = serde_json::json!({
            "family": family,
            "format": font.format().to_string(),
            "features": features,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("📊 {} ({})", family.as_deref().unwrap_or("unnamed font").bold(), font.format());
    println!("{}", "-".repeat(40));
    for (dim, value) in vector.named() {
        println!("   {:<16} {:.4}", dim.name(), value);
    }
    Ok(())
}

async fn run_build_catalog(config: font_core::BuilderConfig, limit: Option<usize>) -> anyhow::Result<()> {
    println!("{}", "🌐 BUILDING REFERENCE CATALOG".bold());
    println!("{}", "=".repeat(40));
    if config.api_key.is_none() {
        println!("{}", "⚠️  No API key configured; set GOOGLE_FONTS_API_KEY if the listing is refused".yellow());
    }

    let source = GoogleFontsProvider::new(&config)?;

    let report = CatalogBuilder::new(source, config)
        .with_limit(limit)
        .with_progress(true)
        .run()
        .await?;

    println!("✅ Catalog written to {}", report.output.display().to_string().bold());
    println!("   Processed: {}", report.processed);
    println!("   Skipped (already done): {}", report.skipped);
    if report.failed > 0 {
        println!("   {}", format!("Failed: {}", report.failed).yellow());
    } else {
        println!("   Failed: 0");
    }
    println!("   Records: {}", report.total_records);
    Ok(())
}
