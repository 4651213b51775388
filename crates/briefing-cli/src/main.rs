use std::fmt::Write as _;

use anyhow::Context as _;
use briefing_aggregator::{build_orchestrator, registry_from_config, RefreshReport};
use briefing_core::SourceRegistry;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "briefing-cli")]
#[command(about = "Personal-finance news briefing command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one refresh pass and print the job summary
    Refresh {
        /// Refetch every source regardless of staleness
        #[arg(long)]
        force: bool,
        /// Print the full aggregate as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },
    /// List the configured feed sources
    Sources {
        /// Only show sources in this category (e.g., pensions)
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the persisted aggregate as JSON
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = briefing_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Refresh { force, json }) => {
            let orchestrator = build_orchestrator(&config)?;
            orchestrator.cache().hydrate().await;
            let report = orchestrator.refresh(force).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.response)?);
            } else {
                print!("{}", format_report(&report));
            }
        }
        Some(Commands::Sources { category }) => {
            let registry = registry_from_config(&config)?;
            print!("{}", format_sources(&registry, category.as_deref()));
        }
        Some(Commands::Show) => {
            let orchestrator = build_orchestrator(&config)?;
            if !orchestrator.cache().hydrate().await {
                anyhow::bail!(
                    "no persisted aggregate found (persistence: {}); run `briefing-cli refresh` with BRIEFING_KV_URL and BRIEFING_KV_TOKEN set",
                    orchestrator.cache().sink_name()
                );
            }
            let current = orchestrator
                .cache()
                .current()
                .await
                .context("snapshot has no aggregate")?;
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        None => {
            println!("briefing-cli: use --help to list commands");
        }
    }

    Ok(())
}

fn format_report(report: &RefreshReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "outcome:    {:?}", report.outcome);
    let _ = writeln!(out, "sources:    {}", report.sources_fetched);
    let _ = writeln!(out, "articles:   {}", report.articles_processed);
    let _ = writeln!(out, "categories: {}", report.categories);
    let _ = writeln!(out, "duration:   {}ms", report.duration.as_millis());
    let _ = writeln!(
        out,
        "generated:  {}",
        report.response.generated_at.to_rfc3339()
    );
    if !report.response.trending_topics.is_empty() {
        let topics: Vec<String> = report
            .response
            .trending_topics
            .iter()
            .map(|t| format!("{} ({})", t.topic, t.count))
            .collect();
        let _ = writeln!(out, "trending:   {}", topics.join(", "));
    }
    let _ = writeln!(out, "summary:    {}", report.response.master_summary);
    out
}

fn format_sources(registry: &SourceRegistry, category: Option<&str>) -> String {
    let mut out = String::new();
    for info in registry.categories() {
        if category.is_some_and(|c| c != info.key) {
            continue;
        }
        let _ = writeln!(out, "{} ({})", info.title, info.key);
        for source in registry.sources().iter().filter(|s| s.category == info.key) {
            let _ = writeln!(out, "  {:<28} {}", source.display_name, source.url);
        }
    }
    out
}
