use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farm_agents::ChatRouter;
use farm_ml::{FreshnessModel, Generator, HttpGeneratorConfig, DEFAULT_MAX_OUTPUT_TOKENS};
use farm_observability::{init_tracing, AppMetrics};
use farm_storage::{KnowledgeRepository, SeedData, Store};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "farmbot")]
#[command(about = "Farm assistant CLI")]
struct Cli {
    /// SQLite URL such as `sqlite://farm.db?mode=rwc`; in-memory when unset.
    #[arg(long, env = "FARM_DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "FARM_GENERATOR_URL")]
    generator_url: Option<String>,

    #[arg(long, env = "FARM_GENERATOR_MODEL", default_value = "flan-t5-base")]
    generator_model: String,

    #[arg(long, env = "FARM_GENERATOR_API_KEY", hide_env_values = true)]
    generator_api_key: Option<String>,

    #[arg(long, env = "FARM_GENERATOR_TIMEOUT_SECONDS", default_value_t = 30)]
    generator_timeout_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema and insert the fixture rows into empty tables.
    Seed,
    /// Route a single question and print the reply.
    Ask { question: String },
    /// Interactive loop; `exit` or `quit` leaves.
    Chat,
    /// Score an image with the freshness model.
    Classify {
        image: PathBuf,
        #[arg(long, env = "FARM_FRESHNESS_MODEL")]
        model: PathBuf,
    },
    /// Print row counts per table.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("farm_cli");
    let cli = Cli::parse();

    match &cli.command {
        Command::Seed => {
            let store = open_store(cli.database_url.as_deref()).await?;
            let report = store.seed(&SeedData::defaults()).await?;
            let stats = store.stats().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "backend": store.backend_name(),
                    "seeded": {
                        "users": report.users,
                        "crops": report.crops,
                        "harvest_info": report.harvests,
                        "suppliers": report.suppliers,
                        "faq": report.faqs,
                        "transactions": report.transactions,
                    },
                    "stats": stats,
                }))?
            );
        }
        Command::Ask { question } => {
            let router = build_router(&cli).await?;
            let routed = router.reply(question).await;
            println!("{}", routed.reply);
        }
        Command::Chat => run_chat(build_router(&cli).await?).await?,
        Command::Classify { image, model } => {
            let model = FreshnessModel::load(model)?;
            let bytes = std::fs::read(image)
                .with_context(|| format!("failed reading image {}", image.display()))?;
            let report = tokio::task::spawn_blocking(move || model.classify_image(&bytes))
                .await
                .context("classification worker failed")??;
            println!("{}", serde_json::to_string_pretty(&report.to_payload())?);
        }
        Command::Stats => {
            let store = Store::open_seeded(cli.database_url.as_deref()).await?;
            let stats = store.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

async fn run_chat(router: ChatRouter<Store, Generator>) -> Result<()> {
    println!("Farm assistant chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let routed = router.reply(message).await;
        println!("\n{}\n", routed.reply);
    }

    Ok(())
}

async fn open_store(database_url: Option<&str>) -> Result<Store> {
    match database_url {
        Some(url) => Store::sqlite(url)
            .await
            .with_context(|| format!("failed opening database {url}")),
        None => Ok(Store::memory()),
    }
}

async fn build_router(cli: &Cli) -> Result<ChatRouter<Store, Generator>> {
    let store = Store::open_seeded(cli.database_url.as_deref()).await?;
    let generator = Generator::from_config(cli.generator_url.clone().map(|endpoint| {
        HttpGeneratorConfig {
            endpoint,
            model: cli.generator_model.clone(),
            api_key: cli.generator_api_key.clone(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }))?;

    Ok(ChatRouter::new(
        Arc::new(store),
        Arc::new(generator),
        AppMetrics::shared(),
        Duration::from_secs(cli.generator_timeout_seconds),
    ))
}
