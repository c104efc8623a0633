//! Service entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use consulta::{Agent, CandidateQuery, Config, RestApiConfig, SafetyValidator, ValidatedQuery};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Consulta: natural-language query agent over SQL and API backends
#[derive(Parser, Debug)]
#[command(name = "consulta")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask a question through the pipeline
    Ask {
        /// The question, in natural language
        question: String,
    },
    /// Validate a raw SQL query against the safety policy
    Check {
        /// SQL text to validate
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let is_serve = matches!(args.command, Some(Command::Serve { .. }) | None);
    if !is_serve {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = load_config(&args.config)?;

    match args.command {
        Some(Command::Serve { port }) => run_service(config, port).await,
        None => run_service(config, None).await,
        Some(Command::Ask { question }) => run_ask(config, question, args.json).await,
        Some(Command::Check { query }) => run_check(config, query, args.json),
    }
}

fn load_config(path: &Option<String>) -> anyhow::Result<Config> {
    let config = if let Some(path) = path {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    Ok(config)
}

async fn run_service(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Starting consulta v{}", env!("CARGO_PKG_VERSION"));

    let agent = Arc::new(Agent::from_config(&config)?);
    let router = consulta::create_rest_router(agent, &RestApiConfig::default());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr, "Listening");
    axum::serve(listener, router).await?;

    Ok(())
}

async fn run_ask(config: Config, question: String, json: bool) -> anyhow::Result<()> {
    let agent = Agent::from_config(&config)?;
    let report = agent.process(&question).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(query) = &report.generated_query {
        match query.as_str() {
            Some(sql) => println!("Consulta gerada: {sql}"),
            None => println!("Consulta gerada: {query}"),
        }
    }
    if let Some(answer) = &report.answer {
        println!("{answer}");
    }
    if let Some(error) = &report.error {
        eprintln!("{error}");
        std::process::exit(1);
    }
    Ok(())
}

fn run_check(config: Config, query: String, json: bool) -> anyhow::Result<()> {
    let catalog = consulta::Catalog::load(&config);
    let validator = SafetyValidator::new(catalog.policy.clone());
    let verdict = validator.validate(&CandidateQuery::sql(query.clone()));

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        println!("{}", verdict.reason);
    }

    // Exercise the same sealing step the pipeline uses.
    if ValidatedQuery::new(CandidateQuery::sql(query), &verdict).is_err() {
        std::process::exit(1);
    }
    Ok(())
}
