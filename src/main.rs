use anyhow::Context;
use jarvis::{
    AppState, JarvisConfig,
    cli::{Cli, Commands, output::Output},
    rag::loader,
};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = JarvisConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    init_tracing(&config, cli.verbose);

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => serve(config, host, port, &output).await,
        Commands::Ingest { data_dir } => ingest(config, data_dir, &output).await,
        Commands::Ask { question } => ask(config, &question, &output).await,
        Commands::Config { validate } => show_config(&config, validate, &output),
    }
}

fn init_tracing(config: &JarvisConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!(
            "jarvis={0},jarvis_server={0},tower_http={0}",
            default_level
        )));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(
    mut config: JarvisConfig,
    host: Option<String>,
    port: Option<u16>,
    output: &Output,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let pipeline = config.build_pipeline()?;
    let addr = config.server_addr();
    let state = AppState::new(config, pipeline);
    let app = jarvis::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.banner();
    output.info(&format!("Listening on http://{}", addr));
    output.info(&format!("OpenAPI document at http://{}/api-docs/openapi.json", addr));
    tracing::info!(addr = %addr, "Jarvis server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn ingest(
    config: JarvisConfig,
    data_dir: Option<PathBuf>,
    output: &Output,
) -> anyhow::Result<()> {
    config.validate()?;
    let pipeline = config.build_pipeline()?;
    let data_dir = data_dir.unwrap_or_else(|| config.rag.data_dir.clone());

    let mut documents = loader::load_documents(&data_dir).await?;
    if documents.is_empty() {
        output.warning(&format!(
            "No documents found in {}. Ingesting the sample handbook instead.",
            data_dir.display()
        ));
        documents.push(loader::sample_document());
    }

    let total = documents.len();
    let mut chunks = 0;
    let mut failed = 0;

    for (i, doc) in documents.iter().enumerate() {
        output.step(i + 1, total, &doc.name);
        match pipeline.ingest_document(&doc.name, &doc.text).await {
            Ok(report) => {
                chunks += report.chunks;
                output.ingested(&report.source, report.chunks);
            }
            Err(e) => {
                failed += 1;
                tracing::error!(source = %doc.name, error = %e, "Ingestion failed");
                output.error(&format!("{}: {}", doc.name, e));
            }
        }
    }

    output.newline();
    if failed == total {
        anyhow::bail!("All {} documents failed to ingest", total);
    }
    output.success(&format!(
        "Ingested {} of {} documents ({} chunks)",
        total - failed,
        total,
        chunks
    ));
    Ok(())
}

async fn ask(config: JarvisConfig, question: &str, output: &Output) -> anyhow::Result<()> {
    config.validate()?;
    let pipeline = config.build_pipeline()?;

    let response = pipeline.answer_query(question).await?;

    output.header("Answer");
    output.answer(&response.answer);

    if response.sources.is_empty() {
        output.hint("Nothing relevant in the knowledge base. Try `jarvis-server ingest` first.");
    } else {
        output.header("Sources");
        for (i, source) in response.sources.iter().enumerate() {
            output.source(i + 1, source);
        }
    }
    output.newline();
    Ok(())
}

fn show_config(config: &JarvisConfig, validate: bool, output: &Output) -> anyhow::Result<()> {
    output.header("Configuration");
    output.raw(&config.to_redacted_toml()?);

    if validate {
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!("Invalid configuration");
            }
        }
    }
    Ok(())
}
