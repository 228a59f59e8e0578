use clap::Parser;
use llm_bridge::config::{config_search_paths, ENV_BASE_URL, ENV_MAX_TOKENS, ENV_MODEL, ENV_PROVIDER};
use llm_bridge::{build_router, AppState, BridgeConfig, EnvTargetSource, SharedExchangeLog, TargetSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "llm-bridge",
    about = "Serve Claude Messages and Gemini generateContent clients from an OpenAI-compatible backend",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Exchange log file path (JSONL)
    #[arg(long, default_value = "llm-bridge.jsonl")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        println!("Target overrides: {ENV_MODEL}, {ENV_PROVIDER}, {ENV_BASE_URL}, {ENV_MAX_TOKENS}");
        return Ok(());
    }

    let mut config = BridgeConfig::find_and_load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let target_source = EnvTargetSource::new(config.target.clone());

    // Fail fast on a bad ceiling; requests re-resolve the target every time.
    let target = target_source.resolve_target()?;

    let exchanges = SharedExchangeLog::new(&cli.log_file)?;

    info!("llm-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("  Provider:   {}", target.provider_name);
    info!("  Base URL:   {}", target.base_url);
    info!("  Model:      {}", target.model);
    info!("  Max tokens: {}", target.max_tokens);
    info!("  Port:       {}", config.port);
    info!("  Log file:   {}", cli.log_file.display());

    let state = Arc::new(AppState {
        target: Arc::new(target_source),
        upstream_timeout: Duration::from_secs(config.upstream_timeout_secs),
        exchanges,
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  Claude: POST /v1/messages");
    info!("  Gemini: POST /v1beta/models/{{model}}:generateContent");

    axum::serve(listener, app).await?;

    Ok(())
}
