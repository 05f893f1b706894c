use anyhow::{Context as _, Result};
use arc_swap::ArcSwap;
use clap::{Parser, Subcommand};
use keygate_auth::{AccessPolicy, CredentialResolver, Decision};
use keygate_config::{Config, ConfigWatcher, LogConfig, LogFormat};
use keygate_proxy::AppState;
use keygate_types::ProviderId;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "keygate", about = "keygate: access-code gated LLM API proxy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the proxy server.
    Serve {
        /// Path to the YAML configuration file. Watched for changes.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the listening port (default: 3000).
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the listening address (default: 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
    },
    /// Show how an Authorization header would be treated.
    CheckCode {
        /// Raw header value, e.g. "Bearer nk-abc".
        authorization: String,
        /// Provider the request would target.
        #[arg(long, default_value = "openai")]
        provider: String,
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, host } => cmd_serve(config, port, host).await,
        Commands::CheckCode {
            authorization,
            provider,
            config,
        } => cmd_check_code(&authorization, &provider, config),
    }
}

fn init_tracing(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("logging setup failed: {e}"))
}

async fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let watcher = Arc::new(
                ConfigWatcher::new(path).map_err(|e| anyhow::anyhow!("config error: {e}"))?,
            );
            let shared = watcher.arc();
            init_tracing(&shared.load().log)?;
            watcher.watch();
            shared
        }
        None => {
            let config = Config::load(None).map_err(|e| anyhow::anyhow!("config error: {e}"))?;
            init_tracing(&config.log)?;
            Arc::new(ArcSwap::from_pointee(config))
        }
    };

    let addr = {
        let snapshot = config.load();
        format!(
            "{}:{}",
            host.as_deref().unwrap_or(&snapshot.host),
            port.unwrap_or(snapshot.port)
        )
    };

    let state = AppState::new(config).context("failed to build HTTP client")?;
    let app = keygate_proxy::make_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "keygate listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

fn cmd_check_code(authorization: &str, provider: &str, config_path: Option<PathBuf>) -> Result<()> {
    let provider = provider
        .parse::<ProviderId>()
        .map_err(|e| anyhow::anyhow!("unknown provider '{provider}': {e}"))?;
    let config =
        Config::load(config_path.as_deref()).map_err(|e| anyhow::anyhow!("config error: {e}"))?;

    let policy = AccessPolicy::from_config(&config.access);
    match CredentialResolver::resolve(authorization, provider, &policy) {
        Decision::Allow(grant) => {
            let source = if grant.api_key.is_some() {
                "caller api key"
            } else if config.system_key(provider).is_some() {
                "system credential"
            } else {
                "no credential"
            };
            println!("{provider}: allowed ({source})");
            Ok(())
        }
        Decision::Deny(reason) => anyhow::bail!("{provider}: denied ({reason})"),
    }
}
