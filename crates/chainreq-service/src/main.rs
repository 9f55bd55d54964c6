use anyhow::{Context, Result};
use chainreq_config::{Config, ConfigLoader};
use chainreq_core::EngineBuilder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;

#[derive(Parser)]
#[command(name = "chainreq")]
#[command(about = "Blockchain request lifecycle service", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	/// Overrides the configured log level (trace, debug, info, warn, error)
	#[arg(long, env = "CHAINREQ_CLI_LOG_LEVEL")]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the HTTP service
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	let log_level = cli
		.log_level
		.clone()
		.unwrap_or_else(|| config.service.log_level.clone());
	setup_tracing(&log_level)?;

	match cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => validate_config(&config),
	}
}

async fn start_service(config: Config) -> Result<()> {
	info!("Starting {}", config.service.name);

	let (host, port) = (config.service.http_host.clone(), config.service.http_port);
	let engine = EngineBuilder::new(config)
		.build()
		.await
		.context("Failed to build request engine")?;

	let server = api::ApiServer::new(host, port, Arc::new(engine));

	tokio::select! {
		result = server.run() => result.context("HTTP server failed")?,
		_ = setup_shutdown_signal() => {
			info!("Shutdown signal received, stopping HTTP server");
		}
	}

	info!("Service stopped");
	Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Service name: {}", config.service.name);
	info!(
		"HTTP endpoint: {}:{}",
		config.service.http_host, config.service.http_port
	);

	let mut chain_ids: Vec<_> = config.chains.keys().collect();
	chain_ids.sort();
	for chain_id in chain_ids {
		let chain = &config.chains[chain_id];
		info!(
			"  Chain {}: {} ({})",
			chain_id,
			chain.name.as_deref().unwrap_or("unnamed"),
			chain.rpc_url
		);
	}

	for project in &config.projects {
		info!("  Project {} on chain {}", project.id, project.chain_id);
	}

	info!("Storage backend: {}", config.storage.backend);

	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.try_init()
		.context("Failed to install tracing subscriber")?;

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			tracing::error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
