use anyhow::{Context, Result};
use clap::Parser;
use oif_config::ConfigLoader;
use oif_types::{Config, Timestamp};
use serde_json::Value;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod scenario;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = if args.command.needs_config() {
		Some(load_config(&args.config).await?)
	} else {
		None
	};

	// CLI flag first, then the configured level
	let log_level = args
		.log_level
		.clone()
		.or_else(|| config.as_ref().map(|config| config.service.log_level.clone()))
		.unwrap_or_else(|| "info".to_string());
	setup_tracing(&log_level)?;

	let output = match args.command {
		Command::Validate => {
			let config = loaded(&config)?;
			info!(path = ?args.config, "Configuration is valid");
			commands::validate(config)
		}
		Command::EncodeOutput { file } => {
			commands::encode_output(&commands::read_output(&file).await?)?
		}
		Command::EncodeFill {
			file,
			solver,
			order_id,
			timestamp,
		} => commands::encode_fill(
			&commands::read_output(&file).await?,
			solver,
			order_id,
			timestamp.map_or_else(now, Ok)?,
		)?,
		Command::Resolve {
			file,
			solver,
			timestamp,
		} => commands::resolve(
			&commands::read_output(&file).await?,
			solver,
			timestamp.map_or_else(now, Ok)?,
		)?,
		Command::EncodeMessage {
			application,
			payloads,
		} => commands::encode_message(application, &payloads)?,
		Command::DecodeMessage { message } => commands::decode_message(&message)?,
		Command::Calldata {
			file,
			order_id,
			solver,
			fill_deadline,
		} => commands::calldata(
			&commands::read_output(&file).await?,
			order_id,
			solver,
			fill_deadline,
		),
		Command::Simulate { scenario: path } => {
			let config = loaded(&config)?;
			info!(service = %config.service.name, "Running scenario {:?}", path);
			let scenario = scenario::load(&path).await?;
			scenario::run(config, &scenario).await?
		}
	};

	print_json(&output)
}

async fn load_config(path: &Path) -> Result<Config> {
	ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.context("Failed to load configuration")
}

fn loaded(config: &Option<Config>) -> Result<&Config> {
	config.as_ref().context("Configuration not loaded")
}

/// Current Unix time as a wire timestamp.
fn now() -> Result<Timestamp> {
	Timestamp::try_from(chrono::Utc::now().timestamp()).context("Clock outside timestamp range")
}

fn print_json(value: &Value) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	// Logs go to stderr so command output stays parseable.
	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}
