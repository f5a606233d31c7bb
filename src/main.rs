mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use url::Url;

use beehub_core::config::{AppConfig, MIN_INTER_BATCH_DELAY_MS};
use beehub_core::Credentials;

use crate::cli::{Cli, Commands, CredentialArgs};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        AppConfig::embedded_source().to_string()
    });
    let mut config = AppConfig::from_toml_str(&config_str)?;

    // Environment overrides for pointing at a staging portal or slowing batches down
    if let Ok(v) = std::env::var("BEEHUB_PORTAL_ROOT") {
        config.portal.root_url = Url::parse(&v)?;
    }
    if let Ok(v) = std::env::var("BEEHUB_REGISTRATION_URL") {
        config.registration.endpoint_url = Url::parse(&v)?;
    }
    if let Ok(v) = std::env::var("BEEHUB_BATCH_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(ms) if ms >= MIN_INTER_BATCH_DELAY_MS => config.registration.inter_batch_delay_ms = ms,
            _ => warn!(
                value = %v,
                min = MIN_INTER_BATCH_DELAY_MS,
                "ignoring BEEHUB_BATCH_DELAY_MS below the rate limit"
            ),
        }
    }

    match cli.command {
        Commands::Login {
            credentials,
            print_token,
        } => {
            commands::login::run(config, into_credentials(credentials), print_token).await?;
        }
        Commands::Pick {
            credentials,
            courses,
        } => {
            commands::pick::run(config, into_credentials(credentials), &courses).await?;
        }
        Commands::Profile {
            credentials,
            with_photo,
        } => {
            commands::profile::run(config, into_credentials(credentials), with_photo).await?;
        }
        Commands::Courses { output } => {
            commands::courses::run(config, output).await?;
        }
    }

    Ok(())
}

fn into_credentials(args: CredentialArgs) -> Credentials {
    Credentials::new(args.email, args.password)
}
