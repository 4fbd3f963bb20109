/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */
use std::net::AddrParseError;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use meterbridge::config::{Config, ConfigError};
use meterbridge::shutdown_handle::ShutdownHandle;
use tracing::metadata::LevelFilter;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);

    match cli.command {
        Command::Run(run_command) => {
            let spawn_handle = meterbridge::spawn((*run_command).try_into()?).await?;
            let (shutdown_tx, mut join_handle) = spawn_handle.into_parts();

            let joined = tokio::select! {
                _ = shutdown_signal() => {
                    tracing::info!("received shutdown signal, stopping");
                    std::mem::drop(shutdown_tx);
                    (&mut join_handle).await
                }
                joined = &mut join_handle => joined,
            };
            // A subscription that ended by itself (e.g. credentials refused) exits non-zero.
            joined.wrap_err("meterbridge task panicked")??;
        }
        Command::DefaultRunConfig => {
            print!("{}", Config::default().into_annotated_config_file())
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(error) => {
            tracing::warn!(%error, "could not install SIGTERM handler, only handling ctrl-c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[derive(clap::Parser, Debug)]
struct Cli {
    #[clap(long, short, help = "Turn on debug loggging (same as RUST_LOG=debug)")]
    debug: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Parser, Debug)]
enum Command {
    Run(Box<RunCommand>),
    #[clap(
        name = "default-config",
        about = "Output a default TOML config file for use with run -c"
    )]
    DefaultRunConfig,
}

#[derive(clap::Parser, Debug)]
struct RunCommand {
    #[clap(long, short, help = "Path to TOML configuration file")]
    config: Option<PathBuf>,
    #[clap(
        long,
        short,
        help = "Address to listen on for HTTP queries, overriding configuration file"
    )]
    address: Option<String>,
    #[clap(long, env = "MQTT_HOST", help = "MQTT broker host")]
    mqtt_host: Option<String>,
    #[clap(long, env = "MQTT_PORT", help = "MQTT broker port")]
    mqtt_port: Option<u16>,
    #[clap(long, env = "MQTT_USERNAME", help = "MQTT username")]
    mqtt_username: Option<String>,
    #[clap(
        long,
        env = "MQTT_PASSWORD",
        hide_env_values = true,
        help = "MQTT password"
    )]
    mqtt_password: Option<String>,
    #[clap(
        long,
        short = 't',
        help = "Topic filter to subscribe to, replacing the configured ones (can be repeated)"
    )]
    topic: Vec<String>,
}

impl TryInto<Config> for RunCommand {
    type Error = CliError;

    // Load the config file, or the default, allowing CLI flags to override the corresponding settings.
    fn try_into(self) -> Result<Config, Self::Error> {
        let mut config = if let Some(config_path) = self.config {
            Config::load(&config_path)?
        } else {
            Config::default()
        };

        if let Some(address) = self.address {
            config.listen_address =
                address
                    .parse()
                    .map_err(|error| CliError::InvalidListeningAddress {
                        addr: address,
                        error,
                    })?;
        }
        if let Some(mqtt_host) = self.mqtt_host {
            config.mqtt.host = mqtt_host;
        }
        if let Some(mqtt_port) = self.mqtt_port {
            config.mqtt.port = mqtt_port;
        }
        if let Some(mqtt_username) = self.mqtt_username {
            config.mqtt.username = Some(mqtt_username);
        }
        if let Some(mqtt_password) = self.mqtt_password {
            config.mqtt.password = Some(mqtt_password);
        }
        if !self.topic.is_empty() {
            config.mqtt.topics = self.topic;
        }

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("Invalid listening address {addr}: {error}")]
    InvalidListeningAddress { addr: String, error: AddrParseError },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn setup_logging(cli: &Cli) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = if cli.debug {
        Some(LevelFilter::DEBUG)
    } else {
        None
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::Layer::default().compact())
        .with(
            EnvFilter::builder()
                .with_default_directive(level.map(Into::into).unwrap_or(LevelFilter::INFO.into()))
                .from_env_lossy(),
        )
        .try_init()
    {
        panic!(
            "Failed to initialize trace logging for meterbridge. It's possible some earlier \
            code path has already set a global default log subscriber: {e}"
        );
    }
}
