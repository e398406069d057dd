// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! `serve` runs the server tier: every submission is rate limited per
//! client address, checked for a User-Agent, a filled honeypot and junk
//! content, then relayed to the delivery endpoint.
//!
//! `send` runs the client tier from the command line: the same content
//! checks, a durable resubmission cooldown, and a direct relay.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX`: Submissions per window per address (default: 1)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
//! - `RELAY_ENDPOINT`: Delivery endpoint (default: Web3Forms)
//! - `RELAY_ACCESS_KEY`: Delivery access key

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    client::{ContactClient, SubmitControl},
    config::Config,
    cooldown::{FileStore, SubmissionCooldown, SystemWallClock},
    form::{ContactForm, EMAIL_FIELD, MESSAGE_FIELD, NAME_FIELD},
    handlers::{router, AppState},
    limiter::SystemClock,
    relay::{RelayClient, DEFAULT_USER_AGENT},
    validator::VALIDATED_FIELDS,
};

#[derive(Parser)]
#[command(name = "contact-relay", version, about = "Contact form relay with junk filtering")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server tier
    Serve {
        /// Override BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Submit a form from the command line (client tier)
    Send {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
        /// Extra form fields as key=value
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// User-Agent to identify as
        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config).await
        }
        Command::Send {
            name,
            email,
            message,
            fields,
            user_agent,
        } => {
            let mut form = ContactForm::new()
                .with(NAME_FIELD, name)
                .with(EMAIL_FIELD, email)
                .with(MESSAGE_FIELD, message);
            for (key, value) in fields {
                form.set(&key, value);
            }
            send(config, form, user_agent).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        endpoint = %config.relay.endpoint,
        "Starting contact relay"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let cleanup_every = config.rate_limit.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn send(config: Config, form: ContactForm, user_agent: String) -> anyhow::Result<()> {
    let relay = RelayClient::with_user_agent(&config.relay, &user_agent)?;
    let cooldown = SubmissionCooldown::new(
        Arc::new(FileStore::new(&config.client.state_path)),
        Arc::new(SystemWallClock),
        config.client.resubmit_window(),
    );
    let control = SubmitControl::new(
        Arc::new(SystemClock),
        config.client.reenable_delay(),
        config.client.status_hide_delay(),
    );
    let client = ContactClient::new(relay, cooldown, control, Some(user_agent));

    for &(field, kind) in VALIDATED_FIELDS {
        if let Some(msg) = client.check_field(form.text(field).unwrap_or(""), kind) {
            eprintln!("{field}: {msg}");
        }
    }

    match client.submit(&form).await {
        Ok(outcome) => {
            println!("{}", outcome.message);
            Ok(())
        }
        Err(contact_relay::SubmitError::RateLimited { retry_after }) => {
            anyhow::bail!(
                "Please wait {} seconds before submitting again ({}s left).",
                config.client.resubmit_window_secs,
                contact_relay::error::ceil_secs(retry_after)
            )
        }
        Err(e) => anyhow::bail!("{e}"),
    }
}
