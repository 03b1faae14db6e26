//! Courier ping
//!
//! Sends one request (or one broadcast action) through the gateway using the
//! `reqwest` transport and the tracing-backed spinner and error handler.
//!
//! ```text
//! COURIER_ROOT_SERVER_URL=https://httpbin.org courier-ping --path /status/500
//! courier-ping --config courier.toml --broadcast '{"type":"PING"}' --metrics
//! ```

use anyhow::Context;
use clap::Parser;
use courier_core::{CallerContext, RequestDescriptor};
use courier_gateway::metrics::install_prometheus_recorder;
use courier_gateway::{Gateway, GatewayConfig, GatewayEnvironment, HttpTransport};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "courier-ping", about = "Issue a call through the Courier gateway")]
struct Args {
    /// TOML configuration file (defaults to COURIER_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request path, resolved against the root server URL
    #[arg(long, default_value = "/")]
    path: String,

    /// Extra request headers as NAME=VALUE
    #[arg(long = "header", value_parser = parse_key_value)]
    headers: Vec<(String, String)>,

    /// Post this JSON action to the broadcast endpoint instead of calling --path
    #[arg(long)]
    broadcast: Option<String>,

    /// App id to attribute the call to
    #[arg(long)]
    app_id: Option<String>,

    /// Sub-app id to attribute the call to
    #[arg(long)]
    sub_app_id: Option<String>,

    /// Print Prometheus metrics after the call
    #[arg(long)]
    metrics: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_ping=info,courier_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let metrics = if args.metrics {
        Some(install_prometheus_recorder()?)
    } else {
        None
    };

    let config = match &args.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::from_env().context("loading configuration from environment")?,
    };
    tracing::info!(root = %config.root_server_url, "configuration loaded");

    let transport = HttpTransport::from_config(&config)?;
    let root_server_url = config.root_server_url.clone();
    let mut gateway = Gateway::new(config, transport, GatewayEnvironment::default());
    if args.app_id.is_some() || args.sub_app_id.is_some() {
        gateway = gateway.with_context(CallerContext::new(
            args.app_id.unwrap_or_default(),
            args.sub_app_id.unwrap_or_default(),
        ));
    }

    let outcome = if let Some(raw) = &args.broadcast {
        let action = serde_json::from_str(raw).context("parsing --broadcast as JSON")?;
        gateway.broadcast_action(Some(action)).await
    } else {
        let request = args.headers.into_iter().fold(
            RequestDescriptor::get(args.path).with_base_url(root_server_url),
            |request, (name, value)| request.with_header(name, value),
        );
        Some(gateway.call(request).await)
    };

    match outcome {
        None => println!("nothing to broadcast"),
        Some(Ok(response)) => {
            println!("status: {}", response.status);
            println!("{}", serde_json::to_string_pretty(&response.data)?);
        }
        Some(Err(error)) => {
            println!("error: {error}");
            println!("{}", serde_json::to_string_pretty(&error)?);
        }
    }

    if let Some(handle) = metrics {
        println!("\n{}", handle.render());
    }

    Ok(())
}
