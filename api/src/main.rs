use anyhow::Context;
use api::{app, app_state::AppState, config::Config};
use dotenvy::dotenv;
use std::{env, process};
use tokio::{net::TcpListener, signal::ctrl_c};
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter_layer = EnvFilter::from_default_env();
    let fmt_layer = fmt::layer().with_target(false).with_line_number(true);

    let loki_layer = match env::var("LOKI_URL") {
        Ok(loki_url) => {
            let (layer, task) = tracing_loki::builder()
                .label("service", "api")?
                .extra_field("pid", format!("{}", process::id()))?
                .build_url(loki_url.parse().context("Failed to parse Loki URL")?)?;

            tokio::spawn(task);
            Some(layer)
        }
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(loki_layer)
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let listen_addr = config.listen_addr.clone();
    let state = AppState::from_config(config).context("Failed to build HTTP clients")?;

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    info!("Console API listening on {listen_addr}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(error) = ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {error:?}");
            }
            info!("Shutting down console API");
        })
        .await
        .context("Console API server failed")?;

    Ok(())
}
