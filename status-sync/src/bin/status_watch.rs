use anyhow::{bail, Context};
use dotenvy::dotenv;
use status_sync::{HttpHealthSource, StatusNotification, StatusSync, SyncConfig};
use std::{env, process, sync::Arc};
use tokio::{signal::ctrl_c, sync::broadcast::error::RecvError};
use tracing::{error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter_layer = EnvFilter::from_default_env();
    let fmt_layer = fmt::layer().with_target(false).with_line_number(true);

    let loki_layer = match env::var("LOKI_URL") {
        Ok(loki_url) => {
            let (layer, task) = tracing_loki::builder()
                .label("service", "status-watch")?
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

    let console_url =
        env::var("CONSOLE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let pipeline_ids: Vec<String> = env::var("PIPELINE_IDS")
        .context("PIPELINE_IDS must be set")?
        .split(',')
        .map(str::trim)
        .filter(|pipeline_id| !pipeline_id.is_empty())
        .map(str::to_string)
        .collect();

    if pipeline_ids.is_empty() {
        bail!("PIPELINE_IDS must name at least one pipeline");
    }

    let source = Arc::new(HttpHealthSource::new(&console_url));
    let sync = StatusSync::start(source, SyncConfig::default(), pipeline_ids.clone());
    let mut notifications = sync.subscribe();

    info!("Watching {pipeline_ids:?} on {console_url}");

    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Ok(StatusNotification::Changed { pipeline_id, status: Some(status), optimistic }) => {
                    info!("{pipeline_id}: {status}{}", if optimistic { " (pending)" } else { "" });
                }
                Ok(StatusNotification::Changed { pipeline_id, status: None, .. }) => {
                    info!("{pipeline_id}: unknown");
                }
                Ok(StatusNotification::Failed { pipeline_id, error }) => {
                    error!("{pipeline_id}: {error}");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Dropped {skipped} status notifications");
                }
                Err(RecvError::Closed) => break,
            },
            result = ctrl_c() => {
                if let Err(error) = result {
                    error!("Failed to listen for Ctrl-C: {error:?}");
                }
                break;
            }
        }
    }

    info!("Shutting down, transport was {:?}", sync.mode());
    sync.shutdown();

    Ok(())
}
