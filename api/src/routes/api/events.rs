use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use chrono::Utc;
use domain::dtos::{
    BatchUpdatePayload, HeartbeatPayload, PipelineStatus, StatusChange, StatusStreamEvent,
    StreamErrorPayload,
};
use futures::{future::join_all, Stream, StreamExt};
use serde::Deserialize;
use std::{collections::HashMap, convert::Infallible, sync::Arc, time::Duration};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::{
    app_state::{AppState, Backend},
    backend::PipelineBackend,
    error::{ApiError, Result},
    utils::parse_id_list,
};

#[derive(Debug, Deserialize)]
pub struct StatusStreamQuery {
    #[serde(default)]
    pipeline_ids: Option<String>,
}

pub async fn status_stream(
    State(state): State<AppState>,
    Backend(backend): Backend,
    Query(query): Query<StatusStreamQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let pipeline_ids = parse_id_list(query.pipeline_ids.as_deref().unwrap_or_default());

    if pipeline_ids.is_empty() {
        return Err(ApiError::bad_request("pipeline_ids is required"));
    }

    debug!("Status stream opened for {pipeline_ids:?}");

    let events = status_events(
        backend,
        pipeline_ids,
        state.config.status_poll_interval,
        state.config.heartbeat_interval,
    )
    .filter_map(|event| async move {
        match event.data() {
            Ok(data) => Some(Ok(Event::default().event(event.event_name()).data(data))),
            Err(error) => {
                error!("Failed to serialize {} event: {error:?}", event.event_name());
                None
            }
        }
    });

    Ok(Sse::new(events))
}

enum Tick {
    Poll,
    Heartbeat,
}

/// Tracks what the client has already been told about each pipeline.
#[derive(Default)]
struct Seen {
    statuses: HashMap<String, PipelineStatus>,
    errors: HashMap<String, ApiError>,
}

impl Seen {
    /// Folds one round of health answers in, returning the status changes
    /// and any failures the client has not seen yet.
    fn observe(
        &mut self,
        results: Vec<(String, Result<PipelineStatus>)>,
    ) -> (Vec<StatusChange>, Vec<StreamErrorPayload>) {
        let mut changes = Vec::new();
        let mut failures = Vec::new();

        for (pipeline_id, result) in results {
            match result {
                Ok(status) => {
                    self.errors.remove(&pipeline_id);

                    let previous_status = self.statuses.insert(pipeline_id.clone(), status);
                    if previous_status != Some(status) {
                        changes.push(StatusChange {
                            pipeline_id,
                            status,
                            previous_status,
                        });
                    }
                }
                Err(error) => {
                    if self.errors.get(&pipeline_id) == Some(&error) {
                        continue;
                    }

                    failures.push(StreamErrorPayload {
                        pipeline_id: Some(pipeline_id.clone()),
                        code: error.status.as_u16(),
                        message: error.message.clone(),
                        timestamp: Utc::now(),
                    });
                    self.errors.insert(pipeline_id, error);
                }
            }
        }

        (changes, failures)
    }
}

async fn fetch_statuses(
    backend: &dyn PipelineBackend,
    pipeline_ids: &[String],
) -> Vec<(String, Result<PipelineStatus>)> {
    join_all(pipeline_ids.iter().map(|pipeline_id| async move {
        let result = backend
            .pipeline_health(pipeline_id)
            .await
            .map(|health| health.overall_status);

        (pipeline_id.clone(), result)
    }))
    .await
}

/// Polls the backend for every id and emits a snapshot, then only what
/// changed, with a heartbeat in between. Stops when the stream is dropped.
pub fn status_events(
    backend: Arc<dyn PipelineBackend>,
    pipeline_ids: Vec<String>,
    poll_interval: Duration,
    heartbeat_interval: Duration,
) -> impl Stream<Item = StatusStreamEvent> + Send + 'static {
    async_stream::stream! {
        let mut seen = Seen::default();
        let mut snapshot_sent = false;

        let mut poll = interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let tick = tokio::select! {
                _ = poll.tick() => Tick::Poll,
                _ = heartbeat.tick() => Tick::Heartbeat,
            };

            match tick {
                Tick::Heartbeat => {
                    yield StatusStreamEvent::Heartbeat(HeartbeatPayload { timestamp: Utc::now() });
                }
                Tick::Poll => {
                    let results = fetch_statuses(backend.as_ref(), &pipeline_ids).await;
                    let (changes, failures) = seen.observe(results);

                    for failure in failures {
                        yield StatusStreamEvent::Error(failure);
                    }

                    if !snapshot_sent {
                        snapshot_sent = true;
                        yield StatusStreamEvent::BatchUpdate(BatchUpdatePayload {
                            updates: changes,
                            timestamp: Utc::now(),
                        });
                    } else if let Some(event) = StatusStreamEvent::from_changes(changes, Utc::now()) {
                        yield event;
                    }
                }
            }
        }
    }
}
