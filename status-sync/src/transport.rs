//! One "tell me when a pipeline's status changes" interface over two
//! transports: the console's SSE stream, and per-pipeline health polling once
//! the stream has failed too often.

use async_trait::async_trait;
use domain::dtos::{
    ApiErrorBody, PipelineHealth, PipelineStatus, StatusStreamEvent, StatusStreamEventError,
};
use futures::{stream::BoxStream, StreamExt};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::TransportConfig;
use crate::error::{Result, SyncError};
use crate::sse::SseParser;

pub type EventStream = BoxStream<'static, Result<StatusStreamEvent>>;

/// Where pipeline status comes from.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn fetch_health(&self, pipeline_id: &str) -> Result<PipelineHealth>;

    async fn open_stream(&self, pipeline_ids: &[String]) -> Result<EventStream>;
}

/// Talks to the console's `/api` routes.
#[derive(Debug, Clone)]
pub struct HttpHealthSource {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpHealthSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// `GET` on the base url plus `segments`, each one percent-encoded.
    fn get(&self, segments: &[&str]) -> Result<reqwest::RequestBuilder> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|error| SyncError::InvalidUrl(format!("{}: {error}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| SyncError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        let request = self.client.get(url);

        Ok(match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }
}

async fn error_from_response(response: reqwest::Response) -> SyncError {
    let status = response.status().as_u16();

    let body = response
        .json::<ApiErrorBody>()
        .await
        .unwrap_or_else(|_| ApiErrorBody::new(status, format!("unexpected status {status}")));

    SyncError::Api(body)
}

#[async_trait]
impl HealthSource for HttpHealthSource {
    async fn fetch_health(&self, pipeline_id: &str) -> Result<PipelineHealth> {
        let response = self
            .get(&["api", "pipeline", pipeline_id, "health"])?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn open_stream(&self, pipeline_ids: &[String]) -> Result<EventStream> {
        let response = self
            .get(&["api", "pipeline", "status", "stream"])?
            .query(&[("pipeline_ids", pipeline_ids.join(","))])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut bytes = response.bytes_stream();

        let events = async_stream::stream! {
            let mut parser = SseParser::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        yield Err(SyncError::from(error));
                        break;
                    }
                };

                for frame in parser.push(&chunk) {
                    match StatusStreamEvent::parse(&frame.event, &frame.data) {
                        Ok(event) => yield Ok(event),
                        Err(StatusStreamEventError::UnknownEvent(name)) => {
                            debug!("Skipping unknown stream event: {name}");
                        }
                        Err(error) => yield Err(SyncError::from(error)),
                    }
                }
            }
        };

        Ok(events.boxed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Streaming,
    Polling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportUpdate {
    Status {
        pipeline_id: String,
        status: PipelineStatus,
    },
    /// Polling gave up on this id; it is not checked again until re-watched.
    Failed {
        pipeline_id: String,
        error: ApiErrorBody,
    },
}

#[derive(Debug)]
enum Command {
    Watch(String),
    Unwatch(String),
}

pub struct TransportAdapter {
    commands: mpsc::UnboundedSender<Command>,
    mode: watch::Receiver<TransportMode>,
    task: JoinHandle<()>,
}

impl TransportAdapter {
    pub fn spawn(
        source: Arc<dyn HealthSource>,
        config: TransportConfig,
        pipeline_ids: impl IntoIterator<Item = String>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportUpdate>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (updates, update_rx) = mpsc::unbounded_channel();
        let (mode_tx, mode) = watch::channel(TransportMode::Streaming);

        let worker = Worker {
            source,
            config,
            commands: command_rx,
            updates,
            mode: mode_tx,
            watched: pipeline_ids.into_iter().collect(),
            last_seen: HashMap::new(),
        };

        let task = tokio::spawn(worker.run());

        (
            Self {
                commands,
                mode,
                task,
            },
            update_rx,
        )
    }

    pub fn watch(&self, pipeline_id: impl Into<String>) {
        if self.commands.send(Command::Watch(pipeline_id.into())).is_err() {
            debug!("Transport adapter is gone, ignoring watch");
        }
    }

    pub fn unwatch(&self, pipeline_id: impl Into<String>) {
        if self.commands.send(Command::Unwatch(pipeline_id.into())).is_err() {
            debug!("Transport adapter is gone, ignoring unwatch");
        }
    }

    pub fn mode(&self) -> TransportMode {
        *self.mode.borrow()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for TransportAdapter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum StreamOutcome {
    WatchedChanged,
    Ended,
    Failed,
}

struct Worker {
    source: Arc<dyn HealthSource>,
    config: TransportConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    updates: mpsc::UnboundedSender<TransportUpdate>,
    mode: watch::Sender<TransportMode>,
    watched: BTreeSet<String>,
    last_seen: HashMap<String, PipelineStatus>,
}

impl Worker {
    async fn run(mut self) {
        if self.stream().await {
            self.poll().await;
        }
    }

    /// Returns whether the watched set changed.
    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Watch(pipeline_id) => self.watched.insert(pipeline_id),
            Command::Unwatch(pipeline_id) => {
                self.last_seen.remove(&pipeline_id);
                self.watched.remove(&pipeline_id)
            }
        }
    }

    /// Forwards a status if it differs from the last one seen for the id.
    /// Returns `false` once nobody listens anymore.
    fn emit_status(&mut self, pipeline_id: String, status: PipelineStatus) -> bool {
        if !self.watched.contains(&pipeline_id) || self.last_seen.get(&pipeline_id) == Some(&status)
        {
            return true;
        }

        self.last_seen.insert(pipeline_id.clone(), status);
        self.updates
            .send(TransportUpdate::Status {
                pipeline_id,
                status,
            })
            .is_ok()
    }

    /// Streaming phase. Returns `true` when polling should take over and
    /// `false` when the adapter is shutting down.
    async fn stream(&mut self) -> bool {
        let mut failures = 0;

        loop {
            if self.watched.is_empty() {
                match self.commands.recv().await {
                    Some(command) => {
                        self.apply(command);
                        continue;
                    }
                    None => return false,
                }
            }

            let pipeline_ids: Vec<String> = self.watched.iter().cloned().collect();
            debug!("Opening status stream for {pipeline_ids:?}");

            let outcome = match self.source.open_stream(&pipeline_ids).await {
                Ok(mut events) => {
                    info!("Status stream open for {} pipeline(s)", pipeline_ids.len());

                    // Only a stream that actually delivers counts as healthy.
                    let mut delivered = false;

                    loop {
                        tokio::select! {
                            command = self.commands.recv() => match command {
                                Some(command) => {
                                    if self.apply(command) {
                                        break StreamOutcome::WatchedChanged;
                                    }
                                }
                                None => return false,
                            },
                            event = events.next() => match event {
                                Some(Ok(event)) => {
                                    if !delivered {
                                        delivered = true;
                                        failures = 0;
                                    }

                                    if let StatusStreamEvent::Error(payload) = &event {
                                        debug!("Stream reported error: {payload:?}");
                                    }

                                    for change in event.changes() {
                                        if !self.emit_status(change.pipeline_id, change.status) {
                                            return false;
                                        }
                                    }
                                }
                                Some(Err(error)) => {
                                    warn!("Status stream failed: {error}");
                                    break StreamOutcome::Failed;
                                }
                                None if delivered => {
                                    debug!("Status stream ended");
                                    break StreamOutcome::Ended;
                                }
                                None => {
                                    warn!("Status stream closed before delivering anything");
                                    break StreamOutcome::Failed;
                                }
                            },
                        }
                    }
                }
                Err(error) => {
                    warn!("Failed to open status stream: {error}");
                    StreamOutcome::Failed
                }
            };

            match outcome {
                StreamOutcome::WatchedChanged => continue,
                StreamOutcome::Failed => {
                    failures += 1;
                    if failures >= self.config.max_stream_failures {
                        warn!("Status stream failed {failures} times in a row, falling back to polling");
                        return true;
                    }
                }
                StreamOutcome::Ended => {}
            }

            let delay = tokio::time::sleep(self.config.reconnect_delay);
            tokio::pin!(delay);

            loop {
                tokio::select! {
                    () = &mut delay => break,
                    command = self.commands.recv() => match command {
                        Some(command) => {
                            self.apply(command);
                        }
                        None => return false,
                    },
                }
            }
        }
    }

    async fn poll(&mut self) {
        self.mode.send_replace(TransportMode::Polling);

        let mut failures: HashMap<String, u32> = HashMap::new();
        let mut exhausted: HashSet<String> = HashSet::new();

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pipeline_ids: Vec<String> = self
                        .watched
                        .iter()
                        .filter(|pipeline_id| !exhausted.contains(*pipeline_id))
                        .cloned()
                        .collect();

                    for pipeline_id in pipeline_ids {
                        match self.source.fetch_health(&pipeline_id).await {
                            Ok(health) => {
                                failures.remove(&pipeline_id);
                                if !self.emit_status(pipeline_id, health.overall_status) {
                                    return;
                                }
                            }
                            Err(error) => {
                                let count = failures.entry(pipeline_id.clone()).or_insert(0);
                                *count += 1;
                                warn!(
                                    "Health check for {pipeline_id} failed ({count}/{}): {error}",
                                    self.config.max_poll_failures
                                );

                                if *count >= self.config.max_poll_failures {
                                    error!("Giving up on {pipeline_id} after {count} failed health checks");
                                    exhausted.insert(pipeline_id.clone());

                                    let update = TransportUpdate::Failed {
                                        pipeline_id,
                                        error: error.to_api_error(),
                                    };
                                    if self.updates.send(update).is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                }
                command = self.commands.recv() => match command {
                    Some(command) => {
                        // Watching an id again gives it a fresh retry budget.
                        let (Command::Watch(pipeline_id) | Command::Unwatch(pipeline_id)) = &command;
                        failures.remove(pipeline_id);
                        exhausted.remove(pipeline_id);
                        self.apply(command);
                    }
                    None => return,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::dtos::{StatusUpdatePayload, StreamErrorPayload};
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    /// What one `open_stream` call does.
    #[derive(Clone)]
    enum Attempt {
        Refuse,
        /// Opens, sends the events, then the connection resets.
        Break(Vec<StatusStreamEvent>),
        /// Opens, sends the events, then stays quiet.
        Hold(Vec<StatusStreamEvent>),
    }

    struct FakeSource {
        script: Mutex<VecDeque<Attempt>>,
        fallback: Attempt,
        opened_with: Mutex<Vec<Vec<String>>>,
        health: Mutex<HashMap<String, PipelineStatus>>,
    }

    impl FakeSource {
        /// Every stream attempt behaves like `fallback` once the script runs out.
        fn new(fallback: Attempt) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                opened_with: Mutex::new(Vec::new()),
                health: Mutex::new(HashMap::new()),
            }
        }

        fn scripted(self, attempts: impl IntoIterator<Item = Attempt>) -> Self {
            self.script.lock().unwrap().extend(attempts);
            self
        }

        fn with_health(self, pipeline_id: &str, status: PipelineStatus) -> Self {
            self.health
                .lock()
                .unwrap()
                .insert(pipeline_id.to_string(), status);
            self
        }

        fn attempts(&self) -> usize {
            self.opened_with.lock().unwrap().len()
        }

        fn opened_with(&self) -> Vec<Vec<String>> {
            self.opened_with.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HealthSource for FakeSource {
        async fn fetch_health(&self, pipeline_id: &str) -> Result<PipelineHealth> {
            let status = self.health.lock().unwrap().get(pipeline_id).copied();

            match status {
                Some(status) => Ok(PipelineHealth {
                    pipeline_id: pipeline_id.to_string(),
                    pipeline_name: pipeline_id.to_string(),
                    overall_status: status,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }),
                None => Err(SyncError::Api(ApiErrorBody::new(404, "not found"))),
            }
        }

        async fn open_stream(&self, pipeline_ids: &[String]) -> Result<EventStream> {
            self.opened_with.lock().unwrap().push(pipeline_ids.to_vec());
            let attempt = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            match attempt {
                Attempt::Refuse => Err(SyncError::Stream("connection refused".to_string())),
                Attempt::Break(events) => Ok(stream::iter(events.into_iter().map(Ok))
                    .chain(stream::once(async {
                        Err(SyncError::Stream("connection reset".to_string()))
                    }))
                    .boxed()),
                Attempt::Hold(events) => Ok(stream::iter(events.into_iter().map(Ok))
                    .chain(stream::pending())
                    .boxed()),
            }
        }
    }

    fn update(pipeline_id: &str, status: PipelineStatus) -> StatusStreamEvent {
        StatusStreamEvent::StatusUpdate(StatusUpdatePayload {
            pipeline_id: pipeline_id.to_string(),
            status,
            previous_status: None,
            timestamp: Utc::now(),
        })
    }

    fn status(pipeline_id: &str, status: PipelineStatus) -> TransportUpdate {
        TransportUpdate::Status {
            pipeline_id: pipeline_id.to_string(),
            status,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_polling_after_repeated_stream_failures() {
        let source = Arc::new(
            FakeSource::new(Attempt::Refuse).with_health("orders", PipelineStatus::Running),
        );
        let (adapter, mut updates) = TransportAdapter::spawn(
            source.clone(),
            TransportConfig::default(),
            ["orders".to_string()],
        );

        let update = timeout(Duration::from_secs(30), updates.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(update, status("orders", PipelineStatus::Running));
        assert_eq!(source.attempts(), 3);
        assert_eq!(adapter.mode(), TransportMode::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_that_breaks_after_opening_counts_as_failure() {
        let source = Arc::new(
            FakeSource::new(Attempt::Break(vec![]))
                .with_health("orders", PipelineStatus::Running),
        );
        let (adapter, mut updates) = TransportAdapter::spawn(
            source.clone(),
            TransportConfig::default(),
            ["orders".to_string()],
        );

        let update = timeout(Duration::from_secs(120), updates.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(update, status("orders", PipelineStatus::Running));
        assert_eq!(source.attempts(), 3);
        assert_eq!(adapter.mode(), TransportMode::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_event_resets_failure_budget() {
        let source = Arc::new(
            FakeSource::new(Attempt::Refuse)
                .scripted([
                    Attempt::Refuse,
                    Attempt::Refuse,
                    Attempt::Break(vec![update("orders", PipelineStatus::Running)]),
                ])
                .with_health("orders", PipelineStatus::Paused),
        );
        let (adapter, mut updates) = TransportAdapter::spawn(
            source.clone(),
            TransportConfig::default(),
            ["orders".to_string()],
        );

        let streamed = timeout(Duration::from_secs(30), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(streamed, status("orders", PipelineStatus::Running));

        let polled = timeout(Duration::from_secs(30), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(polled, status("orders", PipelineStatus::Paused));

        // Two refusals, the broken stream, then two more refusals.
        assert_eq!(source.attempts(), 5);
        assert_eq!(adapter.mode(), TransportMode::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_emits_only_changes_for_watched_ids() {
        let source = Arc::new(FakeSource::new(Attempt::Hold(vec![
            update("orders", PipelineStatus::Running),
            update("orders", PipelineStatus::Running),
            update("other", PipelineStatus::Failed),
            StatusStreamEvent::Error(StreamErrorPayload {
                pipeline_id: Some("orders".to_string()),
                code: 503,
                message: "backend unavailable".to_string(),
                timestamp: Utc::now(),
            }),
            update("orders", PipelineStatus::Pausing),
        ])));
        let (adapter, mut updates) =
            TransportAdapter::spawn(source, TransportConfig::default(), ["orders".to_string()]);

        let first = updates.recv().await.unwrap();
        let second = updates.recv().await.unwrap();

        assert_eq!(first, status("orders", PipelineStatus::Running));
        assert_eq!(second, status("orders", PipelineStatus::Pausing));
        assert!(timeout(Duration::from_secs(5), updates.recv()).await.is_err());
        assert_eq!(adapter.mode(), TransportMode::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn watching_during_streaming_reopens_with_new_set() {
        let source = Arc::new(FakeSource::new(Attempt::Hold(vec![])));
        let (adapter, _updates) =
            TransportAdapter::spawn(source.clone(), TransportConfig::default(), ["a".to_string()]);

        sleep(Duration::from_millis(10)).await;
        adapter.watch("b");
        sleep(Duration::from_millis(10)).await;

        assert_eq!(
            source.opened_with(),
            vec![
                vec!["a".to_string()],
                vec!["a".to_string(), "b".to_string()]
            ]
        );
        assert_eq!(adapter.mode(), TransportMode::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn unwatched_id_is_not_emitted_while_streaming() {
        let source = Arc::new(FakeSource::new(Attempt::Hold(vec![])).scripted([
            Attempt::Hold(vec![]),
            Attempt::Hold(vec![
                update("b", PipelineStatus::Running),
                update("a", PipelineStatus::Running),
            ]),
        ]));
        let (adapter, mut updates) = TransportAdapter::spawn(
            source.clone(),
            TransportConfig::default(),
            ["a".to_string(), "b".to_string()],
        );

        sleep(Duration::from_millis(10)).await;
        adapter.unwatch("b");

        let first = timeout(Duration::from_secs(5), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, status("a", PipelineStatus::Running));
        assert!(timeout(Duration::from_secs(5), updates.recv()).await.is_err());
        assert_eq!(source.opened_with()[1], vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_gives_up_after_retry_budget() {
        let source = Arc::new(FakeSource::new(Attempt::Refuse));
        let (adapter, mut updates) = TransportAdapter::spawn(
            source,
            TransportConfig::default(),
            ["missing".to_string()],
        );

        let update = timeout(Duration::from_secs(60), updates.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            update,
            TransportUpdate::Failed {
                pipeline_id: "missing".to_string(),
                error: ApiErrorBody::new(404, "not found"),
            }
        );

        // No more attempts for an exhausted id.
        assert!(timeout(Duration::from_secs(30), updates.recv()).await.is_err());

        adapter.unwatch("missing");
        adapter.watch("missing");
        let again = timeout(Duration::from_secs(60), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(again, TransportUpdate::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn watching_a_new_id_during_polling_picks_it_up() {
        let source = Arc::new(
            FakeSource::new(Attempt::Refuse)
                .with_health("orders", PipelineStatus::Running)
                .with_health("payments", PipelineStatus::Paused),
        );
        let (adapter, mut updates) = TransportAdapter::spawn(
            source,
            TransportConfig::default(),
            ["orders".to_string()],
        );

        timeout(Duration::from_secs(30), updates.recv())
            .await
            .unwrap()
            .unwrap();

        adapter.watch("payments");
        let update = timeout(Duration::from_secs(30), updates.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(update, status("payments", PipelineStatus::Paused));
    }
}
