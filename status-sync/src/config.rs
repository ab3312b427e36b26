use std::time::Duration;

/// How the transport adapter talks to the console.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Consecutive failed stream attempts before switching to polling
    pub max_stream_failures: u32,
    /// Pause between two stream attempts
    pub reconnect_delay: Duration,
    /// Health polling period once in polling mode
    pub poll_interval: Duration,
    /// Consecutive failed health checks before an id is given up on
    pub max_poll_failures: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_stream_failures: 3,
            reconnect_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            max_poll_failures: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub transport: TransportConfig,
    /// Optimistic overrides older than this are dropped. `None` keeps them
    /// until the backend confirms a status.
    pub optimistic_ttl: Option<Duration>,
}

impl SyncConfig {
    pub fn with_max_stream_failures(mut self, attempts: u32) -> Self {
        self.transport.max_stream_failures = attempts;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.transport.reconnect_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.transport.poll_interval = interval;
        self
    }

    pub fn with_max_poll_failures(mut self, attempts: u32) -> Self {
        self.transport.max_poll_failures = attempts;
        self
    }

    pub fn with_optimistic_ttl(mut self, ttl: Duration) -> Self {
        self.optimistic_ttl = Some(ttl);
        self
    }
}
