pub mod clickhouse;
pub mod dlq;
pub mod events;
pub mod kafka;
pub mod notifications;
pub mod pipeline;
pub mod pipelines;
pub mod platform;
pub mod validation;
