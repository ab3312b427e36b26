mod api_error;
mod connection;
mod dlq;
mod notification;
mod pipeline;
mod pipeline_health;
mod pipeline_status;
mod platform;
mod status_stream_event;
mod validation;

pub use api_error::*;
pub use connection::*;
pub use dlq::*;
pub use notification::*;
pub use pipeline::*;
pub use pipeline_health::*;
pub use pipeline_status::*;
pub use platform::*;
pub use status_stream_event::*;
pub use validation::*;
