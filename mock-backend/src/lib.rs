pub mod error;
pub mod expression;
pub mod fixtures;
pub mod server;
pub mod service;
pub mod simulator;
pub mod store;

pub use error::MockError;
pub use service::MockPipelineService;
pub use simulator::{LifecycleSimulator, TransitionDelays};
