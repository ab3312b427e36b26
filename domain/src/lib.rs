pub mod dtos;
pub mod lifecycle;

pub use lifecycle::{LifecycleAction, StatusValidationError};
