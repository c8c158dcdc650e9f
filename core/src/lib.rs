//! The imgsafe moderation engine.
//!
//! One poll cycle walks the hosting service's change feed from the persisted
//! cursor, classifies each eligible image under the monthly quota, flags the
//! ones that score at or above the configured threshold and checkpoints
//! progress after every file.

pub mod action;
pub mod config;
mod error;
pub mod evaluate;
pub mod feed;
mod path_utils;
pub mod quota;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod webhook;

pub use error::ConfigError;
pub use error::CycleError;
pub use error::ServiceError;
pub use path_utils::write_atomically;

#[cfg(test)]
pub(crate) mod test_support;
