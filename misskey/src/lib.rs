//! Typed client for the subset of the Misskey HTTP API imgsafe relies on:
//! listing newly uploaded drive files as an administrator, reading a file's
//! detail, toggling its sensitive flag, and probing instance metadata.

mod client;
mod error;
mod instance;
mod models;

pub use client::MisskeyClient;
pub use error::MisskeyError;
pub use instance::Instance;
pub use models::DriveFile;
pub use models::FileOrigin;
pub use models::Meta;
