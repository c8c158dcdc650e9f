//! Client for the Cloud Vision `images:annotate` endpoint, restricted to
//! SafeSearch detection.

mod client;
mod error;
mod models;

pub use client::DEFAULT_BASE_URL;
pub use client::VisionClient;
pub use client::encode_image;
pub use error::VisionError;
pub use models::Likelihood;
pub use models::SafeSearchAnnotation;
