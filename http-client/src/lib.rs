mod default_client;
mod error;
mod request;
mod transport;

pub use crate::default_client::ImgsafeHttpClient;
pub use crate::default_client::ImgsafeRequestBuilder;
pub use crate::default_client::build_reqwest_client;
pub use crate::default_client::redact_json;
pub use crate::default_client::redact_url;
pub use crate::error::TransportError;
pub use crate::request::JSON_UTF8;
pub use crate::request::Request;
pub use crate::request::RequestBody;
pub use crate::request::Response;
pub use crate::transport::HttpTransport;
pub use crate::transport::ReqwestTransport;
