//! Chat-completion transport layer for PPAgent.
//!
//! # Architecture
//!
//! - [`traits::ChatTransport`]: the single seam between the agent loop and a model backend
//! - [`http_provider::HttpTransport`]: OpenAI-compatible `/chat/completions` client

pub mod http_provider;
pub mod traits;

pub use http_provider::HttpTransport;
pub use traits::ChatTransport;
