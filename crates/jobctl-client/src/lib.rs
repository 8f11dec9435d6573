mod client;
pub use client::JobClient;

mod config;
pub use config::{ClientConfig, Routes};

mod errors;
pub use errors::{ClientError, ConfigError, TransportError};

mod http;
pub use http::HttpJobClient;

mod wire;
