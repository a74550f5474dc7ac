pub mod config;
mod error;
mod http_layers;
mod media;
pub mod server;
mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use http_layers::*;
pub use media::AUDIO_EXTENSION_ALLOWLIST;
pub use server::{make_app, run_server};
