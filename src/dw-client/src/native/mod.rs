mod client;
mod config;
mod wstream;

pub use client::K8Client;
pub use config::ClientConfigBuilder;
pub use wstream::decode_watch_event;
pub use wstream::decode_watch_value;
pub use wstream::watch_lines;
