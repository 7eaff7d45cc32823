mod client;
mod error;
mod in_memory;
mod native;
mod retry;
pub mod uri;

pub use client::ListArg;
pub use client::MetadataClient;
pub use client::NameSpace;
pub use client::PatchMergeType;
pub use client::TokenStreamResult;
pub use error::classify;
pub use error::ClientError;
pub use error::ClusterError;
pub use in_memory::InMemoryClient;
pub use in_memory::Verb;
pub use native::*;
pub use retry::retryable_exec;
pub use retry::RetryPolicy;

pub use dw_config::K8Config;

pub mod http {
    pub use isahc::http::*;
}

pub type SharedClient<C> = std::sync::Arc<C>;
