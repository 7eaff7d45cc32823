mod adapter;
mod error;
mod lifecycle;
mod message;
mod restart;
mod status;
pub mod store;
mod watcher;

pub use adapter::Workspace;
pub use error::LifecycleError;
pub use lifecycle::WorkspaceLifecycle;
pub use message::PushMessage;
pub use restart::RestartOperation;
pub use restart::RestartState;
pub use status::WorkspaceStatus;
pub use store::StatusChange;
pub use store::StoreCommand;
pub use store::StoreHandle;
pub use store::StoreRunner;
pub use store::WorkspaceStore;
pub use watcher::WorkspaceWatcher;
