use futures_util::stream::StreamExt;
use tracing::debug;
use tracing::error;
use tracing::instrument;

use dw_client::MetadataClient;
use dw_client::SharedClient;
use dw_types::devworkspace::DevWorkspaceSpec;
use dw_types::event::EventSpec;

use crate::LifecycleError;
use crate::PushMessage;
use crate::StoreHandle;

/// feeds watch events of a namespace into the store
pub struct WorkspaceWatcher<C> {
    client: SharedClient<C>,
    store: StoreHandle,
    namespace: String,
}

impl<C> WorkspaceWatcher<C>
where
    C: MetadataClient + 'static,
{
    pub fn new(client: SharedClient<C>, store: StoreHandle, namespace: impl Into<String>) -> Self {
        Self {
            client,
            store,
            namespace: namespace.into(),
        }
    }

    /// pump DevWorkspace events until the watch ends
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn run(&self) -> Result<(), LifecycleError> {
        let mut stream = self
            .client
            .watch_stream_now::<DevWorkspaceSpec>(self.namespace.clone());

        while let Some(chunk) = stream.next().await {
            for event in chunk? {
                match event {
                    Ok(event) => self.store.dispatch(PushMessage::DevWorkspace(event))?,
                    Err(err) => error!(%err, "skipping devworkspace watch event"),
                }
            }
        }
        debug!("devworkspace watch ended");
        Ok(())
    }

    /// pump core events of the namespace until the watch ends
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn run_events(&self) -> Result<(), LifecycleError> {
        let mut stream = self
            .client
            .watch_stream_now::<EventSpec>(self.namespace.clone());

        while let Some(chunk) = stream.next().await {
            for event in chunk? {
                match event {
                    Ok(event) => self.store.dispatch(PushMessage::Event(event))?,
                    Err(err) => error!(%err, "skipping event watch event"),
                }
            }
        }
        debug!("event watch ended");
        Ok(())
    }
}
