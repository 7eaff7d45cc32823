use std::fmt::Display;

use async_trait::async_trait;
use futures_util::future::ready;
use futures_util::future::FutureExt;
use futures_util::stream::once;
use futures_util::stream::BoxStream;
use futures_util::stream::StreamExt;
use serde_json::Value;
use tracing::debug;

use dw_types::options::DeleteOptions;
use dw_types::DeleteStatus;
use dw_types::InputK8Obj;
use dw_types::K8List;
use dw_types::K8Meta;
use dw_types::K8Obj;
use dw_types::K8Watch;
use dw_types::Spec;

use crate::ClientError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameSpace {
    All,
    Named(String),
}

impl NameSpace {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn named(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Named(name) => name,
        }
    }
}

impl From<String> for NameSpace {
    fn from(namespace: String) -> Self {
        NameSpace::Named(namespace)
    }
}

impl From<&str> for NameSpace {
    fn from(namespace: &str) -> Self {
        NameSpace::Named(namespace.to_owned())
    }
}

#[derive(Default, Clone, Debug)]
pub struct ListArg {
    pub field_selector: Option<String>,
    pub label_selector: Option<String>,
}

/// content type of a patch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMergeType {
    Json,
    JsonMerge,
    StrategicMerge,
}

impl PatchMergeType {
    pub fn content_type(&self) -> &'static str {
        match self {
            PatchMergeType::Json => "application/json-patch+json",
            PatchMergeType::JsonMerge => "application/merge-patch+json",
            PatchMergeType::StrategicMerge => "application/strategic-merge-patch+json",
        }
    }
}

pub type TokenStreamResult<S> = Result<Vec<Result<K8Watch<S>, ClientError>>, ClientError>;

#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// retrieval a single item
    async fn retrieve_item<S, M>(&self, metadata: &M) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync;

    /// retrieve all items a single chunk
    async fn retrieve_items<S, N>(&self, namespace: N) -> Result<K8List<S>, ClientError>
    where
        S: Spec,
        N: Into<NameSpace> + Send + Sync,
    {
        self.retrieve_items_with_option(namespace, None).await
    }

    async fn retrieve_items_with_option<S, N>(
        &self,
        namespace: N,
        option: Option<ListArg>,
    ) -> Result<K8List<S>, ClientError>
    where
        S: Spec,
        N: Into<NameSpace> + Send + Sync;

    async fn delete_item_with_option<S, M>(
        &self,
        metadata: &M,
        option: Option<DeleteOptions>,
    ) -> Result<DeleteStatus<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync;

    async fn delete_item<S, M>(&self, metadata: &M) -> Result<DeleteStatus<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        self.delete_item_with_option::<S, M>(metadata, None).await
    }

    /// create new object
    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec;

    /// patch existing object, `patch` must match `merge_type`
    async fn patch<S, M>(
        &self,
        metadata: &M,
        patch: &Value,
        merge_type: PatchMergeType,
    ) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Display + Send + Sync;

    /// stream items since resource versions
    fn watch_stream_since<S, N>(
        &self,
        namespace: N,
        resource_version: Option<String>,
    ) -> BoxStream<'_, TokenStreamResult<S>>
    where
        S: Spec + 'static,
        N: Into<NameSpace>;

    /// current items as ADDED events followed by changes after them
    fn watch_stream_now<S>(&self, ns: String) -> BoxStream<'_, TokenStreamResult<S>>
    where
        S: Spec + 'static,
    {
        let ft_stream = async move {
            let namespace = ns.as_str();
            match self.retrieve_items_with_option(namespace, None).await {
                Ok(item_now_list) => {
                    let resource_version = item_now_list.metadata.resource_version;

                    let items_watch_stream =
                        self.watch_stream_since(namespace, Some(resource_version));

                    let items_list = item_now_list
                        .items
                        .into_iter()
                        .map(|item| Ok(K8Watch::ADDED(item)))
                        .collect();
                    let list_stream = once(ready(Ok(items_list)));

                    list_stream.chain(items_watch_stream).left_stream()
                }
                Err(err) => once(ready(Err(err))).right_stream(),
            }
        };

        ft_stream.flatten_stream().boxed()
    }

    /// Check if the object exists, return true or false.
    async fn exists<S, M>(&self, metadata: &M) -> Result<bool, ClientError>
    where
        S: Spec,
        M: K8Meta + Display + Send + Sync,
    {
        debug!("check if '{}' exists", metadata);
        match self.retrieve_item::<S, M>(metadata).await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// verify the current credentials are accepted by the api server
    async fn sanity_check(&self, namespace: &str) -> Result<(), ClientError>;
}

#[cfg(test)]
mod test {

    use super::PatchMergeType;

    #[test]
    fn test_merge_type_content_type() {
        assert_eq!(
            PatchMergeType::Json.content_type(),
            "application/json-patch+json"
        );
        assert_eq!(
            PatchMergeType::JsonMerge.content_type(),
            "application/merge-patch+json"
        );
        assert_eq!(
            PatchMergeType::StrategicMerge.content_type(),
            "application/strategic-merge-patch+json"
        );
    }
}
