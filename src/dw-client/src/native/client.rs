use std::fmt::Display;

use async_trait::async_trait;
use futures_util::future::ready;
use futures_util::future::FutureExt;
use futures_util::stream::once;
use futures_util::stream::BoxStream;
use futures_util::stream::StreamExt;
use isahc::AsyncBody;
use isahc::AsyncReadResponseExt;
use isahc::HttpClient;
use isahc::Request;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use tracing::error;
use tracing::instrument;
use tracing::trace;

use dw_config::K8Config;
use dw_types::devworkspace::DevWorkspaceSpec;
use dw_types::options::DeleteOptions;
use dw_types::options::ListOptions;
use dw_types::DeleteStatus;
use dw_types::InputK8Obj;
use dw_types::K8List;
use dw_types::K8Meta;
use dw_types::K8Obj;
use dw_types::MetaStatus;
use dw_types::Spec;

use crate::http::header::HeaderValue;
use crate::http::header::ACCEPT;
use crate::http::header::AUTHORIZATION;
use crate::http::header::CONTENT_TYPE;
use crate::http::Uri;
use crate::uri::item_uri;
use crate::uri::items_uri;
use crate::ClientError;
use crate::ListArg;
use crate::MetadataClient;
use crate::NameSpace;
use crate::PatchMergeType;
use crate::TokenStreamResult;

use super::config::ClientConfigBuilder;
use super::wstream::watch_lines;

const WATCH_TIMEOUT_SECONDS: u32 = 3600;

/// K8 Cluster accessible thru API
pub struct K8Client {
    client: HttpClient,
    host: String,
    token: Option<String>,
}

impl std::fmt::Debug for K8Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K8Client")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl K8Client {
    /// load using default k8 config
    pub fn try_default() -> Result<Self, ClientError> {
        let config = K8Config::load()?;
        Self::new(config)
    }

    pub fn new(config: K8Config) -> Result<Self, ClientError> {
        let helper = ClientConfigBuilder::new(config)?;
        let host = helper.host();
        let token = helper.token();
        let client = helper.build()?;
        debug!(%host, has_token = token.is_some(), "k8 client created");
        Ok(Self {
            client,
            host,
            token,
        })
    }

    fn hostname(&self) -> &str {
        &self.host
    }

    fn finish_request<B>(&self, request: &mut Request<B>) -> Result<(), ClientError> {
        if let Some(ref token) = self.token {
            let full_token = format!("Bearer {token}");
            request
                .headers_mut()
                .insert(AUTHORIZATION, HeaderValue::from_str(&full_token)?);
        }
        Ok(())
    }

    /// send request, decode success body as `T` and failures as api server status
    async fn handle_request<T>(&self, mut request: Request<AsyncBody>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.finish_request(&mut request)?;
        trace!("request url: {}", request.uri());

        let mut resp = self.client.send_async(request).await?;
        let status = resp.status();
        let buffer = resp.bytes().await?;

        if status.is_success() {
            trace!(%status, "success response: {}", String::from_utf8_lossy(&buffer));
            serde_json::from_slice(&buffer).map_err(|err| {
                error!("json error: {}", err);
                error!("source: {}", String::from_utf8_lossy(&buffer));
                err.into()
            })
        } else {
            debug!(%status, "error response received");
            match serde_json::from_slice::<MetaStatus>(&buffer) {
                Ok(api_status) if api_status.code.is_some() => Err(api_status.into()),
                _ => {
                    error!("unexpected error body: {}", String::from_utf8_lossy(&buffer));
                    Err(ClientError::Client(status))
                }
            }
        }
    }

    /// open a watch connection and decode its lines
    fn stream<S>(&self, uri: Uri) -> impl futures_util::stream::Stream<Item = TokenStreamResult<S>> + '_
    where
        S: Spec + 'static,
    {
        debug!("streaming: {}", uri);

        let ft = async move {
            let request = Request::get(uri)
                .body(AsyncBody::empty())
                .map_err(ClientError::from)
                .and_then(|mut req| {
                    self.finish_request(&mut req)?;
                    Ok(req)
                });

            let request = match request {
                Ok(req) => req,
                Err(err) => {
                    error!("error building request: {}", err);
                    return once(ready(Err(err))).right_stream();
                }
            };

            match self.client.send_async(request).await {
                Ok(response) if response.status().is_success() => {
                    trace!("res status: {}", response.status());
                    watch_lines::<_, S>(response.into_body()).left_stream()
                }
                Ok(response) => {
                    error!(status = %response.status(), "watch rejected");
                    once(ready(Err(ClientError::Client(response.status())))).right_stream()
                }
                Err(err) => {
                    error!("error getting streaming: {}", err);
                    once(ready(Err(err.into()))).right_stream()
                }
            }
        };

        ft.flatten_stream()
    }

    pub async fn retrieve_items_inner<S, N>(
        &self,
        namespace: N,
        options: Option<ListOptions>,
    ) -> Result<K8List<S>, ClientError>
    where
        S: Spec,
        N: Into<NameSpace> + Send + Sync,
    {
        let uri = items_uri::<S>(self.hostname(), namespace.into(), options)?;
        debug!("{}: retrieving items: {}", S::label(), uri);
        let items = self
            .handle_request(Request::get(uri).body(AsyncBody::empty())?)
            .await?;
        trace!("items retrieved: {:#?}", items);
        Ok(items)
    }
}

#[async_trait]
impl MetadataClient for K8Client {
    /// retrieval a single item
    async fn retrieve_item<S, M>(&self, metadata: &M) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        let uri = item_uri::<S>(self.hostname(), metadata.name(), metadata.namespace(), None)?;
        debug!("{}: retrieving item: {}", S::label(), uri);

        self.handle_request(Request::get(uri).body(AsyncBody::empty())?)
            .await
    }

    async fn retrieve_items_with_option<S, N>(
        &self,
        namespace: N,
        option: Option<ListArg>,
    ) -> Result<K8List<S>, ClientError>
    where
        S: Spec,
        N: Into<NameSpace> + Send + Sync,
    {
        let list_option = option.map(|opt| ListOptions {
            field_selector: opt.field_selector,
            label_selector: opt.label_selector,
            ..Default::default()
        });
        self.retrieve_items_inner(namespace, list_option).await
    }

    #[instrument(
        skip(self, metadata, option),
        fields(spec = S::label(), name = metadata.name(), namespace = metadata.namespace())
    )]
    async fn delete_item_with_option<S, M>(
        &self,
        metadata: &M,
        option: Option<DeleteOptions>,
    ) -> Result<DeleteStatus<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        let uri = item_uri::<S>(self.hostname(), metadata.name(), metadata.namespace(), None)?;
        debug!("{}: delete item on url: {}", S::label(), uri);

        let body = match option {
            Some(option_value) => {
                let bytes = serde_json::to_vec(&option_value)?;
                trace!("delete raw : {}", String::from_utf8_lossy(&bytes));
                AsyncBody::from(bytes)
            }
            None => AsyncBody::empty(),
        };
        let request = Request::delete(uri)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)?;

        // a Status body means the object is gone, otherwise the object is returned while finalizing
        let values: serde_json::Map<String, Value> = self.handle_request(request).await?;
        if values.get("kind").and_then(Value::as_str) == Some("Status") {
            let status: MetaStatus = serde_json::from_value(Value::Object(values))?;
            Ok(DeleteStatus::Deleted(status))
        } else {
            let obj: K8Obj<S> = serde_json::from_value(Value::Object(values))?;
            Ok(DeleteStatus::ForegroundDelete(obj))
        }
    }

    /// create new object
    #[instrument(
        skip(self, value),
        fields(spec = S::label(), name = &*value.metadata.name, namespace = &*value.metadata.namespace)
    )]
    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
    {
        let namespace: NameSpace = value.metadata.namespace.clone().into();
        let uri = items_uri::<S>(self.hostname(), namespace, None)?;
        debug!("creating '{}'", uri);

        let bytes = serde_json::to_vec(&value)?;
        trace!("create raw: {}", String::from_utf8_lossy(&bytes));

        let request = Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(AsyncBody::from(bytes))?;

        self.handle_request(request).await
    }

    /// patch existing object
    #[instrument(
        skip(self, metadata, patch),
        fields(spec = S::label(), name = metadata.name(), namespace = metadata.namespace())
    )]
    async fn patch<S, M>(
        &self,
        metadata: &M,
        patch: &Value,
        merge_type: PatchMergeType,
    ) -> Result<K8Obj<S>, ClientError>
    where
        S: Spec,
        M: K8Meta + Display + Send + Sync,
    {
        debug!(%metadata, ?merge_type, "patching");
        trace!("patch json value: {:#?}", patch);
        let uri = item_uri::<S>(self.hostname(), metadata.name(), metadata.namespace(), None)?;

        let bytes = serde_json::to_vec(&patch)?;
        trace!("patch uri: {}, raw: {}", uri, String::from_utf8_lossy(&bytes));

        let request = Request::patch(uri)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, merge_type.content_type())
            .body(AsyncBody::from(bytes))?;

        self.handle_request(request).await
    }

    /// stream items since resource versions
    fn watch_stream_since<S, N>(
        &self,
        namespace: N,
        resource_version: Option<String>,
    ) -> BoxStream<'_, TokenStreamResult<S>>
    where
        S: Spec + 'static,
        N: Into<NameSpace>,
    {
        let opt = ListOptions {
            watch: Some(true),
            resource_version,
            timeout_seconds: Some(WATCH_TIMEOUT_SECONDS),
            ..Default::default()
        };
        match items_uri::<S>(self.hostname(), namespace.into(), Some(opt)) {
            Ok(uri) => self.stream(uri).boxed(),
            Err(err) => once(ready(Err(err))).boxed(),
        }
    }

    /// list one DevWorkspace to prove the credentials may read the namespace
    async fn sanity_check(&self, namespace: &str) -> Result<(), ClientError> {
        let options = ListOptions {
            limit: Some(1),
            ..Default::default()
        };
        self.retrieve_items_inner::<DevWorkspaceSpec, _>(namespace, Some(options))
            .await
            .map(|_| ())
    }
}
