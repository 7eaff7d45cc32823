use std::path::Path;

use isahc::config::CaCertificate;
use isahc::config::ClientCertificate;
use isahc::config::Configurable;
use isahc::config::PrivateKey;
use isahc::config::SslOption;
use isahc::HttpClient;
use isahc::HttpClientBuilder;
use tracing::debug;

use dw_config::ConfigError;
use dw_config::K8Config;
use dw_config::KubeConfig;
use dw_config::PodConfig;

use crate::ClientError;

/// Build isahc client and bearer token from k8 config
pub struct ClientConfigBuilder {
    config: K8Config,
    builder: HttpClientBuilder,
    token: Option<String>,
}

impl ClientConfigBuilder {
    pub fn new(config: K8Config) -> Result<Self, ClientError> {
        let builder = HttpClient::builder();
        let (builder, token) = match &config {
            K8Config::Pod(pod_config) => Self::configure_in_cluster(builder, pod_config),
            K8Config::KubeConfig(context) => {
                Self::configure_out_of_cluster(builder, &context.config)?
            }
        };

        Ok(Self {
            config,
            builder,
            token,
        })
    }

    pub fn k8_config(&self) -> &K8Config {
        &self.config
    }

    pub fn token(&self) -> Option<String> {
        self.token.clone()
    }

    pub fn host(&self) -> String {
        self.config.api_path().to_owned()
    }

    pub fn build(self) -> Result<HttpClient, ClientError> {
        Ok(self.builder.build()?)
    }

    fn configure_in_cluster(
        builder: HttpClientBuilder,
        pod: &PodConfig,
    ) -> (HttpClientBuilder, Option<String>) {
        debug!("configure as pod in cluster");
        let path = pod.ca_path();
        debug!(path = %path.display(), "loading ca");
        (load_ca_certificate(builder, path), Some(pod.token.clone()))
    }

    fn configure_out_of_cluster(
        builder: HttpClientBuilder,
        kube_config: &KubeConfig,
    ) -> Result<(HttpClientBuilder, Option<String>), ClientError> {
        let current_user = kube_config
            .current_user()
            .ok_or_else(|| invalid_config("config must have current user"))?;

        let current_cluster = kube_config
            .current_cluster()
            .ok_or_else(|| invalid_config("config must have current cluster"))?;

        let cluster = &current_cluster.cluster;
        let builder = if cluster.insecure_skip_tls_verify == Some(true) {
            debug!("skipping tls verification");
            builder.ssl_options(SslOption::DANGER_ACCEPT_INVALID_CERTS)
        } else if let Some(ca_path) = &cluster.certificate_authority {
            debug!(%ca_path, "loading cluster CA");
            load_ca_certificate(builder, ca_path)
        } else if cluster.certificate_authority_data.is_some() {
            return Err(invalid_config(
                "inline certificate-authority-data is not supported, use certificate-authority",
            ));
        } else {
            builder
        };

        let user = &current_user.user;
        if let Some(client_crt_path) = &user.client_certificate {
            let client_key_path = user
                .client_key
                .as_ref()
                .ok_or_else(|| invalid_config("current user must have client key"))?;
            debug!(%client_crt_path, %client_key_path, "loading client certificate");
            Ok((
                load_client_certificate(builder, client_crt_path, client_key_path),
                user.token.clone(),
            ))
        } else if let Some(token) = &user.token {
            Ok((builder, Some(token.clone())))
        } else {
            Err(invalid_config("no client certificate or token found"))
        }
    }
}

fn invalid_config(message: &str) -> ClientError {
    ClientError::Config(ConfigError::Other(message.to_owned()))
}

fn load_ca_certificate<P>(builder: HttpClientBuilder, ca_path: P) -> HttpClientBuilder
where
    P: AsRef<Path>,
{
    builder.ssl_ca_certificate(CaCertificate::file(ca_path.as_ref().to_owned()))
}

fn load_client_certificate<P>(
    builder: HttpClientBuilder,
    client_crt_path: P,
    client_key_path: P,
) -> HttpClientBuilder
where
    P: AsRef<Path>,
{
    builder.ssl_client_certificate(ClientCertificate::pem_file(
        client_crt_path.as_ref().to_owned(),
        PrivateKey::pem_file(client_key_path.as_ref().to_owned(), None::<String>),
    ))
}
