use crate::client::{
    DailyInvocationStatistic, MicrocksClient, RequestResponsePair, Secret, TestRequest,
    TestResult, UnidirectionalEvent,
};
use crate::error::Result;
use crate::server::{env_or_insert, wait_for_message};
use crate::{Config, ContainerConfig, Server};
use chrono::{NaiveDate, Utc};
use derive_builder::Builder;
use dockertest::waitfor::MessageSource;
use dockertest::{PullPolicy, RunningContainer, Source, StartPolicy};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::info;

const IMAGE: &str = "quay.io/microcks/microcks-uber";
const LOG_MSG: &str = "Started MicrocksApplication";

/// HTTP port of Microcks inside the container.
pub const HTTP_PORT: u32 = 8080;
/// gRPC port of Microcks inside the container.
pub const GRPC_PORT: u32 = 9090;
/// Network alias other containers of an ensemble use to reach Microcks.
pub const DEFAULT_ALIAS: &str = "microcks";

/// Configuration for creating a Microcks server.
///
/// Microcks listens on port 8080 for HTTP requests (REST API, REST, SOAP and
/// GraphQL mocks) and on port 9090 for gRPC mocks. Both are exposed on the
/// host, the host ports being controlled by the `port` and `grpc_port`
/// fields.
///
/// Artifacts, snapshots and secrets listed in the configuration are loaded
/// into Microcks once the container is up and before the test body runs.
/// Local artifacts are uploaded, remote ones are fetched by Microcks itself.
///
/// See the [Microcks](https://microcks.io/documentation/) documentation for
/// more information on the environment variables that can be used to
/// configure the server.
#[derive(Clone, Default, Builder)]
#[builder(default)]
pub struct MicrocksServerConfig {
    #[builder(default = "String::from(DEFAULT_ALIAS)", setter(into))]
    pub alias: String,
    #[builder(default = "Vec::new()")]
    pub args: Vec<String>,
    pub debug: bool,
    #[builder(default = "HashMap::new()")]
    pub env: HashMap<String, String>,
    #[builder(default = "9090")]
    pub grpc_port: u32,
    #[builder(default = "self.default_handle()", setter(into))]
    pub handle: String,
    /// Full image reference, e.g. a mirror of the default image.
    #[builder(default = "String::from(IMAGE)", setter(into))]
    pub image: String,
    pub main_artifacts: Vec<PathBuf>,
    pub main_remote_artifacts: Vec<String>,
    #[builder(default = "8080")]
    pub port: u32,
    pub secondary_artifacts: Vec<PathBuf>,
    pub secondary_remote_artifacts: Vec<String>,
    pub secrets: Vec<Secret>,
    pub snapshots: Vec<PathBuf>,
    #[builder(default = "60")]
    pub timeout: u16,
    #[builder(default = "String::from(\"latest\")", setter(into))]
    pub version: String,
}

impl MicrocksServerConfigBuilder {
    fn default_handle(&self) -> String {
        crate::server::new_handle(self.image.as_deref().unwrap_or(IMAGE))
    }
}

impl MicrocksServerConfig {
    pub fn builder() -> MicrocksServerConfigBuilder {
        MicrocksServerConfigBuilder::default()
    }

    fn container_config(self) -> ContainerConfig {
        let ports = vec![(HTTP_PORT, self.port), (GRPC_PORT, self.grpc_port)];

        let mut env = self.env;
        if self.debug {
            env_or_insert(&mut env, "LOGGING_LEVEL_IO_GITHUB_MICROCKS", "DEBUG".into());
        }

        ContainerConfig {
            args: self.args,
            env,
            handle: self.handle,
            name: self.image,
            source: Source::DockerHub,
            pull_policy: PullPolicy::IfNotPresent,
            version: self.version,
            ports: Some(ports),
            wait: Some(wait_for_message(LOG_MSG, MessageSource::Stdout, self.timeout)),
            aliases: vec![self.alias],
            start_policy: StartPolicy::Strict,
        }
    }

    /// Loads snapshots, artifacts and secrets into a running Microcks.
    async fn seed(&self, client: &MicrocksClient) -> Result<()> {
        for snapshot in &self.snapshots {
            client.import_snapshot(snapshot).await?;
        }
        for artifact in &self.main_artifacts {
            client.upload_artifact(artifact, true).await?;
        }
        for artifact in &self.secondary_artifacts {
            client.upload_artifact(artifact, false).await?;
        }
        for url in &self.main_remote_artifacts {
            client.download_artifact(url, true).await?;
        }
        for url in &self.secondary_remote_artifacts {
            client.download_artifact(url, false).await?;
        }
        for secret in &self.secrets {
            client.create_secret(secret).await?;
        }
        Ok(())
    }
}

impl Config for MicrocksServerConfig {
    fn into_composition(self) -> dockertest::Composition {
        self.container_config().into()
    }

    fn handle(&self) -> &str {
        self.handle.as_str()
    }

    fn on_ready(&self, _container: &RunningContainer) -> BoxFuture<'static, Result<()>> {
        let config = self.clone();
        Box::pin(async move {
            let client = MicrocksClient::new(&format!("http://localhost:{}", config.port));
            config.seed(&client).await?;
            info!(handle = %config.handle, "microcks ready");
            Ok(())
        })
    }
}

/// A running instance of a Microcks server.
///
/// Mock endpoints are returned as seen from the local host. Other containers
/// of the ensemble reach Microcks through its network alias, see
/// `internal_http_endpoint`.
#[derive(Clone)]
pub struct MicrocksServer {
    pub alias: String,
    pub external_port: u32,
    pub grpc_external_port: u32,
    pub internal_port: u32,
    pub ip: String,
    client: MicrocksClient,
}

impl MicrocksServer {
    fn from_config(config: &MicrocksServerConfig, ip: String) -> Self {
        let endpoint = format!("http://localhost:{}", config.port);
        MicrocksServer {
            alias: config.alias.clone(),
            external_port: config.port,
            grpc_external_port: config.grpc_port,
            internal_port: HTTP_PORT,
            ip,
            client: MicrocksClient::new(&endpoint),
        }
    }

    /// The client bound to this server's REST API.
    pub fn client(&self) -> &MicrocksClient {
        &self.client
    }

    /// The HTTP endpoint of Microcks from the local host. Append `/api` to
    /// reach its REST API.
    pub fn http_endpoint(&self) -> String {
        format!("http://localhost:{}", self.external_port)
    }

    /// The HTTP endpoint of Microcks from the containers of its network.
    pub fn internal_http_endpoint(&self) -> String {
        format!("http://{}:{}", self.alias, self.internal_port)
    }

    pub fn soap_mock_endpoint(&self, service: &str, version: &str) -> String {
        format!("{}{}", self.http_endpoint(), self.soap_mock_endpoint_path(service, version))
    }

    pub fn soap_mock_endpoint_path(&self, service: &str, version: &str) -> String {
        format!("/soap/{}/{}", service, version)
    }

    /// SOAP mock endpoint which also validates incoming requests.
    pub fn validating_soap_mock_endpoint(&self, service: &str, version: &str) -> String {
        format!("{}?validate=true", self.soap_mock_endpoint(service, version))
    }

    pub fn rest_mock_endpoint(&self, service: &str, version: &str) -> String {
        format!("{}{}", self.http_endpoint(), self.rest_mock_endpoint_path(service, version))
    }

    pub fn rest_mock_endpoint_path(&self, service: &str, version: &str) -> String {
        format!("/rest/{}/{}", service, version)
    }

    /// REST mock endpoint which also validates incoming requests.
    pub fn validating_rest_mock_endpoint(&self, service: &str, version: &str) -> String {
        format!("{}/rest-valid/{}/{}", self.http_endpoint(), service, version)
    }

    pub fn graphql_mock_endpoint(&self, service: &str, version: &str) -> String {
        format!(
            "{}{}",
            self.http_endpoint(),
            self.graphql_mock_endpoint_path(service, version)
        )
    }

    pub fn graphql_mock_endpoint_path(&self, service: &str, version: &str) -> String {
        format!("/graphql/{}/{}", service, version)
    }

    /// The gRPC endpoint serving every gRPC mock.
    pub fn grpc_mock_endpoint(&self) -> String {
        format!("grpc://localhost:{}", self.grpc_external_port)
    }

    pub async fn import_as_main_artifact(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.client.upload_artifact(path.into(), true).await
    }

    pub async fn import_as_secondary_artifact(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.client.upload_artifact(path.into(), false).await
    }

    pub async fn download_as_main_artifact(&self, url: &str) -> Result<()> {
        self.client.download_artifact(url, true).await
    }

    pub async fn download_as_secondary_artifact(&self, url: &str) -> Result<()> {
        self.client.download_artifact(url, false).await
    }

    pub async fn import_snapshot(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.client.import_snapshot(path.into()).await
    }

    pub async fn create_secret(&self, secret: &Secret) -> Result<()> {
        self.client.create_secret(secret).await
    }

    /// Launches a conformance test and waits for its result, at most for the
    /// timeout of the request.
    pub async fn test_endpoint(&self, request: &TestRequest) -> Result<TestResult> {
        self.client.test_endpoint(request).await
    }

    /// Same as `test_endpoint`, but runs on a background task so the caller
    /// can exercise the tested endpoint (e.g. publish messages) meanwhile.
    pub fn test_endpoint_async(&self, request: TestRequest) -> JoinHandle<Result<TestResult>> {
        let client = self.client.clone();
        tokio::spawn(async move { client.test_endpoint(&request).await })
    }

    /// The request/response pairs recorded for `operation` during a test.
    pub async fn messages_for_test_case(
        &self,
        result: &TestResult,
        operation: &str,
    ) -> Result<Vec<RequestResponsePair>> {
        self.client.test_case_messages(result, operation).await
    }

    /// The async events recorded for `operation` during a test.
    pub async fn events_for_test_case(
        &self,
        result: &TestResult,
        operation: &str,
    ) -> Result<Vec<UnidirectionalEvent>> {
        self.client.test_case_events(result, operation).await
    }

    /// Whether the mocks of a service have been invoked today.
    pub async fn verify(&self, service: &str, version: &str) -> Result<bool> {
        Ok(self.service_invocations_count(service, version).await? > 0)
    }

    pub async fn verify_at(&self, service: &str, version: &str, day: NaiveDate) -> Result<bool> {
        Ok(self.service_invocations_count_at(service, version, day).await? > 0)
    }

    /// Number of invocations of the mocks of a service today.
    pub async fn service_invocations_count(&self, service: &str, version: &str) -> Result<u64> {
        self.service_invocations_count_at(service, version, Utc::now().date_naive())
            .await
    }

    pub async fn service_invocations_count_at(
        &self,
        service: &str,
        version: &str,
        day: NaiveDate,
    ) -> Result<u64> {
        let stats = self.service_invocations_at(service, version, day).await?;
        Ok(stats.map(|s| s.daily_count).unwrap_or(0))
    }

    pub async fn service_invocations_at(
        &self,
        service: &str,
        version: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyInvocationStatistic>> {
        let day = day.format("%Y%m%d").to_string();
        self.client.invocation_stats(service, version, &day).await
    }
}

impl Server for MicrocksServer {
    type Config = MicrocksServerConfig;

    fn new(config: &Self::Config, container: &RunningContainer) -> Self {
        MicrocksServer::from_config(config, container.ip().to_string())
    }
}
