use crate::server::wait_for_message;
use crate::{Config, ContainerConfig, Server};
use derive_builder::Builder;
use dockertest::waitfor::MessageSource;
use dockertest::{PullPolicy, RunningContainer, Source, StartPolicy};
use std::collections::HashMap;

const IMAGE: &str = "quay.io/microcks/microcks-postman-runtime";
const LOG_MSG: &str = "postman-runtime wrapper listening on port: 3000";

/// HTTP port of the Postman runtime inside the container.
pub const PORT: u32 = 3000;
/// Network alias Microcks uses to reach the Postman runtime.
pub const DEFAULT_ALIAS: &str = "postman";

/// Configuration for creating a Microcks Postman runtime.
///
/// The runtime executes Postman collections on behalf of Microcks when a test
/// uses the `POSTMAN` runner. Only Microcks talks to it, so its port is not
/// published on the host unless `port` is set.
#[derive(Clone, Default, Builder)]
#[builder(default)]
pub struct PostmanServerConfig {
    #[builder(default = "String::from(DEFAULT_ALIAS)", setter(into))]
    pub alias: String,
    #[builder(default = "Vec::new()")]
    pub args: Vec<String>,
    #[builder(default = "HashMap::new()")]
    pub env: HashMap<String, String>,
    #[builder(default = "self.default_handle()", setter(into))]
    pub handle: String,
    /// Full image reference, e.g. a mirror of the default image.
    #[builder(default = "String::from(IMAGE)", setter(into))]
    pub image: String,
    #[builder(setter(strip_option))]
    pub port: Option<u32>,
    #[builder(default = "30")]
    pub timeout: u16,
    #[builder(default = "String::from(\"latest\")", setter(into))]
    pub version: String,
}

impl PostmanServerConfigBuilder {
    fn default_handle(&self) -> String {
        crate::server::new_handle(self.image.as_deref().unwrap_or(IMAGE))
    }
}

impl PostmanServerConfig {
    pub fn builder() -> PostmanServerConfigBuilder {
        PostmanServerConfigBuilder::default()
    }

    fn container_config(self) -> ContainerConfig {
        ContainerConfig {
            args: self.args,
            env: self.env,
            handle: self.handle,
            name: self.image,
            source: Source::DockerHub,
            pull_policy: PullPolicy::IfNotPresent,
            version: self.version,
            ports: self.port.map(|port| vec![(PORT, port)]),
            wait: Some(wait_for_message(LOG_MSG, MessageSource::Stdout, self.timeout)),
            aliases: vec![self.alias],
            start_policy: StartPolicy::Strict,
        }
    }
}

impl Config for PostmanServerConfig {
    fn into_composition(self) -> dockertest::Composition {
        self.container_config().into()
    }

    fn handle(&self) -> &str {
        self.handle.as_str()
    }
}

/// A running instance of a Postman runtime.
pub struct PostmanServer {
    pub alias: String,
    pub external_port: Option<u32>,
    pub internal_port: u32,
    pub ip: String,
}

impl PostmanServer {
    /// The URL Microcks uses to reach the runtime.
    pub fn internal_url(&self) -> String {
        format!("http://{}:{}", self.alias, self.internal_port)
    }

    /// The URL of the runtime from the local host, if its port is published.
    pub fn external_url(&self) -> Option<String> {
        self.external_port
            .map(|port| format!("http://localhost:{}", port))
    }
}

impl Server for PostmanServer {
    type Config = PostmanServerConfig;

    fn new(config: &Self::Config, container: &RunningContainer) -> Self {
        PostmanServer {
            alias: config.alias.clone(),
            external_port: config.port,
            internal_port: PORT,
            ip: container.ip().to_string(),
        }
    }
}
