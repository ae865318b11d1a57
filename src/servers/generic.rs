use crate::server::wait_for_message;
use crate::{Config, ContainerConfig, Server};
use derive_builder::Builder;
use dockertest::waitfor::MessageSource;
use dockertest::{PullPolicy, RunningContainer, Source, StartPolicy};
use std::collections::HashMap;


/// The output stream a readiness message is expected on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogStream {
    #[default]
    Stdout,
    Stderr,
}

impl From<LogStream> for MessageSource {
    fn from(stream: LogStream) -> Self {
        match stream {
            LogStream::Stdout => MessageSource::Stdout,
            LogStream::Stderr => MessageSource::Stderr,
        }
    }
}

/// Configuration for any companion container joining an ensemble: the
/// implementation under test, a message broker, an emulator...
///
/// Give it an `alias` so that Microcks and the minion can reach it by name,
/// e.g. `http://good-impl:3002` as the endpoint of a conformance test.
#[derive(Clone, Default, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct GenericServerConfig {
    #[builder(setter(into, strip_option))]
    pub alias: Option<String>,
    #[builder(default = "Vec::new()")]
    pub args: Vec<String>,
    #[builder(default = "HashMap::new()")]
    pub env: HashMap<String, String>,
    #[builder(default = "crate::server::new_handle(\"companion\")", setter(into))]
    pub handle: String,
    #[builder(setter(into))]
    pub image: String,
    /// `(container port, host port)` pairs to publish.
    #[builder(default = "Vec::new()")]
    pub ports: Vec<(u32, u32)>,
    #[builder(default = "30")]
    pub timeout: u16,
    #[builder(default = "String::from(\"latest\")", setter(into))]
    pub version: String,
    #[builder(setter(into, strip_option))]
    pub wait_message: Option<String>,
    pub wait_stream: LogStream,
}

impl GenericServerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.image {
            Some(image) if !image.is_empty() => Ok(()),
            _ => Err("an image is required".into()),
        }
    }
}

impl GenericServerConfig {
    pub fn builder() -> GenericServerConfigBuilder {
        GenericServerConfigBuilder::default()
    }

    fn container_config(self) -> ContainerConfig {
        let timeout = self.timeout;
        let stream = self.wait_stream;
        let wait = self
            .wait_message
            .map(|message| wait_for_message(&message, stream.into(), timeout));

        ContainerConfig {
            args: self.args,
            env: self.env,
            handle: self.handle,
            name: self.image,
            source: Source::DockerHub,
            pull_policy: PullPolicy::IfNotPresent,
            version: self.version,
            ports: if self.ports.is_empty() {
                None
            } else {
                Some(self.ports)
            },
            wait,
            aliases: self.alias.into_iter().collect(),
            start_policy: StartPolicy::Strict,
        }
    }
}

impl Config for GenericServerConfig {
    fn into_composition(self) -> dockertest::Composition {
        self.container_config().into()
    }

    fn handle(&self) -> &str {
        self.handle.as_str()
    }
}

/// A running companion container.
pub struct GenericServer {
    pub alias: Option<String>,
    pub ip: String,
    pub ports: Vec<(u32, u32)>,
}

impl GenericServer {
    /// The host port `port` of the container is published on.
    pub fn external_port(&self, port: u32) -> Option<u32> {
        self.ports
            .iter()
            .find(|(exported, _)| *exported == port)
            .map(|(_, host)| *host)
    }

    /// The `host:port` other containers of the network use to reach `port`.
    pub fn internal_address(&self, port: u32) -> String {
        let host = self.alias.as_deref().unwrap_or(self.ip.as_str());
        format!("{}:{}", host, port)
    }
}

impl Server for GenericServer {
    type Config = GenericServerConfig;

    fn new(config: &Self::Config, container: &RunningContainer) -> Self {
        GenericServer {
            alias: config.alias.clone(),
            ip: container.ip().to_string(),
            ports: config.ports.clone(),
        }
    }
}
