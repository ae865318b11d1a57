/// Contains the traits and types shared by every container of an ensemble.
use crate::common::rand_string;
use crate::error::Result;
use dockertest::waitfor::{MessageSource, MessageWait, WaitFor};
use dockertest::{Composition, Image, PullPolicy, RunningContainer, Source, StartPolicy};
use futures::future::BoxFuture;
use std::collections::HashMap;

/// Describes how to bring up a single container.
///
/// A [Config] is registered with a [Test][crate::Test] which converts it into
/// a [Composition] when the test is run. Once every registered container is
/// up, the test calls `on_ready` for each [Config] in registration order, which
/// gives a container a chance to seed itself (import artifacts, create
/// secrets...) before the test body runs.
pub trait Config: Clone + Send + Sync + 'static {
    /// Consumes this configuration into the [Composition] used by dockertest.
    fn into_composition(self) -> Composition;

    /// The unique handle of the container within a test.
    fn handle(&self) -> &str;

    /// Post-start hook, executed after all containers of the test are up.
    fn on_ready(&self, _container: &RunningContainer) -> BoxFuture<'static, Result<()>> {
        Box::pin(futures::future::ok(()))
    }
}

/// A running instance of a container described by a [Config].
pub trait Server {
    type Config: Config;

    fn new(config: &Self::Config, container: &RunningContainer) -> Self;
}

/// The generic set of options used to build a [Composition].
pub struct ContainerConfig {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub handle: String,
    pub name: String,
    pub source: Source,
    pub pull_policy: PullPolicy,
    pub version: String,
    pub ports: Option<Vec<(u32, u32)>>,
    pub wait: Option<Box<dyn WaitFor>>,
    pub aliases: Vec<String>,
    pub start_policy: StartPolicy,
}

impl From<ContainerConfig> for Composition {
    fn from(config: ContainerConfig) -> Composition {
        let image = Image::with_repository(&config.name)
            .source(config.source)
            .pull_policy(config.pull_policy)
            .tag(&config.version);

        let mut composition = Composition::with_image(image)
            .with_container_name(config.handle)
            .with_cmd(config.args)
            .with_env(config.env)
            .with_start_policy(config.start_policy);

        if let Some(wait) = config.wait {
            composition = composition.with_wait_for(wait);
        }

        if let Some(ports) = config.ports {
            for (exported, host) in ports {
                composition.port_map(exported, host);
            }
        }

        for alias in config.aliases {
            composition.alias(alias);
        }

        composition
    }
}

/// Generates a unique handle from the given image name.
///
/// The registry and organization parts of the image are dropped so that
/// `quay.io/microcks/microcks-uber` yields `microcks-uber-<random>`.
pub fn new_handle(image: &str) -> String {
    let name = image.rsplit('/').next().unwrap_or(image);
    format!("{}-{}", name, rand_string(8))
}

/// Waits for `message` to show up on the given stream of the container.
pub fn wait_for_message(message: &str, source: MessageSource, timeout: u16) -> Box<dyn WaitFor> {
    Box::new(MessageWait {
        message: message.into(),
        source,
        timeout,
    })
}

/// Inserts `default` under `key` unless the user already set that variable.
pub(crate) fn env_or_insert(env: &mut HashMap<String, String>, key: &str, default: String) {
    env.entry(key.to_string()).or_insert(default);
}
