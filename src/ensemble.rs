/// Contains the ensemble wiring Microcks with its optional companions.
use crate::server::env_or_insert;
use crate::servers::microcks::{self, MicrocksServer, MicrocksServerConfig};
use crate::servers::minion::{self, AsyncMinionServer, AsyncMinionServerConfig};
use crate::servers::postman::{self, PostmanServer, PostmanServerConfig};
use crate::{Config, Server, Test, TestInstance};
use futures::Future;
use tracing::debug;

type Registration = Box<dyn FnOnce(&mut Test) + Send>;

/// A Microcks server together with an optional Postman runtime, an optional
/// async minion and any number of companion containers, all on one network.
///
/// The ensemble takes care of the wiring between its members: Microcks is
/// told where to find the Postman runtime and the minion, and the minion
/// where to find Microcks, using the network alias of each member.
///
/// Companions registered with `register` are started first so that brokers
/// are available when the minion connects to them. Microcks, the Postman
/// runtime and the minion are then started one after the other.
pub struct MicrocksEnsemble {
    microcks: MicrocksServerConfig,
    postman: Option<PostmanServerConfig>,
    async_minion: Option<AsyncMinionServerConfig>,
    companions: Vec<Registration>,
    network: Option<String>,
    debug: bool,
}

impl MicrocksEnsemble {
    /// Creates an ensemble made of a single Microcks server.
    pub fn new(microcks: MicrocksServerConfig) -> Self {
        MicrocksEnsemble {
            microcks,
            postman: None,
            async_minion: None,
            companions: Vec::new(),
            network: None,
            debug: false,
        }
    }

    /// Adds a Postman runtime, required by tests using the `POSTMAN` runner.
    pub fn with_postman(mut self, config: PostmanServerConfig) -> Self {
        self.postman = Some(config);
        self
    }

    /// Adds an async minion, required to mock and test AsyncAPI operations.
    pub fn with_async_minion(mut self, config: AsyncMinionServerConfig) -> Self {
        self.async_minion = Some(config);
        self
    }

    /// Turns on debug logs of Microcks and of the minion.
    pub fn with_debug_log_level(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Attaches the ensemble to an existing Docker network instead of a fresh
    /// one, e.g. to reach a broker started outside of the ensemble.
    pub fn with_network(mut self, name: impl Into<String>) -> Self {
        self.network = Some(name.into());
        self
    }

    /// Adds a companion container to the ensemble.
    pub fn register(&mut self, config: impl Config) {
        self.companions
            .push(Box::new(move |test: &mut Test| test.register(config)));
    }

    /// Returns the Microcks configuration with the ensemble wiring applied.
    fn wired_microcks(&self) -> MicrocksServerConfig {
        let mut config = self.microcks.clone();
        let postman_alias = self
            .postman
            .as_ref()
            .map_or(postman::DEFAULT_ALIAS, |p| p.alias.as_str());
        let minion_alias = self
            .async_minion
            .as_ref()
            .map_or(minion::DEFAULT_ALIAS, |m| m.alias.as_str());

        let callback = format!("http://{}:{}", config.alias, microcks::HTTP_PORT);
        env_or_insert(&mut config.env, "TEST_CALLBACK_URL", callback);
        env_or_insert(
            &mut config.env,
            "POSTMAN_RUNNER_URL",
            format!("http://{}:{}", postman_alias, postman::PORT),
        );
        env_or_insert(
            &mut config.env,
            "ASYNC_MINION_URL",
            format!("http://{}:{}", minion_alias, minion::PORT),
        );
        config.debug |= self.debug;
        config
    }

    /// Returns the minion configuration pointed at the ensemble's Microcks.
    fn wired_async_minion(&self) -> Option<AsyncMinionServerConfig> {
        self.async_minion.clone().map(|mut config| {
            config.microcks_host_port = format!("{}:{}", self.microcks.alias, microcks::HTTP_PORT);
            config.debug |= self.debug;
            config
        })
    }

    /// Builds the [Test] bringing up the ensemble.
    ///
    /// Further containers may still be registered on the returned [Test].
    pub fn into_test(self) -> Test {
        let microcks = self.wired_microcks();
        let async_minion = self.wired_async_minion();

        let mut test = match self.network {
            Some(name) => Test::new().with_external_network(name),
            None => Test::new(),
        };

        for registration in self.companions {
            registration(&mut test);
        }

        debug!(
            postman = self.postman.is_some(),
            async_minion = async_minion.is_some(),
            "registering microcks ensemble"
        );
        test.register(microcks);
        if let Some(postman) = self.postman {
            test.register(postman);
        }
        if let Some(async_minion) = async_minion {
            test.register(async_minion);
        }
        test
    }

    /// Brings up the ensemble, loads the configured artifacts into Microcks
    /// and runs the given test body.
    ///
    /// The containers are destroyed once the body returns or panics.
    pub fn run<T, F>(self, fun: T)
    where
        T: FnOnce(EnsembleInstance) -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        self.into_test()
            .run(|instance| async move { (fun)(EnsembleInstance { instance }).await })
    }
}

/// Represents a running [MicrocksEnsemble].
pub struct EnsembleInstance {
    pub instance: TestInstance,
}

impl EnsembleInstance {
    pub fn microcks(&self) -> MicrocksServer {
        self.instance.server()
    }

    /// The Postman runtime, if the ensemble has one.
    pub fn postman(&self) -> Option<PostmanServer> {
        self.instance.try_server()
    }

    /// The async minion, if the ensemble has one.
    pub fn async_minion(&self) -> Option<AsyncMinionServer> {
        self.instance.try_server()
    }

    /// Returns a companion [Server] registered with the ensemble.
    pub fn server<S: Server>(&self) -> S {
        self.instance.server()
    }
}
