use crate::connection::{
    AmazonServiceConnection, GenericConnection, GooglePubSubConnection, KafkaConnection,
};
use crate::error::{Error, Result};
use crate::naming;
use crate::server::wait_for_message;
use crate::{Config, ContainerConfig, Server};
use derive_builder::Builder;
use dockertest::waitfor::MessageSource;
use dockertest::{PullPolicy, RunningContainer, Source, StartPolicy};
use std::collections::HashMap;
use tracing::debug;

const IMAGE: &str = "quay.io/microcks/microcks-uber-async-minion";
const LOG_MSG: &str = "Profile prod activated";

/// HTTP (and WebSocket) port of the minion inside the container.
pub const PORT: u32 = 8081;
/// Network alias Microcks uses to reach the minion.
pub const DEFAULT_ALIAS: &str = "microcks-async-minion";

/// Configuration for creating a Microcks async minion.
///
/// The minion publishes the mock messages of AsyncAPI operations and runs
/// async conformance tests. It always serves WebSocket mocks; every broker
/// connection set on the configuration enables one more protocol.
///
/// `microcks_host_port` is the `host:port` of Microcks as seen from the
/// minion container and is checked when the configuration is built.
///
/// Build it with `builder()`, which applies the defaults and the validation.
#[derive(Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct AsyncMinionServerConfig {
    #[builder(default = "String::from(DEFAULT_ALIAS)", setter(into))]
    pub alias: String,
    #[builder(default, setter(strip_option))]
    pub amqp: Option<GenericConnection>,
    #[builder(default = "Vec::new()")]
    pub args: Vec<String>,
    #[builder(default)]
    pub debug: bool,
    #[builder(default = "HashMap::new()")]
    pub env: HashMap<String, String>,
    #[builder(default, setter(strip_option))]
    pub google_pubsub: Option<GooglePubSubConnection>,
    #[builder(default = "self.default_handle()", setter(into))]
    pub handle: String,
    /// Full image reference, e.g. a mirror of the default image.
    #[builder(default = "String::from(IMAGE)", setter(into))]
    pub image: String,
    #[builder(default, setter(strip_option))]
    pub kafka: Option<KafkaConnection>,
    #[builder(default = "String::from(\"microcks:8080\")", setter(into))]
    pub microcks_host_port: String,
    #[builder(default, setter(strip_option))]
    pub mqtt: Option<GenericConnection>,
    #[builder(default = "8081")]
    pub port: u32,
    #[builder(default, setter(strip_option))]
    pub sns: Option<AmazonServiceConnection>,
    #[builder(default, setter(strip_option))]
    pub sqs: Option<AmazonServiceConnection>,
    #[builder(default = "60")]
    pub timeout: u16,
    #[builder(default = "String::from(\"latest\")", setter(into))]
    pub version: String,
}

impl AsyncMinionServerConfigBuilder {
    fn default_handle(&self) -> String {
        crate::server::new_handle(self.image.as_deref().unwrap_or(IMAGE))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match &self.microcks_host_port {
            Some(host_port) => parse_host_port(host_port)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }
}

impl AsyncMinionServerConfig {
    pub fn builder() -> AsyncMinionServerConfigBuilder {
        AsyncMinionServerConfigBuilder::default()
    }

    /// The protocols enabled on top of WebSocket, in the form expected by
    /// `ASYNC_PROTOCOLS` (`,KAFKA,MQTT`). Empty when only WebSocket is used.
    pub fn async_protocols(&self) -> String {
        let enabled = [
            ("KAFKA", self.kafka.is_some()),
            ("MQTT", self.mqtt.is_some()),
            ("AMQP", self.amqp.is_some()),
            ("SQS", self.sqs.is_some()),
            ("SNS", self.sns.is_some()),
            ("GOOGLEPUBSUB", self.google_pubsub.is_some()),
        ];

        enabled
            .iter()
            .filter(|(_, on)| *on)
            .map(|(protocol, _)| format!(",{}", protocol))
            .collect()
    }

    /// The environment of the container: connection settings first, then
    /// the user supplied `env` which takes precedence.
    fn environment(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("MICROCKS_HOST_PORT".to_string(), self.microcks_host_port.clone());

        let protocols = self.async_protocols();
        if !protocols.is_empty() {
            env.insert("ASYNC_PROTOCOLS".to_string(), protocols);
        }

        if let Some(kafka) = &self.kafka {
            env.insert("KAFKA_BOOTSTRAP_SERVER".into(), kafka.bootstrap_servers.clone());
            if let Some(registry) = &kafka.schema_registry_url {
                env.insert("KAFKA_SCHEMA_REGISTRY_URL".into(), registry.clone());
                env.insert("KAFKA_SCHEMA_REGISTRY_CONFLUENT".into(), "true".into());
            }
        }
        if let Some(mqtt) = &self.mqtt {
            insert_generic(&mut env, "MQTT", mqtt);
        }
        if let Some(amqp) = &self.amqp {
            insert_generic(&mut env, "AMQP", amqp);
        }
        if let Some(sqs) = &self.sqs {
            insert_amazon(&mut env, "SQS", sqs);
        }
        if let Some(sns) = &self.sns {
            insert_amazon(&mut env, "SNS", sns);
        }
        if let Some(pubsub) = &self.google_pubsub {
            env.insert("GOOGLEPUBSUB_PROJECT".into(), pubsub.project_id.clone());
            if let Some(host) = &pubsub.emulator_host {
                env.insert("PUBSUB_EMULATOR_HOST".into(), host.clone());
            }
        }
        if self.debug {
            env.insert("QUARKUS_LOG_CONSOLE_LEVEL".into(), "DEBUG".into());
            env.insert(
                "QUARKUS_LOG_CATEGORY__IO_GITHUB_MICROCKS__LEVEL".into(),
                "DEBUG".into(),
            );
        }

        env.extend(self.env.clone());
        env
    }

    fn container_config(self) -> ContainerConfig {
        let env = self.environment();
        debug!(protocols = %self.async_protocols(), "configuring async minion");

        ContainerConfig {
            args: self.args,
            env,
            handle: self.handle,
            name: self.image,
            source: Source::DockerHub,
            pull_policy: PullPolicy::IfNotPresent,
            version: self.version,
            ports: Some(vec![(PORT, self.port)]),
            wait: Some(wait_for_message(LOG_MSG, MessageSource::Stdout, self.timeout)),
            aliases: vec![self.alias],
            start_policy: StartPolicy::Strict,
        }
    }
}

fn insert_generic(env: &mut HashMap<String, String>, prefix: &str, connection: &GenericConnection) {
    env.insert(format!("{}_SERVER", prefix), connection.server.clone());
    env.insert(format!("{}_USERNAME", prefix), connection.username.clone());
    env.insert(format!("{}_PASSWORD", prefix), connection.password.clone());
}

fn insert_amazon(
    env: &mut HashMap<String, String>,
    service: &str,
    connection: &AmazonServiceConnection,
) {
    env.insert(format!("AWS_{}_REGION", service), connection.region.clone());
    if let Some(endpoint) = &connection.endpoint_override {
        env.insert(format!("AWS_{}_ENDPOINT", service), endpoint.clone());
    }
    env.insert("AWS_ACCESS_KEY_ID".into(), connection.access_key.clone());
    env.insert("AWS_SECRET_ACCESS_KEY".into(), connection.secret_key.clone());
}

/// Extracts the port of a `host:port` string.
pub fn parse_host_port(host_port: &str) -> Result<u16> {
    let parts: Vec<&str> = host_port.split(':').collect();
    if parts.len() != 2 {
        return Err(Error::InvalidConfig(format!(
            "port not found in {:?}, expected host:port",
            host_port
        )));
    }
    parts[1]
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid port in {:?}", host_port)))
}

impl Config for AsyncMinionServerConfig {
    fn into_composition(self) -> dockertest::Composition {
        self.container_config().into()
    }

    fn handle(&self) -> &str {
        self.handle.as_str()
    }
}

/// A running instance of a Microcks async minion.
///
/// Provides the names under which the minion publishes the mock messages of
/// an AsyncAPI operation for each protocol.
pub struct AsyncMinionServer {
    pub alias: String,
    pub external_port: u32,
    pub internal_port: u32,
    pub ip: String,
}

impl AsyncMinionServer {
    fn from_config(config: &AsyncMinionServerConfig, ip: String) -> Self {
        AsyncMinionServer {
            alias: config.alias.clone(),
            external_port: config.port,
            internal_port: PORT,
            ip,
        }
    }

    /// The HTTP endpoint of the minion from the local host.
    pub fn http_endpoint(&self) -> String {
        format!("http://localhost:{}", self.external_port)
    }

    /// The WebSocket endpoint where mock messages of `operation` are published.
    pub fn ws_mock_endpoint(&self, service: &str, version: &str, operation: &str) -> String {
        format!(
            "ws://localhost:{}{}",
            self.external_port,
            naming::ws_mock_path(service, version, operation)
        )
    }

    pub fn kafka_mock_topic(&self, service: &str, version: &str, operation: &str) -> String {
        naming::kafka_mock_topic(service, version, operation)
    }

    pub fn mqtt_mock_topic(&self, service: &str, version: &str, operation: &str) -> String {
        naming::mqtt_mock_topic(service, version, operation)
    }

    pub fn amqp_mock_destination(&self, service: &str, version: &str, operation: &str) -> String {
        naming::amqp_mock_destination(service, version, operation)
    }

    pub fn amazon_sqs_mock_queue(&self, service: &str, version: &str, operation: &str) -> String {
        naming::amazon_sqs_mock_queue(service, version, operation)
    }

    pub fn amazon_sns_mock_topic(&self, service: &str, version: &str, operation: &str) -> String {
        naming::amazon_sns_mock_topic(service, version, operation)
    }

    pub fn google_pubsub_mock_topic(&self, service: &str, version: &str, operation: &str) -> String {
        naming::google_pubsub_mock_topic(service, version, operation)
    }
}

impl Server for AsyncMinionServer {
    type Config = AsyncMinionServerConfig;

    fn new(config: &Self::Config, container: &RunningContainer) -> Self {
        AsyncMinionServer::from_config(config, container.ip().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_host_port, AsyncMinionServer, AsyncMinionServerConfig, PORT};
    use crate::connection::{
        AmazonServiceConnection, GenericConnection, GooglePubSubConnection, KafkaConnection,
    };

    #[test]
    fn test_parse_host_port() {
        assert_eq!(parse_host_port("host:8080").unwrap(), 8080);
        assert!(parse_host_port("host").is_err());
        assert!(parse_host_port("host:port").is_err());
        assert!(parse_host_port("a:b:8080").is_err());
    }

    #[test]
    fn test_invalid_microcks_host_port() {
        let result = AsyncMinionServerConfig::builder()
            .microcks_host_port("microcks")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_websocket_only() {
        let config = AsyncMinionServerConfig::builder().build().unwrap();
        assert_eq!(config.microcks_host_port, "microcks:8080");
        assert!(!config.debug);
        assert!(config.kafka.is_none() && config.sqs.is_none());
        assert_eq!(config.async_protocols(), "");

        let env = config.environment();
        assert_eq!(env["MICROCKS_HOST_PORT"], "microcks:8080");
        assert!(!env.contains_key("ASYNC_PROTOCOLS"));
    }

    #[test]
    fn test_kafka_and_mqtt() {
        let config = AsyncMinionServerConfig::builder()
            .mqtt(GenericConnection::new("mqtt:1883", "test", "secret"))
            .kafka(KafkaConnection::new("kafka:19092").with_schema_registry("http://registry:8888"))
            .build()
            .unwrap();

        let env = config.environment();
        assert_eq!(env["ASYNC_PROTOCOLS"], ",KAFKA,MQTT");
        assert_eq!(env["KAFKA_BOOTSTRAP_SERVER"], "kafka:19092");
        assert_eq!(env["KAFKA_SCHEMA_REGISTRY_URL"], "http://registry:8888");
        assert_eq!(env["KAFKA_SCHEMA_REGISTRY_CONFLUENT"], "true");
        assert_eq!(env["MQTT_SERVER"], "mqtt:1883");
        assert_eq!(env["MQTT_USERNAME"], "test");
        assert_eq!(env["MQTT_PASSWORD"], "secret");
    }

    #[test]
    fn test_amazon_and_pubsub() {
        let config = AsyncMinionServerConfig::builder()
            .sqs(
                AmazonServiceConnection::new("us-east-1", "key", "secret")
                    .with_endpoint_override("http://localstack:4566"),
            )
            .sns(AmazonServiceConnection::new("eu-west-1", "key", "secret"))
            .google_pubsub(GooglePubSubConnection::new("my-project").with_emulator("pubsub:8085"))
            .amqp(GenericConnection::new("rabbitmq:5672", "guest", "guest"))
            .build()
            .unwrap();

        let env = config.environment();
        assert_eq!(env["ASYNC_PROTOCOLS"], ",AMQP,SQS,SNS,GOOGLEPUBSUB");
        assert_eq!(env["AWS_SQS_REGION"], "us-east-1");
        assert_eq!(env["AWS_SQS_ENDPOINT"], "http://localstack:4566");
        assert_eq!(env["AWS_SNS_REGION"], "eu-west-1");
        assert!(!env.contains_key("AWS_SNS_ENDPOINT"));
        assert_eq!(env["AWS_ACCESS_KEY_ID"], "key");
        assert_eq!(env["AWS_SECRET_ACCESS_KEY"], "secret");
        assert_eq!(env["GOOGLEPUBSUB_PROJECT"], "my-project");
        assert_eq!(env["PUBSUB_EMULATOR_HOST"], "pubsub:8085");
        assert_eq!(env["AMQP_SERVER"], "rabbitmq:5672");
    }

    #[test]
    fn test_debug_and_user_env() {
        let mut user = std::collections::HashMap::new();
        user.insert("QUARKUS_LOG_CONSOLE_LEVEL".to_string(), "TRACE".to_string());

        let config = AsyncMinionServerConfig::builder()
            .debug(true)
            .env(user)
            .build()
            .unwrap();

        let env = config.environment();
        assert_eq!(env["QUARKUS_LOG_CONSOLE_LEVEL"], "TRACE");
        assert_eq!(env["QUARKUS_LOG_CATEGORY__IO_GITHUB_MICROCKS__LEVEL"], "DEBUG");
    }

    #[test]
    fn test_container_config() {
        let config = AsyncMinionServerConfig::builder()
            .image("registry.local/custom-minion")
            .build()
            .unwrap();
        assert!(config.handle.starts_with("custom-minion-"));
        assert_eq!(config.container_config().name, "registry.local/custom-minion");

        let config = AsyncMinionServerConfig::builder().port(18081).build().unwrap();
        let container = config.container_config();
        assert_eq!(container.name, "quay.io/microcks/microcks-uber-async-minion");
        assert_eq!(container.ports, Some(vec![(PORT, 18081)]));
        assert_eq!(container.aliases, vec!["microcks-async-minion".to_string()]);
    }

    #[test]
    fn test_ws_mock_endpoint() {
        let config = AsyncMinionServerConfig::builder().port(18081).build().unwrap();
        let server = AsyncMinionServer::from_config(&config, "172.17.0.4".into());

        assert_eq!(
            server.ws_mock_endpoint("Pastry orders API", "0.1.0", "SUBSCRIBE pastry/orders"),
            "ws://localhost:18081/api/ws/Pastry+orders+API/0.1.0/pastry/orders"
        );
        assert_eq!(
            server.kafka_mock_topic("Pastry orders API", "0.1.0", "SUBSCRIBE pastry/orders"),
            "PastryordersAPI-0.1.0-pastry-orders"
        );
    }
}
