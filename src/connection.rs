//! Broker connection settings handed to the async minion.

/// Connection to a Kafka cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KafkaConnection {
    pub bootstrap_servers: String,
    pub schema_registry_url: Option<String>,
}

impl KafkaConnection {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        KafkaConnection {
            bootstrap_servers: bootstrap_servers.into(),
            schema_registry_url: None,
        }
    }

    pub fn with_schema_registry(mut self, url: impl Into<String>) -> Self {
        self.schema_registry_url = Some(url.into());
        self
    }
}

/// Connection to a broker addressed by `host:port` with basic credentials
/// (MQTT, AMQP).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericConnection {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl GenericConnection {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        GenericConnection {
            server: server.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Connection to an Amazon service (SQS, SNS), possibly emulated.
///
/// `endpoint_override` points the minion at an emulator such as LocalStack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AmazonServiceConnection {
    pub region: String,
    pub endpoint_override: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

impl AmazonServiceConnection {
    pub fn new(
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        AmazonServiceConnection {
            region: region.into(),
            endpoint_override: None,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn with_endpoint_override(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }
}

/// Connection to Google Cloud Pub/Sub or its emulator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GooglePubSubConnection {
    pub project_id: String,
    pub emulator_host: Option<String>,
}

impl GooglePubSubConnection {
    pub fn new(project_id: impl Into<String>) -> Self {
        GooglePubSubConnection {
            project_id: project_id.into(),
            emulator_host: None,
        }
    }

    pub fn with_emulator(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }
}
