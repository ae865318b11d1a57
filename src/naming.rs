//! Naming rules of the destinations the async minion publishes mock messages
//! to.
//!
//! Operation names coming from AsyncAPI documents are usually prefixed with
//! their verb (`SUBSCRIBE pastry/orders`); the verb is never part of the
//! destination.

/// Drops the leading verb of an AsyncAPI operation name.
pub fn operation_without_verb(operation: &str) -> &str {
    match operation.split_once(' ') {
        Some((_, name)) => name,
        None => operation,
    }
}

/// The service name as it appears in destination names: no spaces, no hyphens.
pub fn compact_service_name(service: &str) -> String {
    service.replace(' ', "").replace('-', "")
}

fn destination(service: &str, version: &str, operation: &str) -> String {
    format!("{}-{}-{}", compact_service_name(service), version, operation)
}

/// Path of the WebSocket endpoint of a mocked operation, relative to the
/// minion root (`/api/ws/<service>/<version>/<operation>`).
pub fn ws_mock_path(service: &str, version: &str, operation: &str) -> String {
    format!(
        "/api/ws/{}/{}/{}",
        service.replace(' ', "+"),
        version.replace(' ', "+"),
        operation_without_verb(operation)
    )
}

pub fn kafka_mock_topic(service: &str, version: &str, operation: &str) -> String {
    destination(service, version, &operation_without_verb(operation).replace('/', "-"))
}

pub fn google_pubsub_mock_topic(service: &str, version: &str, operation: &str) -> String {
    kafka_mock_topic(service, version, operation)
}

/// MQTT topics keep the slashes of the operation name.
pub fn mqtt_mock_topic(service: &str, version: &str, operation: &str) -> String {
    destination(service, version, operation_without_verb(operation))
}

pub fn amqp_mock_destination(service: &str, version: &str, operation: &str) -> String {
    mqtt_mock_topic(service, version, operation)
}

/// Amazon queue and topic names cannot contain dots, version included.
pub fn amazon_sqs_mock_queue(service: &str, version: &str, operation: &str) -> String {
    destination(
        service,
        &version.replace('.', ""),
        &operation_without_verb(operation).replace('/', "-"),
    )
}

pub fn amazon_sns_mock_topic(service: &str, version: &str, operation: &str) -> String {
    amazon_sqs_mock_queue(service, version, operation)
}
