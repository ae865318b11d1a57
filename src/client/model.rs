//! JSON documents exchanged with the Microcks REST API.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of runner Microcks uses to check an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestRunnerType {
    Http,
    SoapHttp,
    SoapUi,
    Postman,
    OpenApiSchema,
    AsyncApiSchema,
    GrpcProtobuf,
    GraphqlSchema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OAuth2GrantType {
    Password,
    ClientCredentials,
    RefreshToken,
}

/// OAuth2 settings Microcks uses to obtain a token before calling the tested
/// endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2ClientContext {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub grant_type: OAuth2GrantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// A header sent with the requests of a test. `values` is comma separated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub values: String,
}

/// Asks Microcks to check `test_endpoint` against the service `service_id`
/// (`<name>:<version>`).
///
/// `timeout` is expressed in milliseconds and bounds how long the client
/// polls for the result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub service_id: String,
    pub runner_type: TestRunnerType,
    pub test_endpoint: String,
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_operations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations_headers: Option<HashMap<String, Vec<Header>>>,
    #[serde(default, rename = "oAuth2Context", skip_serializing_if = "Option::is_none")]
    pub oauth2_context: Option<OAuth2ClientContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

impl TestRequest {
    pub fn new(
        service_id: impl Into<String>,
        runner_type: TestRunnerType,
        test_endpoint: impl Into<String>,
        timeout: u64,
    ) -> Self {
        TestRequest {
            service_id: service_id.into(),
            runner_type,
            test_endpoint: test_endpoint.into(),
            timeout,
            filtered_operations: None,
            operations_headers: None,
            oauth2_context: None,
            secret_name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub secret_id: String,
    pub name: String,
}

/// The outcome of a single step (one request, or one async message) of a
/// test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    pub success: bool,
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(default)]
    pub request_name: Option<String>,
    #[serde(default)]
    pub event_message_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub success: bool,
    #[serde(default)]
    pub elapsed_time: i64,
    pub operation_name: String,
    #[serde(default)]
    pub test_step_results: Vec<TestStepResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    #[serde(default)]
    pub version: i64,
    pub test_number: i64,
    #[serde(default)]
    pub test_date: i64,
    pub tested_endpoint: String,
    pub service_id: String,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub elapsed_time: i64,
    pub success: bool,
    pub in_progress: bool,
    pub runner_type: TestRunnerType,
    #[serde(default)]
    pub test_case_results: Vec<TestCaseResult>,
    #[serde(default)]
    pub operations_headers: Option<HashMap<String, Vec<Header>>>,
    #[serde(default)]
    pub secret_ref: Option<SecretRef>,
}

/// Credentials stored in Microcks and referenced by name from test requests
/// or remote artifact imports.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_pem: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub test_case_id: Option<String>,
    #[serde(default)]
    pub source_artifact: Option<String>,
    #[serde(default)]
    pub query_parameters: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub headers: Option<Vec<serde_json::Value>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub test_case_id: Option<String>,
    #[serde(default)]
    pub source_artifact: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub dispatch_criteria: Option<String>,
    #[serde(default)]
    pub headers: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub is_fault: Option<bool>,
}

/// An exchange recorded by Microcks while running a test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestResponsePair {
    pub request: Request,
    pub response: Response,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub test_case_id: Option<String>,
    #[serde(default)]
    pub source_artifact: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub dispatch_criteria: Option<String>,
    #[serde(default)]
    pub headers: Option<Vec<serde_json::Value>>,
}

/// A message received by Microcks while running an async test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnidirectionalEvent {
    pub event_message: EventMessage,
}

/// Invocation counters of a mocked service for one day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInvocationStatistic {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub service_version: Option<String>,
    #[serde(default)]
    pub daily_count: u64,
    #[serde(default)]
    pub hourly_count: HashMap<String, u64>,
    #[serde(default)]
    pub minute_count: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = TestRequest::new(
            "API Pastries:0.0.1",
            TestRunnerType::OpenApiSchema,
            "http://bad-impl:3001",
            2000,
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "serviceId": "API Pastries:0.0.1",
                "runnerType": "OPEN_API_SCHEMA",
                "testEndpoint": "http://bad-impl:3001",
                "timeout": 2000
            })
        );
    }

    #[test]
    fn test_request_with_oauth2_context() {
        let mut request = TestRequest::new(
            "API Pastries:0.0.1",
            TestRunnerType::Postman,
            "http://good-impl:3002",
            5000,
        );
        request.oauth2_context = Some(OAuth2ClientContext {
            client_id: "client".into(),
            client_secret: "secret".into(),
            token_uri: "http://keycloak:8080/token".into(),
            grant_type: OAuth2GrantType::ClientCredentials,
            scopes: None,
            username: None,
            password: None,
            refresh_token: None,
        });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["runnerType"], "POSTMAN");
        assert_eq!(value["oAuth2Context"]["grantType"], "CLIENT_CREDENTIALS");
        assert_eq!(value["oAuth2Context"]["tokenUri"], "http://keycloak:8080/token");
    }

    #[test]
    fn test_result_deserialization() {
        let payload = json!({
            "id": "65a7a7b2f1",
            "version": 0,
            "testNumber": 2,
            "testDate": 1705486258000i64,
            "testedEndpoint": "http://bad-impl:3001",
            "serviceId": "65a7a7a1",
            "elapsedTime": 120,
            "success": false,
            "inProgress": false,
            "runnerType": "OPEN_API_SCHEMA",
            "testCaseResults": [{
                "success": false,
                "elapsedTime": 40,
                "operationName": "GET /pastries",
                "testStepResults": [{
                    "success": false,
                    "elapsedTime": 12,
                    "requestName": "pastries_json",
                    "message": "object has missing required properties ([\"price\"])"
                }]
            }]
        });

        let result: TestResult = serde_json::from_value(payload).unwrap();
        assert!(!result.success);
        assert!(!result.in_progress);
        assert_eq!(result.runner_type, TestRunnerType::OpenApiSchema);
        assert_eq!(result.test_case_results.len(), 1);

        let step = &result.test_case_results[0].test_step_results[0];
        assert!(step.message.as_ref().unwrap().contains("missing required properties"));
        assert_eq!(step.event_message_name, None);
    }

    #[test]
    fn test_result_without_cases() {
        let payload = json!({
            "id": "1",
            "testNumber": 1,
            "testedEndpoint": "kafka://kafka:19092",
            "serviceId": "Pastry orders API:0.1.0",
            "success": false,
            "inProgress": true,
            "runnerType": "ASYNC_API_SCHEMA"
        });

        let result: TestResult = serde_json::from_value(payload).unwrap();
        assert!(result.in_progress);
        assert!(result.test_case_results.is_empty());
    }

    #[test]
    fn test_secret_serialization_skips_unset_fields() {
        let secret = Secret {
            name: "my-secret".into(),
            token: Some("abc".into()),
            token_header: Some("x-token".into()),
            ..Default::default()
        };

        let value = serde_json::to_value(&secret).unwrap();
        assert_eq!(
            value,
            json!({"name": "my-secret", "token": "abc", "tokenHeader": "x-token"})
        );
    }
}
