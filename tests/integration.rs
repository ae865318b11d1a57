//! Docker backed tests of the Microcks ensemble.
//!
//! They pull the Microcks images and need a Docker daemon, run them with
//! `cargo test -- --ignored`.
use microcks_dockertest::client::{TestRequest, TestRunnerType};
use microcks_dockertest::servers::{
    AsyncMinionServerConfig, GenericServerConfig, MicrocksServer, MicrocksServerConfig,
    PostmanServerConfig,
};
use microcks_dockertest::{MicrocksEnsemble, Test};
use serde_json::Value;
use test_log::test;

const OPENAPI: &str = "tests/resources/apipastries-openapi.yaml";
const POSTMAN_COLLECTION: &str = "tests/resources/apipastries-postman-collection.json";
const ASYNCAPI: &str = "tests/resources/pastry-orders-asyncapi.yaml";

fn microcks(port: u32, grpc_port: u32) -> MicrocksServerConfig {
    MicrocksServerConfig::builder()
        .port(port)
        .grpc_port(grpc_port)
        .main_artifacts(vec![OPENAPI.into()])
        .secondary_artifacts(vec![POSTMAN_COLLECTION.into()])
        .build()
        .unwrap()
}

fn demo_impl(alias: &str, version: &str, port: u32) -> GenericServerConfig {
    GenericServerConfig::builder()
        .image("quay.io/microcks/contract-testing-demo")
        .version(version)
        .alias(alias)
        .wait_message(format!("Example app listening on port {}", port))
        .build()
        .unwrap()
}

async fn assert_config_retrieval(server: &MicrocksServer) {
    let resp = reqwest::get(format!("{}/api/keycloak/config", server.http_endpoint())).await;
    assert!(resp.is_ok());
    assert_eq!(resp.unwrap().status(), 200);
}

async fn pastry_name(url: String) -> String {
    let resp = reqwest::get(url).await.unwrap();
    assert_eq!(resp.status(), 200);
    let pastry: Value = resp.json().await.unwrap();
    pastry["name"].as_str().unwrap().to_string()
}

#[test]
#[ignore]
fn test_mocking_functionality() {
    let ensemble = MicrocksEnsemble::new(microcks(28080, 29090));

    ensemble.run(|instance| async move {
        let server = instance.microcks();
        assert_config_retrieval(&server).await;

        let base = server.rest_mock_endpoint("API Pastries", "0.0.1");
        assert_eq!(base, "http://localhost:28080/rest/API Pastries/0.0.1");
        assert_eq!(server.grpc_mock_endpoint(), "grpc://localhost:29090");

        let name = pastry_name(format!("{}/pastries/Millefeuille", base)).await;
        assert_eq!(name, "Millefeuille");

        assert!(server.verify("API Pastries", "0.0.1").await.unwrap());
        let count = server
            .service_invocations_count("API Pastries", "0.0.1")
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Comes from the secondary artifact.
        let name = pastry_name(format!("{}/pastries/Eclair Chocolat", base)).await;
        assert_eq!(name, "Eclair Chocolat");

        let count = server
            .service_invocations_count("API Pastries", "0.0.1")
            .await
            .unwrap();
        assert_eq!(count, 2);
    });
}

#[test]
#[ignore]
fn test_import_after_startup() {
    let config = MicrocksServerConfig::builder()
        .port(28180)
        .grpc_port(29190)
        .build()
        .unwrap();
    let mut test = Test::new();
    test.register(config);

    test.run(|instance| async move {
        let server: MicrocksServer = instance.server();
        assert!(!server.verify("API Pastries", "0.0.1").await.unwrap());

        server.import_as_main_artifact(OPENAPI).await.unwrap();
        let base = server.rest_mock_endpoint("API Pastries", "0.0.1");
        let name = pastry_name(format!("{}/pastries/Millefeuille", base)).await;
        assert_eq!(name, "Millefeuille");

        let missing = server.import_as_secondary_artifact("tests/resources/missing.json").await;
        assert!(missing.is_err());
    });
}

#[test]
#[ignore]
fn test_contract_testing_functionality() {
    let mut ensemble = MicrocksEnsemble::new(microcks(28280, 29290));
    ensemble.register(demo_impl("bad-impl", "01", 3001));
    ensemble.register(demo_impl("good-impl", "02", 3002));

    ensemble.run(|instance| async move {
        let server = instance.microcks();
        assert_config_retrieval(&server).await;

        let request = TestRequest::new(
            "API Pastries:0.0.1",
            TestRunnerType::OpenApiSchema,
            "http://bad-impl:3001",
            2000,
        );
        let result = server.test_endpoint(&request).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.tested_endpoint, "http://bad-impl:3001");
        assert!(!result.test_case_results.is_empty());
        assert!(result.test_case_results.iter().all(|r| !r.success));

        let messages = server
            .messages_for_test_case(&result, "GET /pastries")
            .await
            .unwrap();
        assert!(!messages.is_empty());
        for pair in &messages {
            assert!(pair.response.content.is_some());
        }

        let request = TestRequest::new(
            "API Pastries:0.0.1",
            TestRunnerType::OpenApiSchema,
            "http://good-impl:3002",
            2000,
        );
        let result = server.test_endpoint_async(request).await.unwrap().unwrap();
        assert!(result.success);
        assert_eq!(result.tested_endpoint, "http://good-impl:3002");
        assert!(result.test_case_results.iter().all(|r| r.success));
    });
}

#[test]
#[ignore]
fn test_postman_contract_testing_functionality() {
    let postman = PostmanServerConfig::builder().build().unwrap();
    let mut ensemble = MicrocksEnsemble::new(microcks(28380, 29390)).with_postman(postman);
    ensemble.register(demo_impl("bad-impl", "02", 3002));
    ensemble.register(demo_impl("good-impl", "03", 3003));

    ensemble.run(|instance| async move {
        let server = instance.microcks();
        assert!(instance.postman().is_some());

        let request = TestRequest::new(
            "API Pastries:0.0.1",
            TestRunnerType::Postman,
            "http://bad-impl:3002",
            5000,
        );
        let result = server.test_endpoint(&request).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.tested_endpoint, "http://bad-impl:3002");

        let request = TestRequest::new(
            "API Pastries:0.0.1",
            TestRunnerType::Postman,
            "http://good-impl:3003",
            5000,
        );
        let result = server.test_endpoint(&request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.tested_endpoint, "http://good-impl:3003");
    });
}

#[test]
#[ignore]
fn test_async_feature_setup() {
    let config = MicrocksServerConfig::builder()
        .port(28480)
        .grpc_port(29490)
        .main_artifacts(vec![ASYNCAPI.into()])
        .build()
        .unwrap();
    let minion = AsyncMinionServerConfig::builder().port(28481).build().unwrap();
    let ensemble = MicrocksEnsemble::new(config)
        .with_async_minion(minion)
        .with_debug_log_level();

    ensemble.run(|instance| async move {
        assert_config_retrieval(&instance.microcks()).await;

        let minion = instance.async_minion().unwrap();
        assert_eq!(
            minion.ws_mock_endpoint("Pastry orders API", "0.1.0", "SUBSCRIBE pastry/orders"),
            "ws://localhost:28481/api/ws/Pastry+orders+API/0.1.0/pastry/orders"
        );
        assert!(reqwest::get(minion.http_endpoint()).await.is_ok());
    });
}
