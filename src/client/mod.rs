//! A thin client over the Microcks REST API.
//!
//! Only the handful of endpoints needed to seed a Microcks container and to
//! drive conformance tests from a test suite are covered.
pub mod model;

pub use model::{
    DailyInvocationStatistic, EventMessage, Header, OAuth2ClientContext, OAuth2GrantType,
    Request, RequestResponsePair, Response, Secret, SecretRef, TestCaseResult, TestRequest,
    TestResult, TestRunnerType, TestStepResult, UnidirectionalEvent,
};

use crate::error::{Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::{form_urlencoded, Url};

/// Delay before the first poll of a freshly launched test.
const INITIAL_POLL_DELAY: Duration = Duration::from_millis(100);
/// Delay between two polls of a test still in progress.
const POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Microcks records invocations asynchronously.
const INVOCATION_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Client for the API of a single Microcks instance.
#[derive(Clone, Debug)]
pub struct MicrocksClient {
    api: String,
    http: reqwest::Client,
}

impl MicrocksClient {
    /// Creates a client for the Microcks instance reachable at `endpoint`
    /// (e.g. `http://localhost:8080`, without the `/api` suffix).
    pub fn new(endpoint: &str) -> Self {
        MicrocksClient {
            api: format!("{}/api", endpoint.trim_end_matches('/')),
            http: reqwest::Client::new(),
        }
    }

    /// The base URL of the API, ending with `/api`.
    pub fn api_url(&self) -> &str {
        self.api.as_str()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api, path)
    }

    /// Uploads the artifact at `path`, flagging it as main or secondary.
    pub async fn upload_artifact(&self, path: impl AsRef<Path>, main_artifact: bool) -> Result<()> {
        let path = path.as_ref();
        let form = file_form(path)
            .await?
            .text("mainArtifact", main_artifact.to_string());

        let response = self
            .http
            .post(self.url("/artifact/upload"))
            .multipart(form)
            .send()
            .await?;

        check_import(response.status(), &path.display().to_string())?;
        info!(artifact = %path.display(), main_artifact, "artifact imported");
        Ok(())
    }

    /// Asks Microcks to fetch and import the artifact published at `url`.
    pub async fn download_artifact(&self, url: &str, main_artifact: bool) -> Result<()> {
        let main = main_artifact.to_string();
        let response = self
            .http
            .post(self.url("/artifact/download"))
            .form(&[("mainArtifact", main.as_str()), ("url", url)])
            .send()
            .await?;

        check_import(response.status(), url)?;
        info!(artifact = url, main_artifact, "remote artifact imported");
        Ok(())
    }

    /// Imports a repository snapshot previously exported from Microcks.
    pub async fn import_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let form = file_form(path).await?;

        let response = self
            .http
            .post(self.url("/import"))
            .multipart(form)
            .send()
            .await?;

        check_import(response.status(), &path.display().to_string())?;
        info!(snapshot = %path.display(), "snapshot imported");
        Ok(())
    }

    pub async fn create_secret(&self, secret: &model::Secret) -> Result<()> {
        let endpoint = self.url("/secrets");
        let response = self.http.post(&endpoint).json(secret).send().await?;
        expect_status(response.status(), StatusCode::CREATED, &endpoint)?;
        info!(secret = %secret.name, "secret created");
        Ok(())
    }

    /// Launches a new test; Microcks runs it in the background.
    pub async fn create_test(&self, request: &TestRequest) -> Result<TestResult> {
        let response = self
            .http
            .post(self.url("/tests"))
            .json(request)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(Error::TestLaunch {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    pub async fn test_result(&self, id: &str) -> Result<TestResult> {
        self.get_json(&self.url(&format!("/tests/{}", id))).await
    }

    /// Launches a test and waits for its completion.
    ///
    /// The result is polled until it is no longer in progress or until the
    /// timeout of the request has elapsed. The last known result is returned
    /// either way, so a test that timed out comes back with `in_progress` set.
    pub async fn test_endpoint(&self, request: &TestRequest) -> Result<TestResult> {
        let launched = self.create_test(request).await?;
        info!(
            id = %launched.id,
            service = %request.service_id,
            endpoint = %request.test_endpoint,
            "test launched"
        );

        sleep(INITIAL_POLL_DELAY).await;

        let deadline = Instant::now() + Duration::from_millis(request.timeout);
        while Instant::now() < deadline {
            let current = self.test_result(&launched.id).await?;
            if !current.in_progress {
                break;
            }
            debug!(id = %launched.id, "test still in progress");
            sleep(POLL_INTERVAL).await;
        }

        let result = self.test_result(&launched.id).await?;
        info!(id = %result.id, success = result.success, "test finished");
        Ok(result)
    }

    /// The request/response pairs exchanged during the test case of
    /// `operation` (e.g. `GET /pastries`).
    pub async fn test_case_messages(
        &self,
        result: &TestResult,
        operation: &str,
    ) -> Result<Vec<RequestResponsePair>> {
        let path = format!("/tests/{}/messages/{}", result.id, test_case_id(result, operation));
        self.get_json(&self.url(&path)).await
    }

    /// The events received during the async test case of `operation` (e.g.
    /// `SUBSCRIBE pastry/orders`).
    pub async fn test_case_events(
        &self,
        result: &TestResult,
        operation: &str,
    ) -> Result<Vec<UnidirectionalEvent>> {
        let path = format!("/tests/{}/events/{}", result.id, test_case_id(result, operation));
        self.get_json(&self.url(&path)).await
    }

    /// Invocation statistics of a service on `day` (`YYYYMMDD`). `None` when
    /// the service wasn't invoked that day.
    pub async fn invocation_stats(
        &self,
        service: &str,
        version: &str,
        day: &str,
    ) -> Result<Option<DailyInvocationStatistic>> {
        sleep(INVOCATION_SETTLE_DELAY).await;

        let mut url = Url::parse(&self.api)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("{} cannot be a base URL", self.api)))?
            .extend(&["metrics", "invocations", service, version]);
        url.query_pairs_mut().append_pair("day", day);

        let endpoint = url.to_string();
        let response = self.http.get(url).send().await?;
        expect_status(response.status(), StatusCode::OK, &endpoint)?;

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.http.get(endpoint).send().await?;
        expect_status(response.status(), StatusCode::OK, endpoint)?;
        Ok(response.json().await?)
    }
}

/// The identifier Microcks gives to the test case of `operation` within
/// `result`: `<id>-<testNumber>-<form encoded operation>`, slashes of the
/// operation being replaced by `!` first.
pub fn test_case_id(result: &TestResult, operation: &str) -> String {
    let operation = operation.replace('/', "!");
    let encoded: String = form_urlencoded::byte_serialize(operation.as_bytes()).collect();
    format!("{}-{}-{}", result.id, result.test_number, encoded)
}

async fn file_form(path: &Path) -> Result<Form> {
    let content = tokio::fs::read(path).await.map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Form::new().part("file", Part::bytes(content).file_name(file_name)))
}

fn check_import(status: StatusCode, artifact: &str) -> Result<()> {
    if status != StatusCode::CREATED {
        return Err(Error::ArtifactImport {
            artifact: artifact.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

fn expect_status(status: StatusCode, expected: StatusCode, endpoint: &str) -> Result<()> {
    if status != expected {
        return Err(Error::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}
