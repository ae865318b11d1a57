use thiserror::Error;

/// Errors returned while talking to a running Microcks ensemble.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request to Microcks failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("artifact {artifact} was not imported, Microcks answered {status}")]
    ArtifactImport { artifact: String, status: u16 },

    #[error("couldn't launch a new test on Microcks (status {status}), check the Microcks container logs")]
    TestLaunch { status: u16 },

    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
