use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // -- Network
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Request timed out: {url}")]
    Timeout { url: String },
    #[error("Not found: {url}")]
    NotFound { url: String },
    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    // -- Parsing
    #[error("Couldn't parse the words page: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed row on line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    // -- Filesystem
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    // -- Packaging
    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Zip Error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
}

impl Error {
    /// Classifies a transport error for `url` into the typed network variants.
    pub(crate) fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Error::Timeout { url: url.into() };
        }
        match err.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                Error::NotFound { url: url.into() }
            }
            Some(status) => Error::HttpStatus {
                url: url.into(),
                status: status.as_u16(),
            },
            None => Error::Reqwest(err),
        }
    }
}
