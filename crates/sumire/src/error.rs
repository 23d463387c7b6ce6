use thiserror::Error;

#[derive(Error, Debug)]
pub enum SumireError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Manifest fetch error: {0}")]
    ManifestFetchError(String),

    #[error("{0} is not a master manifest")]
    NotMasterManifest(String),

    #[error("Invalid manifest: {0}")]
    ManifestParseError(String),

    #[error("No usable rendition")]
    NoUsableRendition,

    #[error("Rendition {bandwidth} ran out of segments while aligning to {wanted}")]
    AlignmentExhausted { bandwidth: u64, wanted: String },

    #[error("Rendition {bandwidth}: {count} segment(s) failed after retries")]
    SegmentsFailed { bandwidth: u64, count: usize },

    #[error("Renditions failed: {0:?}")]
    RenditionsFailed(Vec<u64>),

    #[error("{tool} exited with {status}")]
    CommandFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),
}

pub type SumireResult<T> = Result<T, SumireError>;
