use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveStackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Malformed metadata for {keyword}: {reason}")]
    MalformedMetadata { keyword: String, reason: String },

    #[error("No reference stack exists for {0}")]
    MissingReferenceStack(String),

    #[error("Pixel grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl LiveStackError {
    pub(crate) fn malformed(keyword: &str, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            keyword: keyword.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LiveStackError>;
