/// Failures that reach the caller. Everything scoped to a single region
/// degrades to a blank image instead and never shows up here.
#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Could not open {document} PDF: {reason}")]
    SourcePdf { document: String, reason: String },

    #[error("Archive write failed: {0}")]
    Archive(String),

    #[error("Missing upload: {0}")]
    MissingUpload(String),

    #[error("Not a PDF: {0}")]
    NotPdf(String),
}

impl Error {
    /// Whether the caller sent a bad request, as opposed to the run failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MissingUpload(_) | Error::NotPdf(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Archive(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e.to_string())
    }
}
