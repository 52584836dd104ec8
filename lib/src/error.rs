use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported game mode {0:?}, expected arcade or blocks")]
    UnsupportedMode(String),
    /// The lookup word is not in the embedding model vocabulary
    #[error("Word {0:?} not in vocabulary")]
    OutOfVocabulary(String),
    /// Every nearest neighbor was rejected for this key
    #[error("No association left for {0:?}")]
    NoAssociation(String),
    #[error("Malformed model file: {0}")]
    MalformedModel(String),
    #[error("Marker template has no contrast")]
    FlatTemplate,
    /// Error reading model or template file
    #[error("File could not be read")]
    Io(#[from] io::Error),
    /// Error decoding image
    #[error("Image {path} could not be decoded")]
    ImageError {
        path: String,
        source: image::error::ImageError,
    },
    /// A screen, keyboard or recognizer backend failed
    #[error("{0} failed: {1}")]
    Collaborator(&'static str, String),
}
