use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transcript contains no messages")]
    EmptyTranscript,

    #[error("transcript has no header record")]
    MissingHeader,

    #[error("failed to read transcript {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transform hook failed: {0}")]
    Transform(String),
}
