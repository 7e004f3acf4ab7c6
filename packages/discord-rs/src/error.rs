use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The guild, member, role or channel addressed by the request does not exist.
    #[error("discord resource not found: {0}")]
    NotFound(String),

    #[error("discord returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("request to discord failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
