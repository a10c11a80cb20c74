use hyper::StatusCode;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, SiftError>;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("unable to complete search: {0:#}")]
    Other(#[from] anyhow::Error),

    #[error("failed to process request due to a server error: {0}")]
    ServerError(#[from] hyper::Error),

    #[error("failed serialize / deserialize value: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("invalid request given: {0}")]
    BadRequest(&'static str),

    #[error("no endpoint named {0:?}")]
    UnknownEndpoint(String),
}

impl SiftError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::SerializationError(_) => StatusCode::BAD_REQUEST,
            Self::UnknownEndpoint(_) => StatusCode::NOT_FOUND,
            Self::Other(_) | Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(SiftError::BadRequest("nope").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SiftError::UnknownEndpoint("orders".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SiftError::from(anyhow::anyhow!("engine down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
