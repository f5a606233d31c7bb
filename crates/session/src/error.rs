use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("portal answered with status {0}")]
    BadStatus(u16),

    #[error("no active student identity to select")]
    NoActiveIdentity,

    #[error("login failed")]
    LoginFailed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not authenticated")]
    NotAuthenticated,
}
