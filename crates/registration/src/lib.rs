pub mod classifier;
pub mod run;
pub mod endpoint;
pub mod orchestrator;

pub use classifier::{classify, Classification, TRANSIENT_RESULT_CODE};
pub use run::context::*;
pub use run::result::*;
pub use endpoint::{CrnResult, HttpEndpoint, RegistrationEndpoint, RegistrationRequest, RegistrationResponse};
pub use orchestrator::*;

use beehub_session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("authentication failed: {0}")]
    Session(#[from] SessionError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("registration endpoint answered with status {0}")]
    BadStatus(u16),

    #[error("unparseable registration response: {0}")]
    Parse(String),

    #[error("a registration run is already in progress")]
    AlreadyRunning,
}
