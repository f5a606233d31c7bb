pub mod error;
pub mod login;
pub mod manager;
pub mod profile;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

pub use error::SessionError;
pub use login::{LoginContext, LoginFlow, LoginState};
pub use manager::{Session, SessionManager, TokenProvider};
pub use profile::{HttpProfileApi, Profile, ProfileApi, ProfileClient, ProfileError};
pub use transport::{HttpConnector, PortalConnector, PortalResponse, PortalTransport};
