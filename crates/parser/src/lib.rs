pub mod html;
pub mod identity;

pub use html::{contains_form, hidden_inputs};
pub use identity::{find_active_identity, Identity};
