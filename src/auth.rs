//! Session-domain models: signed-in user, token pair, and redacted secrets.

pub mod secret;
pub mod session;

pub use secret::*;
pub use session::*;
