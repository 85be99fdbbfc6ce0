//! Session grant types.
//!
//! What register and login hand back to the request layer.

use serde::{Deserialize, Serialize};

use super::user::User;

/// A signed-in user and the bearer token issued for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// The account, without password hash or stored token.
    pub user: User,
    /// Freshly issued bearer token. Earlier tokens remain valid until expiry.
    pub token: String,
}
