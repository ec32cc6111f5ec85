//! Login credentials and their hand-off to the dialer

#[cfg(unix)]
pub mod channel;

#[cfg(unix)]
pub use channel::{ChannelError, CredentialChannel, HolderCheck, Lsof, SecretWriter};

use std::fmt;

/// Login and password for one connection
///
/// The password is only reachable through [`Identity::secret`] and never
/// shows up in `Debug` output.
#[derive(Clone)]
pub struct Identity {
    login: String,
    secret: String,
}

impl Identity {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("login", &self.login)
            .field("secret", &"***")
            .finish()
    }
}
