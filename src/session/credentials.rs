//! Sign-in credentials

use std::fmt;

use crate::error::AuthError;

/// Login and password for GLPI's Basic-auth handshake
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Reject credentials that can never authenticate.
    ///
    /// Email-shaped identifiers must belong to `allowed_domain` when one is set.
    pub fn validate(&self, allowed_domain: Option<&str>) -> Result<(), AuthError> {
        let identifier = self.identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::MalformedCredentials("identifier is empty"));
        }
        if self.secret.trim().is_empty() {
            return Err(AuthError::MalformedCredentials("password is empty"));
        }
        // Basic auth splits on the first colon
        if identifier.contains(':') {
            return Err(AuthError::MalformedCredentials(
                "identifier must not contain ':'",
            ));
        }

        if let Some(domain) = allowed_domain
            && let Some((_, host)) = identifier.rsplit_once('@')
            && !host.eq_ignore_ascii_case(domain.trim_start_matches('@'))
        {
            return Err(AuthError::MalformedCredentials(
                "email domain is not allowed",
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
