//! Session token store.
//!
//! Holds the credential the transport reads on connect and reload. Only the
//! session state machine mutates it. Nothing is persisted: every `connect`
//! supplies the token again.

use chansync_core::{Credential, CredentialError};

/// Current authentication credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStore {
    credential: Credential,
}

impl TokenStore {
    /// Create a store holding [`Credential::Anonymous`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `raw` and install it as the signed credential.
    ///
    /// On error the store keeps its previous credential.
    ///
    /// # Errors
    ///
    /// Returns the [`CredentialError`] describing why the token is malformed.
    pub fn install(&mut self, raw: &str) -> Result<&Credential, CredentialError> {
        self.credential = Credential::signed(raw)?;
        Ok(&self.credential)
    }

    /// Reset to [`Credential::Anonymous`].
    pub fn reset(&mut self) -> &Credential {
        self.credential = Credential::Anonymous;
        &self.credential
    }

    /// Current credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}
