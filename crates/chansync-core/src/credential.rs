//! Authentication credentials.
//!
//! A [`Credential`] is either anonymous or a [`SignedToken`] supplied by the
//! user. Tokens are JWT-shaped (`header.payload.signature`); the payload must
//! decode to a JSON claims object carrying a `user_id`. The signature itself
//! is opaque here and is validated by the backend.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::error::CredentialError;

/// Authentication credential handed to the transport on connect and reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credential {
    /// No user; the backend assigns an anonymous identity.
    #[default]
    Anonymous,
    /// Signed user token.
    Signed(SignedToken),
}

impl Credential {
    /// Parse a raw user token into a signed credential.
    pub fn signed(raw: &str) -> Result<Self, CredentialError> {
        SignedToken::parse(raw).map(Self::Signed)
    }

    /// True for [`Credential::Anonymous`].
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// User ID claimed by the token. `None` if anonymous.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Signed(token) => Some(token.user_id()),
        }
    }
}

/// A validated user token.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken {
    raw: String,
    user_id: String,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    user_id: Option<String>,
}

impl SignedToken {
    /// Validate the token shape and extract the `user_id` claim.
    ///
    /// # Errors
    ///
    /// - `CredentialError::Empty` for blank input
    /// - `CredentialError::Malformed` unless there are exactly three
    ///   non-empty segments
    /// - `CredentialError::Encoding` / `CredentialError::Claims` if the
    ///   payload does not decode to a JSON object
    /// - `CredentialError::MissingUserId` if the claim is absent or blank
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CredentialError::Empty);
        }

        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            let segments = segments.iter().filter(|s| !s.is_empty()).count();
            return Err(CredentialError::Malformed { segments });
        }

        // Some issuers keep base64 padding on the payload.
        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| CredentialError::Encoding(e.to_string()))?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|e| CredentialError::Claims(e.to_string()))?;

        let user_id = claims
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(CredentialError::MissingUserId)?;

        Ok(Self { raw: raw.to_string(), user_id })
    }

    /// User ID from the token claims.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Raw token string as supplied by the user.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("user_id", &self.user_id)
            .field("raw", &"<redacted>")
            .finish()
    }
}
