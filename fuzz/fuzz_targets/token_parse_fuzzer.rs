//! Fuzz target for user token parsing
//!
//! # Strategy
//!
//! - Raw strings: arbitrary text, including separators and whitespace
//! - Shaped tokens: three segments with an arbitrary payload
//! - Claim tokens: well-formed payloads with or without a `user_id`
//!
//! # Invariants
//!
//! - Parsing NEVER panics
//! - An accepted token has a non-blank user ID and keeps its trimmed text
//! - A well-formed token with a non-blank `user_id` claim is accepted with
//!   exactly that ID

#![no_main]

use arbitrary::Arbitrary;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chansync_core::{Credential, SignedToken};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum TokenInput {
    Raw(String),
    Shaped { header: String, payload: Vec<u8>, signature: String, padded: bool },
    Claims { user_id: Option<String>, surrounding_whitespace: bool },
}

fn render(input: &TokenInput) -> (String, Option<String>) {
    match input {
        TokenInput::Raw(raw) => (raw.clone(), None),
        TokenInput::Shaped { header, payload, signature, padded } => {
            let mut claims = URL_SAFE_NO_PAD.encode(payload);
            if *padded {
                claims.push_str("==");
            }
            (format!("{header}.{claims}.{signature}"), None)
        },
        TokenInput::Claims { user_id, surrounding_whitespace } => {
            let user_id: Option<String> =
                user_id.as_ref().map(|id| id.chars().filter(char::is_ascii_alphanumeric).collect());
            let json = match &user_id {
                Some(id) => format!(r#"{{"user_id":"{id}"}}"#),
                None => "{}".to_string(),
            };
            let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
            let raw = format!("{header}.{}.sig", URL_SAFE_NO_PAD.encode(json));
            let raw = if *surrounding_whitespace { format!("  {raw}\n") } else { raw };
            (raw, user_id.filter(|id| !id.is_empty()))
        },
    }
}

fuzz_target!(|input: TokenInput| {
    let (raw, expected_user) = render(&input);

    match SignedToken::parse(&raw) {
        Ok(token) => {
            assert!(!token.user_id().trim().is_empty(), "accepted blank user id");
            assert_eq!(token.as_str(), raw.trim());
            if let Some(expected) = &expected_user {
                assert_eq!(token.user_id(), expected);
            }

            let credential = Credential::signed(&raw).expect("same input parses twice");
            assert_eq!(credential.user_id(), Some(token.user_id()));
        },
        Err(_) => {
            if matches!(input, TokenInput::Claims { .. }) {
                assert!(expected_user.is_none(), "rejected well-formed token for {expected_user:?}");
            }
            assert!(Credential::signed(&raw).is_err());
        },
    }
});
