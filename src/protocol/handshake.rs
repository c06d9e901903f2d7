//! Credential handshake
//!
//! The first frame on a new connection is a flat JSON object of string keys
//! and string values. Its meaning belongs to the configured
//! [`Authenticator`](crate::connection::Authenticator).

use std::collections::HashMap;

use crate::error::AuthError;

/// Credentials sent by a client before any request
pub type Credentials = HashMap<String, String>;

/// Parse the handshake frame
pub fn decode_credentials(frame: &str) -> Result<Credentials, AuthError> {
    serde_json::from_str(frame).map_err(|e| AuthError::MalformedCredentials(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_credentials() {
        let creds = decode_credentials(r#"{"token":"abc","device":"phone"}"#).unwrap();
        assert_eq!(creds.get("token").map(String::as_str), Some("abc"));
        assert_eq!(creds.len(), 2);
    }

    #[test]
    fn test_empty_object_is_valid_frame() {
        assert!(decode_credentials("{}").unwrap().is_empty());
    }

    #[test]
    fn test_non_string_values_rejected() {
        let err = decode_credentials(r#"{"token":42}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedCredentials(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_credentials("hello").is_err());
        assert!(decode_credentials(r#"["token"]"#).is_err());
    }
}
