use base64::{
    Engine,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Tokens longer than this are rejected without decoding.
pub const MAX_TOKEN_LEN: usize = 16 * 1024;

/// Decoded (unverified) token payload.
///
/// Only `exp` drives decisions. Other claims are kept so callers can inspect
/// them, but nothing here is trusted: no signature is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Expiry in Unix seconds.
    ///
    /// `None` when the claim is absent or not a number. Fractional values are
    /// floored.
    pub fn exp(&self) -> Option<i64> {
        let Value::Number(exp) = self.0.get("exp")? else {
            return None;
        };
        exp.as_i64().or_else(|| {
            exp.as_f64()
                .filter(|secs| secs.is_finite())
                .map(|secs| secs.floor() as i64)
        })
    }

    /// Expiry as a timestamp; `None` if missing or out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp()?, 0)
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub")?.as_str()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is missing")]
    MissingToken,

    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
}

/// Decode the payload segment of a `header.payload.signature` token.
///
/// Pure: no clock, no IO, no signature check.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DecodeError::MissingToken);
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(DecodeError::MalformedToken("token too large"));
    }

    let payload = token
        .split('.')
        .nth(1)
        .ok_or(DecodeError::MalformedToken("expected at least two segments"))?;

    let bytes =
        decode_segment(payload).ok_or(DecodeError::MalformedToken("payload is not base64"))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(Claims(map)),
        Ok(_) => Err(DecodeError::MalformedToken("payload is not a JSON object")),
        Err(_) => Err(DecodeError::MalformedToken("payload is not JSON")),
    }
}

// base64url is the wire format; the standard alphabet and padding are
// tolerated since some issuers emit them.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn decodes_payload_without_checking_signature() {
        let claims = decode(&token_with(&json!({"sub": "u-1", "exp": 1_700_000_000}))).unwrap();
        assert_eq!(claims.exp(), Some(1_700_000_000));
        assert_eq!(claims.subject(), Some("u-1"));
    }

    #[test]
    fn two_segments_are_enough() {
        let body = URL_SAFE_NO_PAD.encode(r#"{"exp":10}"#);
        let claims = decode(&format!("header.{body}")).unwrap();
        assert_eq!(claims.exp(), Some(10));
    }

    #[test]
    fn accepts_padded_standard_alphabet() {
        let body = STANDARD_NO_PAD.encode(r#"{"exp":12,"note":"??>"}"#);
        let claims = decode(&format!("h.{body}==.s")).unwrap();
        assert_eq!(claims.exp(), Some(12));
    }

    #[test]
    fn missing_and_malformed_tokens() {
        assert_eq!(decode(""), Err(DecodeError::MissingToken));
        assert_eq!(decode("   "), Err(DecodeError::MissingToken));
        assert!(matches!(decode("no-dots"), Err(DecodeError::MalformedToken(_))));
        assert!(matches!(decode(".."), Err(DecodeError::MalformedToken(_))));
        assert!(matches!(decode("a.!!!.c"), Err(DecodeError::MalformedToken(_))));

        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(matches!(decode(&format!("a.{not_json}.c")), Err(DecodeError::MalformedToken(_))));

        let array = URL_SAFE_NO_PAD.encode("[1,2]");
        assert_eq!(
            decode(&format!("a.{array}.c")),
            Err(DecodeError::MalformedToken("payload is not a JSON object"))
        );
    }

    #[test]
    fn oversized_token_is_rejected() {
        let huge = format!("a.{}.c", "A".repeat(MAX_TOKEN_LEN));
        assert_eq!(decode(&huge), Err(DecodeError::MalformedToken("token too large")));
    }

    #[test]
    fn non_numeric_exp_is_not_an_expiry() {
        let claims = decode(&token_with(&json!({"exp": "tomorrow"}))).unwrap();
        assert_eq!(claims.exp(), None);
        assert_eq!(claims.expires_at(), None);

        let claims = decode(&token_with(&json!({"exp": 99.9}))).unwrap();
        assert_eq!(claims.exp(), Some(99));

        let claims = decode(&token_with(&json!({"iat": 1}))).unwrap();
        assert_eq!(claims.exp(), None);
    }
}
