use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::claims::{DecodeError, decode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("token carries no usable expiry")]
    MissingExpiry,

    #[error("token has expired")]
    Expired,
}

/// Expiry check for bearer tokens.
///
/// `leeway` shortens the validity window so a token about to expire is
/// treated as already expired. Zero by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    leeway: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpiryPolicy {
    pub fn new() -> Self {
        Self {
            leeway: Duration::zero(),
        }
    }

    /// Negative leeway is clamped to zero.
    pub fn with_leeway(leeway: Duration) -> Self {
        Self {
            leeway: leeway.max(Duration::zero()),
        }
    }

    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Check a token and return its expiry when still valid.
    pub fn check(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TokenValidationError> {
        let claims = decode(token)?;
        let expires_at = claims
            .expires_at()
            .ok_or(TokenValidationError::MissingExpiry)?;

        let effective_now = now
            .checked_add_signed(self.leeway)
            .ok_or(TokenValidationError::Expired)?;

        if effective_now < expires_at {
            Ok(expires_at)
        } else {
            Err(TokenValidationError::Expired)
        }
    }

    /// Total boolean verdict; every failure is `false`.
    pub fn is_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.check(token, now).is_ok()
    }

    /// Like [`is_valid`](Self::is_valid) for an optional (possibly absent) token.
    pub fn is_present_and_valid(&self, token: Option<&str>, now: DateTime<Utc>) -> bool {
        token.is_some_and(|t| self.is_valid(t, now))
    }
}

/// Validity with the default (zero-leeway) policy.
pub fn is_valid(token: &str, now: DateTime<Utc>) -> bool {
    ExpiryPolicy::new().is_valid(token, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use proptest::prelude::*;

    fn token_expiring_at(exp: i64) -> String {
        let body = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u","exp":{exp}}}"#));
        format!("eyJhbGciOiJIUzI1NiJ9.{body}.sig")
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    #[test]
    fn future_expiry_is_valid() {
        let token = token_expiring_at(now().timestamp() + 3600);
        assert!(is_valid(&token, now()));
    }

    #[test]
    fn past_expiry_is_invalid() {
        let token = token_expiring_at(now().timestamp() - 3600);
        assert!(!is_valid(&token, now()));
        assert_eq!(
            ExpiryPolicy::new().check(&token, now()),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn expiry_instant_itself_is_invalid() {
        let token = token_expiring_at(now().timestamp());
        assert!(!is_valid(&token, now()));
    }

    #[test]
    fn garbage_is_invalid() {
        for token in ["", "abc", ".", "a.b", "a.%%%.c", "a.e30.c"] {
            assert!(!is_valid(token, now()), "{token:?} should be invalid");
        }
        assert_eq!(
            ExpiryPolicy::new().check("a.e30.c", now()),
            Err(TokenValidationError::MissingExpiry)
        );
        assert!(!ExpiryPolicy::new().is_present_and_valid(None, now()));
    }

    #[test]
    fn leeway_shortens_the_window() {
        let token = token_expiring_at(now().timestamp() + 30);
        assert!(ExpiryPolicy::new().is_valid(&token, now()));
        assert!(!ExpiryPolicy::with_leeway(Duration::seconds(60)).is_valid(&token, now()));
        assert_eq!(
            ExpiryPolicy::with_leeway(Duration::seconds(-60)).leeway(),
            Duration::zero()
        );
    }

    #[test]
    fn far_future_now_does_not_panic() {
        let token = token_expiring_at(now().timestamp() + 3600);
        let policy = ExpiryPolicy::with_leeway(Duration::days(1));
        assert!(!policy.is_valid(&token, DateTime::<Utc>::MAX_UTC));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: the verdict is total for arbitrary input.
        #[test]
        fn is_valid_never_panics(token in ".{0,256}") {
            let _ = is_valid(&token, now());
        }

        /// Property: dotted garbage with arbitrary segments never panics either.
        #[test]
        fn dotted_segments_never_panic(
            segments in prop::collection::vec("[A-Za-z0-9_=+/-]{0,64}", 0..5)
        ) {
            let token = segments.join(".");
            let _ = is_valid(&token, now());
        }

        /// Property: validity flips exactly at the expiry second.
        #[test]
        fn validity_matches_expiry_offset(offset in -100_000i64..100_000i64) {
            let token = token_expiring_at(now().timestamp() + offset);
            prop_assert_eq!(is_valid(&token, now()), offset > 0);
        }
    }
}
