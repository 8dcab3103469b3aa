//! OAuth state management for CSRF protection.
//!
//! Each connect request gets a random state value that is sent to the provider
//! and mirrored in an httpOnly cookie. The callback is accepted only if the
//! returned state matches the cookie and the server still holds an unexpired
//! entry for it. Entries are single-use: validation removes them whatever the
//! outcome.

use crate::error::CsrfError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Bytes of randomness per state value (256 bits)
const STATE_BYTES: usize = 32;

/// A pending authorization request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthState {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory state store with expiry
#[derive(Clone)]
pub struct StateStore {
    states: Arc<Mutex<HashMap<String, OAuthState>>>,
    ttl: Duration,
}

impl StateStore {
    /// Create a new state store
    ///
    /// # Arguments
    /// * `ttl_seconds` - How long states remain valid (default: 600 = 10 minutes)
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// State lifetime, also used as the cookie Max-Age
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a new state value and remember it until it expires
    pub fn issue(&self) -> OAuthState {
        let mut bytes = [0u8; STATE_BYTES];
        OsRng.fill_bytes(&mut bytes);

        let issued_at = Utc::now();
        let state = OAuthState {
            value: URL_SAFE_NO_PAD.encode(bytes),
            issued_at,
            expires_at: issued_at + self.ttl,
        };

        let mut states = self.states.lock().unwrap();
        states.insert(state.value.clone(), state.clone());

        state
    }

    /// Validate the state returned by the provider against the session cookie.
    ///
    /// The pending entry is removed before any comparison, so a given value can
    /// be presented at most once even under concurrent callbacks.
    pub fn validate_and_consume(
        &self,
        cookie_value: Option<&str>,
        received: &str,
    ) -> Result<(), CsrfError> {
        let cookie_value = cookie_value.ok_or(CsrfError::MissingState)?;

        let entry = {
            let mut states = self.states.lock().unwrap();
            states.remove(cookie_value)
        }
        .ok_or(CsrfError::MissingState)?;

        if entry.value != received {
            return Err(CsrfError::Mismatch);
        }

        if Utc::now() > entry.expires_at {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }

    /// Clean up expired states (should be called periodically)
    pub fn cleanup_expired(&self) {
        let mut states = self.states.lock().unwrap();
        let now = Utc::now();

        states.retain(|_, entry| now <= entry.expires_at);
    }

    /// Get count of pending states
    pub fn count(&self) -> usize {
        self.states.lock().unwrap().len()
    }
}

/// Background task to periodically clean up expired states
pub async fn run_state_cleanup(store: StateStore, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        store.cleanup_expired();
        tracing::debug!(pending = store.count(), "OAuth state cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_validate_state() {
        let store = StateStore::new(600);

        let state = store.issue();
        assert_eq!(state.expires_at - state.issued_at, Duration::seconds(600));

        let result = store.validate_and_consume(Some(&state.value), &state.value);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_state_values_are_unguessable() {
        let store = StateStore::new(600);

        let a = store.issue();
        let b = store.issue();
        assert_ne!(a.value, b.value);
        // 32 bytes, base64url without padding
        assert_eq!(a.value.len(), 43);
        assert!(a
            .value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_state_is_single_use() {
        let store = StateStore::new(600);

        let state = store.issue();

        assert!(store
            .validate_and_consume(Some(&state.value), &state.value)
            .is_ok());

        for _ in 0..3 {
            assert_eq!(
                store.validate_and_consume(Some(&state.value), &state.value),
                Err(CsrfError::MissingState)
            );
        }
    }

    #[test]
    fn test_missing_cookie_rejected() {
        let store = StateStore::new(600);
        let state = store.issue();

        let result = store.validate_and_consume(None, &state.value);
        assert_eq!(result, Err(CsrfError::MissingState));
    }

    #[test]
    fn test_unknown_state_rejected() {
        let store = StateStore::new(600);

        let result = store.validate_and_consume(Some("never-issued"), "never-issued");
        assert_eq!(result, Err(CsrfError::MissingState));
    }

    #[test]
    fn test_mismatch_consumes_state() {
        let store = StateStore::new(600);
        let state = store.issue();

        let result = store.validate_and_consume(Some(&state.value), "x");
        assert_eq!(result, Err(CsrfError::Mismatch));

        // Fail-closed: the correct value no longer works either
        let retry = store.validate_and_consume(Some(&state.value), &state.value);
        assert_eq!(retry, Err(CsrfError::MissingState));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_expired_state_rejected() {
        let store = StateStore::new(1);

        let state = store.issue();

        std::thread::sleep(std::time::Duration::from_millis(1100));

        let result = store.validate_and_consume(Some(&state.value), &state.value);
        assert_eq!(result, Err(CsrfError::Expired));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let store = StateStore::new(1);

        store.issue();
        store.issue();

        assert_eq!(store.count(), 2);

        std::thread::sleep(std::time::Duration::from_millis(1100));

        store.cleanup_expired();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_concurrent_consume_accepts_once() {
        let store = StateStore::new(600);
        let state = store.issue();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let value = state.value.clone();
                std::thread::spawn(move || store.validate_and_consume(Some(&value), &value))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(accepted, 1);
    }
}
