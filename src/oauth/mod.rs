//! Facebook Page connect flow.
//!
//! 1. User clicks "Connect Facebook" in the UI
//! 2. GET /api/auth/facebook/connect issues a CSRF state, sets the state
//!    cookie and redirects to the consent dialog
//! 3. User grants page permissions on facebook.com
//! 4. Facebook redirects to /api/auth/facebook/callback
//! 5. State is validated and consumed, then the code is exchanged for a
//!    short-lived token, a long-lived token and finally a page credential
//! 6. The page credential is stored encrypted for the owner
//!
//! The HTTP surface lives in `api::connect`; this module holds the pieces it
//! drives.

mod exchange;
pub mod provider;
mod state_store;

pub(crate) use exchange::GraphErrorEnvelope;
pub use exchange::{AccessToken, ExchangeClient, ExchangeState};
pub use provider::FacebookProvider;
pub use state_store::{run_state_cleanup, OAuthState, StateStore};
