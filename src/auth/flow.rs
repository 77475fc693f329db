//! Explicit state machines for the two login handshakes.
//!
//! Each handshake spans two HTTP requests (login, then callback). A
//! [`Handshake`] tracks one request's progress and rejects out-of-order steps.
//!
//! ```text
//! Discogs:  Start -> AwaitingRequestToken -> RedirectedToProvider
//!           AwaitingVerifier -> Exchanged -> IdentityFetched -> SessionEstablished
//! Spotify:  Start -> StateIssued -> RedirectedToProvider
//!           AwaitingCallback -> StateVerified -> CodeExchanged -> SessionEstablished
//! ```
//!
//! Any non-terminal state may move to `Failed`.

use crate::error::AppError;
use std::fmt::Debug;
use tracing::{debug, warn};

pub trait FlowState: Copy + Eq + Debug {
    /// Flow name used in logs and errors
    const FLOW: &'static str;

    fn failed() -> Self;

    fn is_terminal(self) -> bool;

    /// Allowed forward transitions (transitions to `Failed` are handled generically).
    fn can_advance_to(self, next: Self) -> bool;
}

/// Three-legged OAuth 1.0a handshake with Discogs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscogsState {
    Start,
    AwaitingRequestToken,
    RedirectedToProvider,
    AwaitingVerifier,
    Exchanged,
    IdentityFetched,
    SessionEstablished,
    Failed,
}

impl FlowState for DiscogsState {
    const FLOW: &'static str = "discogs";

    fn failed() -> Self {
        DiscogsState::Failed
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            DiscogsState::RedirectedToProvider
                | DiscogsState::SessionEstablished
                | DiscogsState::Failed
        )
    }

    fn can_advance_to(self, next: Self) -> bool {
        use DiscogsState::*;
        matches!(
            (self, next),
            (Start, AwaitingRequestToken)
                | (AwaitingRequestToken, RedirectedToProvider)
                | (AwaitingVerifier, Exchanged)
                | (Exchanged, IdentityFetched)
                | (IdentityFetched, SessionEstablished)
        )
    }
}

/// OAuth 2.0 authorization-code handshake with Spotify
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpotifyState {
    Start,
    StateIssued,
    RedirectedToProvider,
    AwaitingCallback,
    StateVerified,
    CodeExchanged,
    SessionEstablished,
    Failed,
}

impl FlowState for SpotifyState {
    const FLOW: &'static str = "spotify";

    fn failed() -> Self {
        SpotifyState::Failed
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            SpotifyState::RedirectedToProvider
                | SpotifyState::SessionEstablished
                | SpotifyState::Failed
        )
    }

    fn can_advance_to(self, next: Self) -> bool {
        use SpotifyState::*;
        matches!(
            (self, next),
            (Start, StateIssued)
                | (StateIssued, RedirectedToProvider)
                | (AwaitingCallback, StateVerified)
                | (StateVerified, CodeExchanged)
                | (CodeExchanged, SessionEstablished)
        )
    }
}

/// Progress of one handshake request
#[derive(Debug)]
pub struct Handshake<S: FlowState> {
    state: S,
}

impl<S: FlowState> Handshake<S> {
    /// Begin (or resume, for callbacks) at `initial`.
    pub fn begin(initial: S) -> Self {
        debug!(flow = S::FLOW, state = ?initial, "Handshake step");
        Self { state: initial }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> S {
        self.state
    }

    pub fn advance(&mut self, next: S) -> Result<(), AppError> {
        let allowed = if next == S::failed() {
            !self.state.is_terminal()
        } else {
            self.state.can_advance_to(next)
        };

        if !allowed {
            return Err(AppError::InvalidTransition {
                flow: S::FLOW,
                from: format!("{:?}", self.state),
                to: format!("{:?}", next),
            });
        }

        debug!(flow = S::FLOW, from = ?self.state, to = ?next, "Handshake step");
        self.state = next;
        Ok(())
    }

    /// Record a failure. Already-terminal handshakes keep their state.
    pub fn fail(&mut self, err: &AppError) {
        warn!(flow = S::FLOW, state = ?self.state, error = %err, "Handshake failed");
        if !self.state.is_terminal() {
            self.state = S::failed();
        }
    }
}
