//! Who is signed in, passed explicitly to whatever needs it.
//!
//! Observers hold a [`Subscription`]; dropping it (or calling
//! [`Subscription::release`]) unregisters them.

use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::config::ProfileConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not signed in; add a [profile] section to .gitales.toml or pass a handle")]
    SignedOut,

    #[error("Profile has no GitHub username; set profile.github_username")]
    MissingHandle,

    // only reachable through `Subscription::changed`
    #[error("Session context was dropped")]
    #[allow(dead_code)]
    Closed,
}

/// The signed-in member's profile record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub github_username: Option<String>,
    pub batch: Option<String>,
}

impl Identity {
    /// Build an identity from the `[profile]` config section.
    /// Returns None when every field is blank.
    pub fn from_profile(profile: &ProfileConfig) -> Option<Identity> {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let identity = Identity {
            name: clean(&profile.name),
            github_username: clean(&profile.github_username),
            batch: clean(&profile.batch),
        };
        if identity == Identity::default() {
            None
        } else {
            Some(identity)
        }
    }
}

/// Current session state shared by everything that needs the identity.
///
/// The CLI signs in once from config and only checks for changes while a
/// dashboard loads; `sign_in`, `sign_out` and `Subscription::changed` serve
/// longer-lived front ends, hence the `dead_code` allowances on them.
pub struct SessionContext {
    state: watch::Sender<Option<Identity>>,
}

impl SessionContext {
    pub fn new(initial: Option<Identity>) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    #[allow(dead_code)]
    pub fn sign_in(&self, identity: Identity) {
        info!(handle = ?identity.github_username, "signed in");
        self.state.send_replace(Some(identity));
    }

    #[allow(dead_code)]
    pub fn sign_out(&self) {
        info!("signed out");
        self.state.send_replace(None);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            state: self.state.subscribe(),
        }
    }

    #[allow(dead_code)]
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// GitHub handle of the signed-in member.
    pub fn require_handle(&self) -> Result<String, SessionError> {
        let identity = self.current().ok_or(SessionError::SignedOut)?;
        identity.github_username.ok_or(SessionError::MissingHandle)
    }
}

/// A registered observer of session changes.
pub struct Subscription {
    state: watch::Receiver<Option<Identity>>,
}

impl Subscription {
    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    /// Whether a sign-in or sign-out happened since the last observed state.
    pub fn has_changed(&self) -> bool {
        self.state.has_changed().unwrap_or(false)
    }

    /// Wait for the next sign-in or sign-out and return the new state.
    #[allow(dead_code)]
    pub async fn changed(&mut self) -> Result<Option<Identity>, SessionError> {
        self.state
            .changed()
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(self.state.borrow_and_update().clone())
    }

    /// Unregister this observer.
    pub fn release(self) {}
}
