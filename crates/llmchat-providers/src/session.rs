//! HTTP session lifecycle and scoped provider acquisition.
//!
//! A provider owns one [`HttpSession`]. The session moves through
//! `Uninitialized → Initialized → Closed` and can be reopened after closing.
//! [`ProviderScope`] ties `initialize`/`close` to a lexical scope.

use std::future::Future;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::traits::LlmProvider;

// ─────────────────────────────────────────────
// HttpSession
// ─────────────────────────────────────────────

/// Lifecycle state of a provider's HTTP session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Closed,
}

struct Slot {
    client: Option<reqwest::Client>,
    state: SessionState,
}

/// A lazily created, reusable `reqwest::Client` owned by one provider.
pub struct HttpSession {
    label: &'static str,
    timeout: Option<Duration>,
    slot: Mutex<Slot>,
}

impl HttpSession {
    pub fn new(label: &'static str, timeout: Option<Duration>) -> Self {
        HttpSession {
            label,
            timeout,
            slot: Mutex::new(Slot {
                client: None,
                state: SessionState::Uninitialized,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// The open client, creating it first if the session is not open.
    pub fn client(&self) -> Result<reqwest::Client> {
        let mut slot = self.lock();
        if let Some(client) = &slot.client {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::api(format!("failed to build HTTP client: {e}")))?;

        debug!(provider = self.label, "HTTP session opened");
        slot.client = Some(client.clone());
        slot.state = SessionState::Initialized;
        Ok(client)
    }

    /// Release the client. No-op unless the session is open.
    pub fn close(&self) {
        let mut slot = self.lock();
        if slot.client.take().is_some() {
            slot.state = SessionState::Closed;
            debug!(provider = self.label, "HTTP session closed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        if self.lock().client.is_some() {
            warn!(
                provider = self.label,
                "HTTP session dropped while open; call close() when done"
            );
        }
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("provider", &self.label)
            .field("state", &self.state())
            .finish()
    }
}

// ─────────────────────────────────────────────
// Scoped acquisition
// ─────────────────────────────────────────────

/// Guard that initializes a provider on entry and closes it when dropped.
///
/// Closing runs on every exit path, including early returns, panics and
/// cancellation of the enclosing future.
pub struct ProviderScope<'a, P: LlmProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: LlmProvider + ?Sized> ProviderScope<'a, P> {
    /// Run `initialize` (credential check included) and hand back the guard.
    pub async fn enter(provider: &'a P) -> Result<Self> {
        provider.initialize().await?;
        Ok(ProviderScope { provider })
    }
}

impl<P: LlmProvider + ?Sized> Deref for ProviderScope<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.provider
    }
}

impl<P: LlmProvider + ?Sized> Drop for ProviderScope<'_, P> {
    fn drop(&mut self) {
        self.provider.close();
    }
}

/// Closure form of [`ProviderScope`]: initialize, run `body`, always close.
pub async fn with_provider<'a, P, F, Fut, T, E>(
    provider: &'a P,
    body: F,
) -> std::result::Result<T, E>
where
    P: LlmProvider + ?Sized,
    F: FnOnce(&'a P) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<LlmError>,
{
    let scope = ProviderScope::enter(provider).await?;
    let result = body(provider).await;
    drop(scope);
    result
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
