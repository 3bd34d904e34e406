//! Pending-request tracker.
//!
//! Registers in-flight requests by [`Fingerprint`]. Registering a request whose
//! fingerprint is already in flight aborts the older one first, so at most one
//! identical request runs at a time.
//!
//! Each registration yields a [`PendingTicket`]. Releasing the ticket (explicitly
//! through [`PendingRequests::remove`] or by dropping it) deletes the entry, but only
//! if the entry still belongs to that ticket: a superseded request that settles late
//! never removes the entry of the request that replaced it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::AbortHandle;
use tracing::debug;

use crate::FetchConfig;

/// Deterministic key of a request: method, resolved URL and serialized body.
///
/// The query string is part of the URL, so `params` are covered too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a resolved configuration.
    #[must_use]
    pub fn of(config: &FetchConfig) -> Self {
        let body = config
            .body()
            .map(|body| String::from_utf8_lossy(body))
            .unwrap_or_default();
        Self(format!("{}&{}&{body}", config.method(), config.url()))
    }

    /// The fingerprint as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct Entry {
    id: u64,
    abort: AbortHandle,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    entries: HashMap<Fingerprint, Entry>,
}

/// Registry of in-flight requests.
///
/// Cloning is cheap and clones share the same registry. Each `Fetcher` owns one, so
/// independent pipelines never interfere.
#[derive(Debug, Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<Registry>>,
}

impl PendingRequests {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request.
    ///
    /// Aborts the in-flight request with the same fingerprint, if any, then stores the
    /// ticket and the abort registration on the configuration. A configuration that was
    /// already registered releases its previous ticket first.
    pub fn add(&self, config: &mut FetchConfig) {
        self.remove(config);

        let fingerprint = Fingerprint::of(config);
        let (handle, registration) = AbortHandle::new_pair();

        let id = {
            let mut registry = self.lock();
            if let Some(previous) = registry.entries.remove(&fingerprint) {
                previous.abort.abort();
                debug!(%fingerprint, "aborted superseded request");
            }
            registry.next_id += 1;
            let id = registry.next_id;
            registry.entries.insert(
                fingerprint.clone(),
                Entry {
                    id,
                    abort: handle,
                },
            );
            id
        };

        debug!(%fingerprint, id, "registered pending request");
        config.set_pending(
            PendingTicket {
                registry: self.clone(),
                fingerprint,
                id,
                released: false,
            },
            registration,
        );
    }

    /// Release the registration held by a configuration.
    ///
    /// Idempotent: a configuration without a ticket, or whose entry was already
    /// superseded, is left as is.
    pub fn remove(&self, config: &mut FetchConfig) {
        if let Some(ticket) = config.take_pending() {
            ticket.release();
        }
    }

    /// Returns `true` if a request with this fingerprint is in flight.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().entries.contains_key(fingerprint)
    }

    /// Number of in-flight requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if no request is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn release(&self, fingerprint: &Fingerprint, id: u64) -> bool {
        let mut registry = self.lock();
        let owned = registry
            .entries
            .get(fingerprint)
            .is_some_and(|entry| entry.id == id);
        if owned {
            registry.entries.remove(fingerprint);
        }
        owned
    }
}

/// Registration of one request in a [`PendingRequests`] registry.
///
/// The entry is released exactly once: explicitly with [`PendingTicket::release`], or
/// when the ticket is dropped.
#[derive(Debug)]
pub struct PendingTicket {
    registry: PendingRequests,
    fingerprint: Fingerprint,
    id: u64,
    released: bool,
}

impl PendingTicket {
    /// Fingerprint this ticket was registered under.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Release the registration.
    pub fn release(mut self) {
        self.release_entry();
    }

    fn release_entry(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.registry.release(&self.fingerprint, self.id) {
            debug!(fingerprint = %self.fingerprint, id = self.id, "released pending request");
        }
    }
}

impl Drop for PendingTicket {
    fn drop(&mut self) {
        self.release_entry();
    }
}
