//! In-flight request coalescing.
//!
//! # Responsibilities
//! - At most one running producer per key within this process
//! - Fan a single result out to every concurrent caller for that key
//! - Remove the entry as soon as the producer settles
//!
//! # Design Decisions
//! - DashMap `entry()` makes check-then-insert atomic per key
//! - Producers run in their own task: a dropped caller never cancels them
//! - Entries carry a generation id so a finished producer only removes its own entry
//! - Nothing is retained after settlement; failures are never pinned

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};

/// The producer task ended without a value (it panicked or was aborted).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("in-flight producer aborted: {0}")]
pub struct ProducerAborted(pub String);

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, ProducerAborted>>>;

struct InflightEntry<T> {
    id: u64,
    result: SharedResult<T>,
}

/// Whether this caller started the producer or joined an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

/// A settled value together with how the caller obtained it.
#[derive(Debug, Clone)]
pub struct Coalesced<T> {
    pub value: T,
    pub role: Role,
}

/// Process-wide (per instance) map of key → pending result.
pub struct InflightCoalescer<T> {
    entries: Arc<DashMap<String, InflightEntry<T>>>,
    next_id: AtomicU64,
}

impl<T> InflightCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `producer` for `key`, or join the run already in progress.
    ///
    /// Every caller for the same in-flight key observes the same value.
    pub async fn acquire<F, Fut>(&self, key: &str, producer: F) -> Result<Coalesced<T>, ProducerAborted>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (result, role) = match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => (entry.get().result.clone(), Role::Follower),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = EntryGuard {
                    entries: Arc::clone(&self.entries),
                    key: key.to_string(),
                    id,
                };
                // The shard lock is held until `insert`, so the guard cannot
                // remove the entry before it exists.
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    producer().await
                });
                let result = async move {
                    handle
                        .await
                        .map_err(|e| ProducerAborted(e.to_string()))
                }
                .boxed()
                .shared();
                slot.insert(InflightEntry {
                    id,
                    result: result.clone(),
                });
                (result, Role::Leader)
            }
        };

        if role == Role::Follower {
            tracing::debug!(key = %key, "Joined in-flight upstream fetch");
        }

        let value = result.await?;
        Ok(Coalesced { value, role })
    }

    /// Number of keys currently in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl<T> Default for InflightCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard owned by the producer task; removes the entry however the task ends.
struct EntryGuard<T> {
    entries: Arc<DashMap<String, InflightEntry<T>>>,
    key: String,
    id: u64,
}

impl<T> Drop for EntryGuard<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.entries.remove_if(&self.key, |_, entry| entry.id == id);
    }
}
