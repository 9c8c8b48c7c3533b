//! Thread-safe membership set of live subscribers

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::subscriber::{Subscriber, SubscriberId};

/// Set of subscribers currently eligible for broadcasts
///
/// Every operation takes the single lock for one map operation only; the lock
/// is never held across an `.await` or any I/O.
#[derive(Debug, Default)]
pub struct Registry {
    members: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // The map is left consistent by every critical section, so a panic in
    // another thread does not invalidate it.
    fn members(&self) -> MutexGuard<'_, HashMap<SubscriberId, Subscriber>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, subscriber: Subscriber) {
        self.members().insert(subscriber.id(), subscriber);
    }

    /// Remove a subscriber. Removing an absent subscriber is a no-op.
    ///
    /// Returns whether the subscriber was a member.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.members().remove(&id).is_some()
    }

    /// Copy of the current members, taken under the lock.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        let members = self.members();
        if members.is_empty() {
            return Vec::new();
        }
        members.values().cloned().collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }
}
