//! State shared between concurrently running fitness tasks.

use crate::core::models::candidate::Candidate;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A population list that many tasks may append to. Clones share the same list.
///
/// Insertion order reflects completion order.
#[derive(Debug, Clone, Default)]
pub struct Population {
    members: Arc<Mutex<Vec<Candidate>>>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, candidate: Candidate) {
        lock(&self.members).push(candidate);
    }

    pub fn len(&self) -> usize {
        lock(&self.members).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the current members.
    pub fn snapshot(&self) -> Vec<Candidate> {
        lock(&self.members).clone()
    }

    /// Removes and returns all members.
    pub fn drain(&self) -> Vec<Candidate> {
        std::mem::take(&mut *lock(&self.members))
    }

    pub fn contains_uid(&self, uid: &str) -> bool {
        lock(&self.members).iter().any(|c| c.uid == uid)
    }
}

/// Counter of failed attempts shared by the tasks of one run.
///
/// Chemistry failures increment it; successful insertions into a population decrement it.
#[derive(Debug, Clone, Default)]
pub struct RetryCounter {
    value: Arc<Mutex<i64>>,
}

impl RetryCounter {
    pub fn new(initial: i64) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn increment(&self) -> i64 {
        let mut value = lock(&self.value);
        *value += 1;
        *value
    }

    pub fn decrement(&self) -> i64 {
        let mut value = lock(&self.value);
        *value -= 1;
        *value
    }

    pub fn value(&self) -> i64 {
        *lock(&self.value)
    }
}
