//! Time-bounded memo for an option's resolved value

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

struct Entry<T> {
    value: T,
    /// `None` never expires
    expires_at: Option<Instant>,
}

struct Slot<T> {
    entry: Option<Entry<T>>,
    /// Bumped by every `put` and `invalidate`
    generation: u64,
}

/// Holds one value for a fixed duration after it was stored
///
/// `Duration::MAX` keeps values until [`Cache::invalidate`]. The lock is never
/// held while a value is being computed.
pub struct Cache<T> {
    duration: Duration,
    slot: RwLock<Slot<T>>,
}

impl<T: Clone> Cache<T> {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            slot: RwLock::new(Slot {
                entry: None,
                generation: 0,
            }),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The stored value if it has not expired
    pub fn fresh(&self) -> Option<T> {
        self.lookup().0
    }

    pub fn put(&self, value: T) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        self.store(&mut slot, value);
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
    }

    /// A fresh value, or the producer's result which is then stored
    ///
    /// Failures are returned without touching the stored entry. A result is
    /// returned but not stored if a `put` or `invalidate` happened while the
    /// producer was running.
    pub async fn get_or_compute<E, Fut>(&self, producer: impl FnOnce() -> Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let (cached, started) = self.lookup();
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = producer().await?;

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.generation == started {
            self.store(&mut slot, value.clone());
        } else {
            log::trace!("Cache changed during compute, result not stored");
        }
        Ok(value)
    }

    fn lookup(&self) -> (Option<T>, u64) {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let value = slot.entry.as_ref().and_then(|entry| match entry.expires_at {
            Some(expires_at) if Instant::now() >= expires_at => None,
            _ => Some(entry.value.clone()),
        });
        (value, slot.generation)
    }

    fn store(&self, slot: &mut Slot<T>, value: T) {
        let expires_at = Instant::now().checked_add(self.duration);
        slot.entry = Some(Entry { value, expires_at });
        slot.generation = slot.generation.wrapping_add(1);
    }
}
