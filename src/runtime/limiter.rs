//! Concurrency limiter - caps how many tools run at once
//!
//! Backed by a tokio [`Semaphore`]. The permit is held for the whole tool
//! invocation and released on drop, whatever the outcome. `None` means
//! unbounded: every step in a wave runs at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::WaveError;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Option<Arc<Semaphore>>,
    bound: Option<usize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyLimiter {
    /// Build a limiter; a bound of zero is a configuration error
    pub fn new(max_concurrent: Option<usize>) -> Result<Self, WaveError> {
        let semaphore = match max_concurrent {
            None => None,
            Some(0) => {
                return Err(WaveError::Configuration {
                    reason: "max_concurrent must be at least 1".to_string(),
                })
            }
            Some(n) if n > Semaphore::MAX_PERMITS => {
                return Err(WaveError::Configuration {
                    reason: format!(
                        "max_concurrent {n} exceeds the limit of {}",
                        Semaphore::MAX_PERMITS
                    ),
                })
            }
            Some(n) => Some(Arc::new(Semaphore::new(n))),
        };

        Ok(Self {
            semaphore,
            bound: max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn unbounded() -> Self {
        Self {
            semaphore: None,
            bound: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[inline]
    pub fn bound(&self) -> Option<usize> {
        self.bound
    }

    /// Wait for a slot
    pub async fn acquire(&self) -> Permit {
        let permit = match &self.semaphore {
            // The semaphore is never closed, so acquisition only fails on shutdown
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Permit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Tools currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest `in_flight` observed since creation
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Slot held while a tool runs
#[derive(Debug)]
pub struct Permit {
    _permit: Option<OwnedSemaphorePermit>,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bound_is_rejected() {
        let err = ConcurrencyLimiter::new(Some(0)).unwrap_err();
        assert!(matches!(err, WaveError::Configuration { .. }));
    }

    #[test]
    fn bound_is_reported() {
        assert_eq!(ConcurrencyLimiter::new(Some(3)).unwrap().bound(), Some(3));
        assert_eq!(ConcurrencyLimiter::new(None).unwrap().bound(), None);
    }

    #[tokio::test]
    async fn permits_track_in_flight() {
        let limiter = ConcurrencyLimiter::new(Some(2)).unwrap();

        let a = limiter.acquire().await;
        let b = limiter.acquire().await;
        assert_eq!(limiter.in_flight(), 2);

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        drop(b);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.peak(), 2);
    }

    #[tokio::test]
    async fn third_acquire_waits_for_release() {
        let limiter = ConcurrencyLimiter::new(Some(2)).unwrap();
        let a = limiter.acquire().await;
        let _b = limiter.acquire().await;

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(a);
        let _c = waiter.await.unwrap();
        assert_eq!(limiter.in_flight(), 2);
        assert_eq!(limiter.peak(), 2);
    }

    #[tokio::test]
    async fn unbounded_never_waits() {
        let limiter = ConcurrencyLimiter::unbounded();
        let permits: Vec<Permit> = futures::future::join_all((0..64).map(|_| limiter.acquire())).await;
        assert_eq!(limiter.in_flight(), 64);
        drop(permits);
        assert_eq!(limiter.in_flight(), 0);
    }
}
