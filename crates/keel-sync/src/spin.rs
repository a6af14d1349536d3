//! The fast-polling spin lock.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use keel_core::{SyncError, Timeout};

use crate::config::PollConfig;

/// A non-reentrant spin lock protecting a value of type `T`.
///
/// Acquisition busy-polls an atomic flag. Locking twice from the same
/// thread without dropping the first guard never succeeds; with an infinite
/// timeout it spins forever.
pub struct FastPollingMutex<T: ?Sized> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

/// Exclusive access to the data behind a [`FastPollingMutex`].
///
/// Dropping the guard releases the lock.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct FastPollingMutexGuard<'a, T: ?Sized + 'a> {
    mutex: &'a FastPollingMutex<T>,
}

// SAFETY: the `locked` flag serialises every access to `data`, so moving the
// mutex to another thread only requires `T: Send`.
unsafe impl<T: ?Sized + Send> Send for FastPollingMutex<T> {}
// SAFETY: shared references only reach `data` through a guard, and at most
// one guard exists at a time.
unsafe impl<T: ?Sized + Send> Sync for FastPollingMutex<T> {}

impl<T> FastPollingMutex<T> {
    /// Create an unlocked mutex holding `data`.
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Consume the mutex and return the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> FastPollingMutex<T> {
    /// Acquire the lock, spinning until it is available.
    pub fn lock(&self) -> FastPollingMutexGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.is_locked() {
                std::hint::spin_loop();
            }
        }
        FastPollingMutexGuard { mutex: self }
    }

    /// Make a single attempt to acquire the lock.
    pub fn try_lock(&self) -> Option<FastPollingMutexGuard<'_, T>> {
        if self.try_acquire() {
            Some(FastPollingMutexGuard { mutex: self })
        } else {
            None
        }
    }

    /// Acquire the lock, giving up once `timeout` expires.
    pub fn lock_timeout(
        &self,
        timeout: Timeout,
    ) -> Result<FastPollingMutexGuard<'_, T>, SyncError> {
        self.lock_with(&PollConfig::with_timeout(timeout))
    }

    /// Acquire the lock following `config`'s timeout and sleep policy.
    ///
    /// At least one acquisition attempt is always made, so
    /// [`Timeout::NO_WAIT`] behaves like [`try_lock`](Self::try_lock).
    pub fn lock_with(
        &self,
        config: &PollConfig,
    ) -> Result<FastPollingMutexGuard<'_, T>, SyncError> {
        let start = Instant::now();
        let deadline = config.timeout.deadline_from(start);
        loop {
            if self.try_acquire() {
                return Ok(FastPollingMutexGuard { mutex: self });
            }
            let now = Instant::now();
            if let Some(deadline) = deadline {
                if now >= deadline {
                    return Err(SyncError::Timeout {
                        waited: now - start,
                    });
                }
            }
            match config.sleep {
                Some(sleep) => std::thread::sleep(sleep),
                None => std::hint::spin_loop(),
            }
        }
    }

    /// Whether the lock is currently held. A snapshot only.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Mutable access without locking; `&mut self` proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// One acquisition attempt. The strong exchange only fails if the
    /// flag is actually set.
    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl<T: Default> Default for FastPollingMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for FastPollingMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastPollingMutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for FastPollingMutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized> Deref for FastPollingMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a guard exists only while `locked` is held by its creator.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for FastPollingMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above; the guard is unique, so the borrow is exclusive.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for FastPollingMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lock_then_modify() {
        let mutex = FastPollingMutex::new(vec![1, 2, 3]);
        mutex.lock().push(4);
        assert_eq!(*mutex.lock(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn guard_drop_releases() {
        let mutex = FastPollingMutex::new(0u32);
        {
            let mut guard = mutex.lock();
            *guard = 7;
            assert!(mutex.is_locked());
        }
        assert!(!mutex.is_locked());
        assert_eq!(*mutex.lock(), 7);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let mutex = FastPollingMutex::new(());
        let _guard = mutex.lock();
        assert!(mutex.try_lock().is_none());
    }

    #[test]
    fn no_wait_times_out_immediately_when_held() {
        let mutex = FastPollingMutex::new(());
        let _guard = mutex.lock();
        let err = mutex.lock_timeout(Timeout::NO_WAIT).unwrap_err();
        assert!(matches!(err, SyncError::Timeout { .. }));
    }

    #[test]
    fn finite_timeout_expires_with_sleep() {
        let mutex = FastPollingMutex::new(());
        let _guard = mutex.lock();
        let config =
            PollConfig::with_timeout(Timeout::millis(5)).sleeping(Duration::from_micros(200));
        match mutex.lock_with(&config) {
            Err(SyncError::Timeout { waited }) => assert!(waited >= Duration::from_millis(5)),
            Ok(_) => panic!("lock acquired while held"),
        };
    }

    #[test]
    fn no_wait_succeeds_when_free() {
        let mutex = FastPollingMutex::new(1u8);
        assert_eq!(*mutex.lock_timeout(Timeout::NO_WAIT).unwrap(), 1);
    }

    #[test]
    fn single_attempts_on_a_free_lock_always_succeed() {
        let mutex = FastPollingMutex::new(0u32);
        let no_wait = PollConfig::with_timeout(Timeout::NO_WAIT);
        for _ in 0..10_000 {
            *mutex.try_lock().expect("free lock refused by try_lock") += 1;
            *mutex.lock_with(&no_wait).expect("free lock refused with NO_WAIT") += 1;
        }
        assert_eq!(*mutex.lock(), 20_000);
        assert!(!mutex.is_locked());
    }

    #[test]
    fn contended_increments_are_not_lost() {
        let mutex = Arc::new(FastPollingMutex::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&mutex);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *m.lock() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*mutex.lock(), 8000);
    }

    #[test]
    fn mutex_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FastPollingMutex<Vec<u8>>>();
    }
}
