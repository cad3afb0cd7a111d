//! Lock helpers shared by the in-memory clients and recorders.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Acquire a `Mutex` even when a previous holder panicked.
///
/// A panicking test double must not hide the original failure behind a
/// poisoned-lock panic on the next call.
pub trait IgnoreLock<T> {
    /// Lock the mutex, recovering the guard from a poisoned lock.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnoreLock<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let shared = Arc::new(Mutex::new(vec![1_u32]));
        let clone = Arc::clone(&shared);
        let joined = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(shared.is_poisoned());

        shared.lock_ignore_poison().push(2);
        assert_eq!(*shared.lock_ignore_poison(), vec![1, 2]);
    }
}
