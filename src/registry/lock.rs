// src/registry/lock.rs

//! Advisory, key-scoped mutual exclusion.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// Run a closure while holding the lock for `key`. Callers holding
/// different keys never wait on each other.
pub trait ScopedLock: Send + Sync + Debug {
    fn with_lock(&self, key: &str, f: &mut dyn FnMut());
}

/// In-process [`ScopedLock`] with one mutex per key. A key's mutex is
/// dropped once no caller holds or waits on it.
#[derive(Debug, Default)]
pub struct KeyedLock {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Forget `key` unless another caller still has its mutex. `lock` is the
    /// caller's own handle; the map holds the other reference.
    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let idle = Arc::strong_count(&lock) == 2;
        drop(lock);
        if idle {
            locks.remove(key);
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScopedLock for KeyedLock {
    fn with_lock(&self, key: &str, f: &mut dyn FnMut()) {
        let lock = self.lock_for(key);
        {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            f();
        }
        self.release(key, lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_key_is_serialised() {
        let lock = Arc::new(KeyedLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    lock.with_lock("session", &mut || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(lock.is_empty());
    }

    #[test]
    fn idle_keys_are_forgotten() {
        let lock = KeyedLock::new();
        for session in 0..100 {
            lock.with_lock(&format!("session-{session}"), &mut || {});
        }
        assert!(lock.is_empty());
    }

    #[test]
    fn key_in_use_is_kept() {
        let lock = KeyedLock::new();
        lock.with_lock("outer", &mut || {
            lock.with_lock("inner", &mut || {});
            assert_eq!(lock.len(), 1);
        });
        assert!(lock.is_empty());
    }

    #[test]
    fn closure_runs_once() {
        let lock = KeyedLock::new();
        let mut calls = 0;
        lock.with_lock("a", &mut || calls += 1);
        lock.with_lock("b", &mut || calls += 1);
        assert_eq!(calls, 2);
    }
}
