use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// One mutex per variant path, created on demand and dropped once no caller
/// holds or waits on it.
#[derive(Default)]
pub struct VariantLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl VariantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`. Callers with different keys
    /// proceed in parallel. The table entry is released even if `f` panics.
    pub fn with_lock<R>(&self, key: &Path, f: impl FnOnce() -> R) -> R {
        let entry = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.to_path_buf()).or_default())
        };
        let release = Release {
            table: self,
            key,
            entry,
        };

        let _guard = release.entry.lock();
        f()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Drops after the key's guard, on return or unwind.
struct Release<'a> {
    table: &'a VariantLocks,
    key: &'a Path,
    entry: Arc<Mutex<()>>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.locks.lock();
        // The table and `entry` are the only holders left
        if Arc::strong_count(&self.entry) == 2 {
            locks.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn returns_the_closure_result() {
        let locks = VariantLocks::new();
        assert_eq!(locks.with_lock(Path::new("/u/a_s100.jpg"), || 42), 42);
    }

    #[test]
    fn entries_are_released_after_use() {
        let locks = VariantLocks::new();
        locks.with_lock(Path::new("/u/a_s100.jpg"), || ());
        assert!(locks.is_empty());
    }

    #[test]
    fn entries_are_released_when_the_closure_panics() {
        let locks = VariantLocks::new();
        let key = Path::new("/u/tall_s600.png");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            locks.with_lock(key, || panic!("resize blew up"))
        }));
        assert!(outcome.is_err());
        assert!(locks.is_empty());

        // The key is usable again afterwards
        assert_eq!(locks.with_lock(key, || 7), 7);
        assert!(locks.is_empty());
    }

    #[test]
    fn same_key_is_mutually_exclusive() {
        let locks = Arc::new(VariantLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks.with_lock(Path::new("/u/cat_s200.jpg"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
