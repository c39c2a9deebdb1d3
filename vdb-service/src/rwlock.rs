//! A writer-preferring, fair async read-write lock.
//!
//! New readers queue behind any writer already waiting (a turnstile), so a
//! read-heavy workload can never starve a writer. The first reader to enter
//! an empty read cohort takes the writer-exclusion lock on the cohort's
//! behalf; the last reader to leave releases it.

use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct ReaderState {
    count: usize,
    /// Held on behalf of the reader cohort while `count > 0`.
    cohort_guard: Option<OwnedMutexGuard<()>>,
}

pub struct AsyncRwLock {
    /// Serializes the "increment and maybe take the writer lock" critical
    /// section so a second reader can't slip past a first reader that is
    /// still waiting on `wlock`.
    rlock: AsyncMutex<()>,
    wlock: Arc<AsyncMutex<()>>,
    turnstile: AsyncMutex<()>,
    readers: SyncMutex<ReaderState>,
}

impl Default for AsyncRwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRwLock {
    pub fn new() -> Self {
        Self {
            rlock: AsyncMutex::new(()),
            wlock: Arc::new(AsyncMutex::new(())),
            turnstile: AsyncMutex::new(()),
            readers: SyncMutex::new(ReaderState { count: 0, cohort_guard: None }),
        }
    }

    pub async fn read(&self) -> ReadGuard<'_> {
        {
            let _turn = self.turnstile.lock().await;
        }

        let _r = self.rlock.lock().await;
        let is_first_reader = {
            let mut state = self.readers.lock();
            state.count += 1;
            state.count == 1
        };
        if is_first_reader {
            let guard = self.wlock.clone().lock_owned().await;
            self.readers.lock().cohort_guard = Some(guard);
        }

        ReadGuard { lock: self }
    }

    pub async fn write(&self) -> WriteGuard<'_> {
        let turnstile = self.turnstile.lock().await;
        let guard = self.wlock.clone().lock_owned().await;
        WriteGuard { _guard: guard, _turnstile: turnstile }
    }
}

pub struct ReadGuard<'a> {
    lock: &'a AsyncRwLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.readers.lock();
        state.count -= 1;
        if state.count == 0 {
            state.cohort_guard = None;
        }
    }
}

pub struct WriteGuard<'a> {
    // Declaration order is drop order: release the writer lock before the
    // turnstile, same as the reference implementation's `finally` block.
    _guard: OwnedMutexGuard<()>,
    _turnstile: tokio::sync::MutexGuard<'a, ()>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn concurrent_reads_are_allowed() {
        let lock = Arc::new(AsyncRwLock::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _g = lock.read().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) > 1, "readers should overlap");
    }

    #[tokio::test]
    async fn writer_excludes_readers_and_other_writers() {
        let lock = Arc::new(AsyncRwLock::new());
        let active_writers = Arc::new(AtomicUsize::new(0));
        let active_any = Arc::new(AtomicUsize::new(0));
        let violated = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..6 {
            let lock = lock.clone();
            let active_writers = active_writers.clone();
            let active_any = active_any.clone();
            let violated = violated.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let _g = lock.write().await;
                    active_writers.fetch_add(1, Ordering::SeqCst);
                    if active_any.fetch_add(1, Ordering::SeqCst) != 0 {
                        violated.fetch_add(1, Ordering::SeqCst);
                    }
                    sleep(Duration::from_millis(10)).await;
                    active_any.fetch_sub(1, Ordering::SeqCst);
                    active_writers.fetch_sub(1, Ordering::SeqCst);
                } else {
                    let _g = lock.read().await;
                    if active_writers.load(Ordering::SeqCst) != 0 {
                        violated.fetch_add(1, Ordering::SeqCst);
                    }
                    sleep(Duration::from_millis(5)).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(violated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn queued_writer_blocks_new_readers() {
        let lock = Arc::new(AsyncRwLock::new());
        let events = Arc::new(SyncMutex::new(Vec::<&'static str>::new()));

        // Hold a read guard so the writer below has to queue.
        let first_read = lock.read().await;

        let writer_lock = lock.clone();
        let writer_events = events.clone();
        let writer = tokio::spawn(async move {
            let _g = writer_lock.write().await;
            writer_events.lock().push("writer");
        });

        // Give the writer a chance to reach the turnstile and start waiting.
        sleep(Duration::from_millis(20)).await;

        let late_reader_lock = lock.clone();
        let late_reader_events = events.clone();
        let late_reader = tokio::spawn(async move {
            let _g = late_reader_lock.read().await;
            late_reader_events.lock().push("late_reader");
        });

        sleep(Duration::from_millis(20)).await;
        drop(first_read);

        writer.await.unwrap();
        late_reader.await.unwrap();

        let order = events.lock().clone();
        assert_eq!(order, vec!["writer", "late_reader"]);
    }
}
