//! Session connection pool.
//!
//! Keeps one backing-store handle per browser session. Handles are created
//! lazily on first `acquire`, reference-counted across overlapping requests,
//! and closed by an idle timer once the session has been quiet for the
//! configured window. `shutdown` force-closes everything.
//!
//! Timers run on tokio time, so tests can drive them with a paused clock.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default inactivity window before an idle session handle is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool errors.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Close failed: {0}")]
    Close(String),
}

/// Opens and closes backing-store handles for the pool.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Handle, PoolError>;

    async fn close(&self, handle: Self::Handle) -> Result<(), PoolError>;
}

struct SlotState<H> {
    handle: Option<H>,
    request_count: usize,
    last_activity: Instant,
    /// Bumped on every activity; a timer only fires for the generation it
    /// was armed with.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    /// Set once the slot has been removed from the map. A retired slot is
    /// never reused.
    retired: bool,
}

struct Slot<H> {
    state: Mutex<SlotState<H>>,
}

impl<H> Slot<H> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                handle: None,
                request_count: 0,
                last_activity: Instant::now(),
                generation: 0,
                timer: None,
                retired: false,
            }),
        }
    }
}

struct Inner<C: Connector> {
    connector: C,
    slots: DashMap<String, Arc<Slot<C::Handle>>>,
    idle_timeout: Duration,
}

/// Per-session, reference-counted connection cache.
pub struct SessionPool<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for SessionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> std::fmt::Debug for SessionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("sessions", &self.inner.slots.len())
            .field("idle_timeout", &self.inner.idle_timeout)
            .finish()
    }
}

impl<C: Connector> SessionPool<C> {
    pub fn new(connector: C) -> Self {
        Self::with_idle_timeout(connector, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(connector: C, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                slots: DashMap::new(),
                idle_timeout,
            }),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.inner.idle_timeout
    }

    /// Number of sessions with a registered slot.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// In-flight request count for a session, `None` if it has no handle.
    pub async fn request_count(&self, session_id: &str) -> Option<usize> {
        let slot = self.inner.slots.get(session_id).map(|s| Arc::clone(s.value()))?;
        let state = slot.state.lock().await;
        state.handle.as_ref().map(|_| state.request_count)
    }

    /// Time since the session's last acquire or release.
    pub async fn idle_for(&self, session_id: &str) -> Option<Duration> {
        let slot = self.inner.slots.get(session_id).map(|s| Arc::clone(s.value()))?;
        let state = slot.state.lock().await;
        state.handle.as_ref().map(|_| state.last_activity.elapsed())
    }

    /// Get the session's handle, connecting if there is none.
    ///
    /// Concurrent acquires for the same session serialize on the session's
    /// lock, so only the first one connects. A failed connect leaves nothing
    /// behind and the next acquire retries.
    pub async fn acquire(&self, session_id: &str) -> Result<C::Handle, PoolError> {
        loop {
            let slot = Arc::clone(
                self.inner
                    .slots
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(Slot::new()))
                    .value(),
            );
            let mut state = slot.state.lock().await;
            if state.retired {
                // Torn down between lookup and lock; pick up the fresh slot.
                continue;
            }

            let handle = match state.handle.clone() {
                Some(h) => h,
                None => match self.inner.connector.connect().await {
                    Ok(h) => {
                        debug!(session_id, "opened session connection");
                        state.handle = Some(h.clone());
                        h
                    }
                    Err(e) => {
                        if state.request_count == 0 {
                            state.retired = true;
                            self.inner
                                .slots
                                .remove_if(session_id, |_, v| Arc::ptr_eq(v, &slot));
                        }
                        warn!(session_id, error = %e, "session connection failed");
                        return Err(e);
                    }
                },
            };

            state.request_count += 1;
            self.touch(session_id, &slot, &mut state);
            return Ok(handle);
        }
    }

    /// Mark one request on the session as finished.
    ///
    /// Reaching zero does not close the handle; it stays cached until the
    /// idle timer fires so bursty reuse does not reconnect.
    pub async fn release(&self, session_id: &str) {
        let Some(slot) = self.inner.slots.get(session_id).map(|s| Arc::clone(s.value())) else {
            debug!(session_id, "release for unknown session");
            return;
        };
        let mut state = slot.state.lock().await;
        if state.retired || state.handle.is_none() {
            return;
        }
        if state.request_count == 0 {
            warn!(session_id, "release without matching acquire");
            return;
        }
        state.request_count -= 1;
        self.touch(session_id, &slot, &mut state);
    }

    /// Close every handle regardless of reference counts.
    pub async fn shutdown(&self) {
        let slots: Vec<(String, Arc<Slot<C::Handle>>)> = self
            .inner
            .slots
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut closed = 0usize;
        for (session_id, slot) in slots {
            let mut state = slot.state.lock().await;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.retired = true;
            self.inner
                .slots
                .remove_if(&session_id, |_, v| Arc::ptr_eq(v, &slot));
            if let Some(handle) = state.handle.take() {
                if state.request_count > 0 {
                    warn!(
                        session_id = %session_id,
                        in_flight = state.request_count,
                        "closing session connection with requests in flight"
                    );
                }
                close_logged(&self.inner.connector, &session_id, handle).await;
                closed += 1;
            }
        }
        info!(closed, "session pool shut down");
    }

    /// Record activity and re-arm the idle timer. Caller holds the slot lock.
    fn touch(
        &self,
        session_id: &str,
        slot: &Arc<Slot<C::Handle>>,
        state: &mut SlotState<C::Handle>,
    ) {
        state.last_activity = Instant::now();
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.timer = Some(spawn_idle_timer(
            Arc::downgrade(&self.inner),
            session_id.to_string(),
            Arc::downgrade(slot),
            state.generation,
            self.inner.idle_timeout,
        ));
    }
}

fn spawn_idle_timer<C: Connector>(
    inner: Weak<Inner<C>>,
    session_id: String,
    slot: Weak<Slot<C::Handle>>,
    generation: u64,
    idle_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut generation = generation;
        loop {
            tokio::time::sleep(idle_timeout).await;
            let (Some(inner), Some(slot)) = (inner.upgrade(), slot.upgrade()) else {
                return;
            };
            match expire(&inner, &session_id, &slot, generation).await {
                Expiry::Rearmed(next) => generation = next,
                Expiry::Done => return,
            }
        }
    })
}

enum Expiry {
    /// Still leased; the same timer task waits another window.
    Rearmed(u64),
    Done,
}

/// Idle timer body: close the handle if nothing happened since `generation`.
async fn expire<C: Connector>(
    inner: &Inner<C>,
    session_id: &str,
    slot: &Arc<Slot<C::Handle>>,
    generation: u64,
) -> Expiry {
    let mut state = slot.state.lock().await;
    if state.retired || state.generation != generation {
        return Expiry::Done;
    }
    if state.request_count > 0 {
        // Idle but still leased; do not close under an in-flight query.
        debug!(session_id, in_flight = state.request_count, "idle session still leased");
        state.generation += 1;
        return Expiry::Rearmed(state.generation);
    }

    state.retired = true;
    // This task is the timer; drop our own handle without aborting ourselves.
    state.timer = None;
    inner
        .slots
        .remove_if(session_id, |_, v| Arc::ptr_eq(v, slot));
    if let Some(handle) = state.handle.take() {
        close_logged(&inner.connector, session_id, handle).await;
        info!(session_id, "closed idle session connection");
    }
    Expiry::Done
}

async fn close_logged<C: Connector>(connector: &C, session_id: &str, handle: C::Handle) {
    if let Err(e) = connector.close(handle).await {
        warn!(session_id, error = %e, "failed to close session connection");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Connector that counts opens/closes and hands out numbered handles.
    #[derive(Default)]
    struct CountingConnector {
        connects: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        fail_next: Arc<AtomicBool>,
        fail_close: bool,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Handle = usize;

        async fn connect(&self) -> Result<usize, PoolError> {
            // Yield so overlapping acquires really interleave.
            tokio::task::yield_now().await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(PoolError::Connection("store unreachable".into()));
            }
            Ok(self.connects.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn close(&self, _handle: usize) -> Result<(), PoolError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(PoolError::Close("already gone".into()));
            }
            Ok(())
        }
    }

    fn pool() -> (SessionPool<CountingConnector>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = CountingConnector::default();
        let (connects, closes) = (c.connects.clone(), c.closes.clone());
        (SessionPool::new(c), connects, closes)
    }

    /// Let spawned timer tasks run after the paused clock advanced.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn n_acquires_share_one_connection() {
        let (pool, connects, closes) = pool();
        for _ in 0..5 {
            assert_eq!(pool.acquire("s1").await.unwrap(), 1);
        }
        assert_eq!(pool.request_count("s1").await, Some(5));
        for _ in 0..5 {
            pool.release("s1").await;
        }
        assert_eq!(pool.request_count("s1").await, Some(0));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 0, "release must not close");

        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(pool.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_handle_is_replaced_by_a_fresh_one() {
        let (pool, connects, closes) = pool();
        assert_eq!(pool.acquire("s1").await.unwrap(), 1);
        pool.release("s1").await;

        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT * 2).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(pool.request_count("s1").await, None);

        assert_eq!(pool.acquire("s1").await.unwrap(), 2);
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_postpones_teardown() {
        let (pool, _connects, closes) = pool();
        pool.acquire("s1").await.unwrap();
        pool.release("s1").await;

        for _ in 0..4 {
            tokio::time::sleep(DEFAULT_IDLE_TIMEOUT / 2).await;
            settle().await;
            pool.acquire("s1").await.unwrap();
            pool.release("s1").await;
        }
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        assert_eq!(pool.len(), 1);
        assert!(pool.idle_for("s1").await.unwrap() < Duration::from_secs(1));

        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn leased_handle_survives_idle_window() {
        let (pool, _connects, closes) = pool();
        pool.acquire("s1").await.unwrap();

        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT * 3).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        assert_eq!(pool.request_count("s1").await, Some(1));

        pool.release("s1").await;
        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquire_connects_once() {
        let (pool, connects, _closes) = pool();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.acquire("shared").await })
            })
            .collect();
        for t in tasks {
            assert_eq!(t.await.unwrap().unwrap(), 1);
        }
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(pool.request_count("shared").await, Some(16));
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_are_isolated() {
        let (pool, connects, _closes) = pool();
        let a = pool.acquire("a").await.unwrap();
        let b = pool.acquire("b").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_is_not_cached() {
        let c = CountingConnector::default();
        c.fail_next.store(true, Ordering::SeqCst);
        let connects = c.connects.clone();
        let pool = SessionPool::new(c);

        let err = pool.acquire("s1").await.unwrap_err();
        assert!(matches!(err, PoolError::Connection(_)));
        assert!(pool.is_empty());

        assert_eq!(pool.acquire("s1").await.unwrap(), 1);
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn release_never_goes_negative() {
        let (pool, _connects, _closes) = pool();
        pool.release("ghost").await;
        pool.acquire("s1").await.unwrap();
        pool.release("s1").await;
        pool.release("s1").await;
        assert_eq!(pool.request_count("s1").await, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_everything_once() {
        let (pool, _connects, closes) = pool();
        pool.acquire("a").await.unwrap();
        pool.acquire("b").await.unwrap();
        pool.release("b").await;

        pool.shutdown().await;
        assert_eq!(closes.load(Ordering::SeqCst), 2);
        assert!(pool.is_empty());

        // Aborted timers must not close again.
        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT * 2).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn close_failure_is_swallowed() {
        let c = CountingConnector {
            fail_close: true,
            ..Default::default()
        };
        let closes = c.closes.clone();
        let pool = SessionPool::with_idle_timeout(c, Duration::from_secs(5));
        pool.acquire("s1").await.unwrap();
        pool.release("s1").await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(pool.is_empty());
        assert!(pool.acquire("s1").await.is_ok());
    }

    #[test]
    fn idle_timeout_is_configurable() {
        let pool =
            SessionPool::with_idle_timeout(CountingConnector::default(), Duration::from_secs(60));
        assert_eq!(pool.idle_timeout(), Duration::from_secs(60));
        assert_eq!(
            SessionPool::new(CountingConnector::default()).idle_timeout(),
            DEFAULT_IDLE_TIMEOUT
        );
    }
}
