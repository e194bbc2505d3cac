use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::codec::StateCodec;
use super::location::Location;
use super::storage::{StateStorage, read_snapshot, write_snapshot};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct UrlStateOptions<T> {
    pub defaults: T,
    /// Without a key the store only mirrors into the URL.
    pub storage_key: Option<String>,
    pub debounce: Duration,
    /// Query parameters removed on every persistence cycle.
    pub transient_params: Vec<String>,
}

impl<T> UrlStateOptions<T> {
    pub fn new(defaults: T) -> Self {
        Self {
            defaults,
            storage_key: None,
            debounce: DEFAULT_DEBOUNCE,
            transient_params: vec!["demo".to_string()],
        }
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

struct Inner<T> {
    state: T,
    hydrated: bool,
    pending: Option<JoinHandle<()>>,
    /// Bumped by every update, reset and teardown. A scheduled cycle only
    /// writes if the generation it was scheduled under is still current.
    generation: u64,
}

impl<T> Inner<T> {
    /// Aborts the pending cycle and invalidates any that already woke up.
    fn cancel_pending(&mut self) -> u64 {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

struct Shared<T, C, S, L> {
    options: UrlStateOptions<T>,
    codec: C,
    storage: S,
    location: L,
    inner: Mutex<Inner<T>>,
}

impl<T, C, S, L> Shared<T, C, S, L>
where
    T: Serialize,
    C: StateCodec<T>,
    S: StateStorage,
    L: Location,
{
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_if_current(&self, generation: u64) {
        let inner = self.lock();
        if inner.generation != generation {
            debug!(generation, "stale persistence cycle skipped");
            return;
        }
        // Held across the write so a concurrent reset cannot interleave.
        self.persist(&inner.state);
    }

    fn persist(&self, state: &T) {
        self.sync_to_url(state);
        if let Some(key) = &self.options.storage_key {
            write_snapshot(&self.storage, key, state);
        }
        debug!("state persisted to url and storage");
    }

    fn sync_to_url(&self, state: &T) {
        let transient = &self.options.transient_params;
        let mut params = self.location.query();
        for key in transient {
            params.delete(key);
        }
        for (key, value) in self.codec.serialize(state) {
            if transient.contains(&key) {
                continue;
            }
            match value.filter(|value| !value.is_empty()) {
                Some(value) => params.set(&key, value),
                None => params.delete(&key),
            }
        }
        self.location.replace_query(&params);
    }
}

/// Keeps one state record in sync with a URL query and durable storage.
///
/// The state starts as `defaults` and stays provisional until [`hydrate`]
/// resolves it from storage and the URL. After that every mutation
/// schedules a debounced persistence cycle; a newer mutation cancels the
/// pending one, so a burst of edits produces a single write.
///
/// [`hydrate`]: UrlStateStore::hydrate
pub struct UrlStateStore<T, C, S, L>
where
    T: Serialize,
    C: StateCodec<T>,
    S: StateStorage,
    L: Location,
{
    shared: Arc<Shared<T, C, S, L>>,
}

impl<T, C, S, L> UrlStateStore<T, C, S, L>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    C: StateCodec<T> + Send + Sync + 'static,
    S: StateStorage,
    L: Location,
{
    pub fn new(options: UrlStateOptions<T>, codec: C, storage: S, location: L) -> Self {
        let state = options.defaults.clone();
        Self {
            shared: Arc::new(Shared {
                options,
                codec,
                storage,
                location,
                inner: Mutex::new(Inner {
                    state,
                    hydrated: false,
                    pending: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Builds the store and hydrates it immediately.
    pub fn initialize(options: UrlStateOptions<T>, codec: C, storage: S, location: L) -> Self {
        let store = Self::new(options, codec, storage, location);
        store.hydrate();
        store
    }

    /// Resolves the state from storage and the URL, URL values winning.
    ///
    /// Runs once; later calls return `false` and change nothing. Hydration
    /// never writes to storage or the URL.
    pub fn hydrate(&self) -> bool {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.hydrated {
            return false;
        }

        let snapshot = match &shared.options.storage_key {
            Some(key) => read_snapshot(&shared.storage, key, &shared.options.defaults),
            None => shared.options.defaults.clone(),
        };
        let params = shared.location.query();
        inner.state = shared.codec.parse(&params, &snapshot);
        inner.hydrated = true;
        debug!(params = %params, "state hydrated");
        true
    }

    pub fn state(&self) -> T {
        self.shared.lock().state.clone()
    }

    /// `false` while the state is still the provisional defaults.
    pub fn is_hydrated(&self) -> bool {
        self.shared.lock().hydrated
    }

    pub fn set(&self, next: T) {
        self.update(move |_| next);
    }

    /// Applies `updater` to the current state. Once hydrated, persistence is
    /// (re)scheduled for `debounce` from now. Outside a tokio runtime the
    /// cycle runs immediately instead.
    ///
    /// `updater` runs under the store lock and must not call back into the
    /// store.
    pub fn update<F>(&self, updater: F)
    where
        F: FnOnce(&T) -> T,
    {
        let mut inner = self.shared.lock();
        inner.state = updater(&inner.state);
        if !inner.hydrated {
            return;
        }
        let generation = inner.cancel_pending();

        let Ok(runtime) = Handle::try_current() else {
            debug!("no runtime for debounce, persisting immediately");
            self.shared.persist(&inner.state);
            return;
        };
        let shared = Arc::clone(&self.shared);
        let delay = shared.options.debounce;
        inner.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.persist_if_current(generation);
        }));
    }

    /// Writes `next` (or the defaults) to state, URL and storage right away,
    /// cancelling any pending cycle.
    pub fn reset(&self, next: Option<T>) {
        let value = next.unwrap_or_else(|| self.shared.options.defaults.clone());
        let mut inner = self.shared.lock();
        inner.cancel_pending();
        inner.state = value;
        self.shared.persist(&inner.state);
        info!("state reset");
    }

    /// Waits for the pending persistence cycle, if any, to finish.
    pub async fn flush(&self) {
        let pending = self.shared.lock().pending.take();
        if let Some(pending) = pending {
            if let Err(e) = pending.await {
                debug!(error = %e, "pending persistence did not complete");
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.shared
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }

    /// Cancels the pending cycle. Nothing is written afterwards unless the
    /// state changes again.
    pub fn teardown(&self) {
        self.shared.lock().cancel_pending();
        debug!("pending persistence cancelled");
    }

    pub fn storage(&self) -> &S {
        &self.shared.storage
    }

    pub fn location(&self) -> &L {
        &self.shared.location
    }
}

impl<T, C, S, L> Drop for UrlStateStore<T, C, S, L>
where
    T: Serialize,
    C: StateCodec<T>,
    S: StateStorage,
    L: Location,
{
    fn drop(&mut self) {
        self.shared.lock().cancel_pending();
    }
}
