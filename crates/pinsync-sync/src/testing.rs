//! Instrumented store used by the engine's tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use pinsync_store::{ByteStream, ContentStore, InMemoryContentStore, StoreError, StoreResult};
use pinsync_types::{ContentId, ContentSet};

/// Counts up on creation, down on drop, and remembers the peak.
struct Gauge {
    current: Arc<AtomicUsize>,
}

impl Gauge {
    fn enter(current: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self {
            current: Arc::clone(current),
        }
    }
}

impl Drop for Gauge {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An [`InMemoryContentStore`] with failure injection and call accounting.
pub struct InstrumentedStore {
    inner: InMemoryContentStore,
    fail_list: AtomicBool,
    fail_export: Mutex<HashSet<ContentId>>,
    fail_import: Mutex<HashSet<ContentId>>,
    panic_import: Mutex<HashSet<ContentId>>,
    import_delay: Mutex<Duration>,
    exports: Mutex<Vec<ContentId>>,
    import_calls: AtomicUsize,
    open_streams: Arc<AtomicUsize>,
    peak_streams: Arc<AtomicUsize>,
    active_imports: Arc<AtomicUsize>,
    peak_imports: AtomicUsize,
}

impl InstrumentedStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: InMemoryContentStore::new(name).with_chunk_size(16 * 1024),
            fail_list: AtomicBool::new(false),
            fail_export: Mutex::new(HashSet::new()),
            fail_import: Mutex::new(HashSet::new()),
            panic_import: Mutex::new(HashSet::new()),
            import_delay: Mutex::new(Duration::ZERO),
            exports: Mutex::new(Vec::new()),
            import_calls: AtomicUsize::new(0),
            open_streams: Arc::new(AtomicUsize::new(0)),
            peak_streams: Arc::new(AtomicUsize::new(0)),
            active_imports: Arc::new(AtomicUsize::new(0)),
            peak_imports: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryContentStore {
        &self.inner
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_export(&self, id: &ContentId) {
        self.fail_export.lock().unwrap().insert(id.clone());
    }

    pub fn fail_import(&self, id: &ContentId) {
        self.fail_import.lock().unwrap().insert(id.clone());
    }

    pub fn panic_import(&self, id: &ContentId) {
        self.panic_import.lock().unwrap().insert(id.clone());
    }

    pub fn set_import_delay(&self, delay: Duration) {
        *self.import_delay.lock().unwrap() = delay;
    }

    pub fn exports_started(&self) -> usize {
        self.exports.lock().unwrap().len()
    }

    pub fn import_calls(&self) -> usize {
        self.import_calls.load(Ordering::SeqCst)
    }

    /// Export streams not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Highest number of export streams alive at once.
    pub fn peak_streams(&self) -> usize {
        self.peak_streams.load(Ordering::SeqCst)
    }

    /// Highest number of imports in progress at once.
    pub fn peak_imports(&self) -> usize {
        self.peak_imports.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for InstrumentedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_pinned(&self) -> StoreResult<ContentSet> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("list refused".into()));
        }
        self.inner.list_pinned().await
    }

    async fn export(&self, id: &ContentId) -> StoreResult<ByteStream> {
        self.exports.lock().unwrap().push(id.clone());
        let refused = self.fail_export.lock().unwrap().contains(id);
        if refused {
            return Err(StoreError::Transport(format!("export of {id} refused")));
        }
        let stream = self.inner.export(id).await?;
        let guard = Gauge::enter(&self.open_streams, &self.peak_streams);
        Ok(Box::pin(stream.map(move |chunk| {
            let _held = &guard;
            chunk
        })))
    }

    async fn import(&self, id: &ContentId, content: ByteStream) -> StoreResult<()> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        let _active = Gauge::enter(&self.active_imports, &self.peak_imports);
        let explode = self.panic_import.lock().unwrap().contains(id);
        if explode {
            panic!("import of {id} blew up");
        }
        let delay = *self.import_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let refused = self.fail_import.lock().unwrap().contains(id);
        if refused {
            return Err(StoreError::Rejected {
                id: id.clone(),
                reason: "import refused".into(),
            });
        }
        self.inner.import(id, content).await
    }
}
