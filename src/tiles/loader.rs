use super::cache::{TileCache, TileKey};
use super::source::{TemplateSource, TileSource};
use crate::Result;
use fxhash::{FxHashMap, FxHashSet};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Download attempts per request before a tile is marked as failed
const MAX_ATTEMPTS: usize = 2;

/// How long a failed tile is left alone before it may be requested again
const RETRY_AFTER: Duration = Duration::from_secs(30);

/// Shared blocking HTTP client with a custom User-Agent so that public tile
/// servers (e.g. OpenStreetMap) don't reject the request. Building the client
/// once avoids the cost of TLS and connection pool setup for every tile.
static HTTP_CLIENT: Lazy<Option<Client>> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("pinmap/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| log::error!("failed to build tile HTTP client: {}", e))
        .ok()
});

/// A downloaded tile handed back to the UI thread
pub type LoadedTile = (TileKey, Arc<Vec<u8>>);

/// Turns a tile URL into encoded image bytes
pub type FetchFn = Arc<dyn Fn(&str) -> Result<Vec<u8>> + Send + Sync>;

#[derive(Default)]
struct Downloads {
    in_flight: FxHashSet<TileKey>,
    failed: FxHashMap<TileKey, Instant>,
}

/// Fetches tiles on background threads and sends the bytes back over an
/// `mpsc` channel. Tiles already in the cache are answered without a request.
pub struct TileLoader {
    tx: Sender<LoadedTile>,
    cache: TileCache,
    fetch: FetchFn,
    downloads: Arc<Mutex<Downloads>>,
}

impl TileLoader {
    /// Create a new tile loader given a sender to report completed downloads.
    pub fn new(tx: Sender<LoadedTile>, cache: TileCache) -> Self {
        Self::with_fetch(tx, cache, Arc::new(fetch))
    }

    /// Like [`new`](Self::new) but downloading through `fetch`
    pub fn with_fetch(tx: Sender<LoadedTile>, cache: TileCache, fetch: FetchFn) -> Self {
        Self {
            tx,
            cache,
            fetch,
            downloads: Arc::new(Mutex::new(Downloads::default())),
        }
    }

    /// Start fetching `key`. Requests for a tile that is still downloading,
    /// or that failed less than [`RETRY_AFTER`] ago, are ignored.
    pub fn request(&self, key: TileKey) {
        if let Some(data) = self.cache.get(&key) {
            let _ = self.tx.send((key, data));
            return;
        }

        match self.downloads.lock() {
            Ok(mut downloads) => {
                if let Some(failed_at) = downloads.failed.get(&key) {
                    if failed_at.elapsed() < RETRY_AFTER {
                        return;
                    }
                    downloads.failed.remove(&key);
                }
                if !downloads.in_flight.insert(key) {
                    #[cfg(feature = "debug")]
                    log::debug!("skipping duplicate tile request: {:?}", key);
                    return;
                }
            }
            Err(_) => return,
        }

        if let Err(e) = self.spawn_download(key) {
            log::error!("could not start tile download {:?}: {}", key, e);
            if let Ok(mut downloads) = self.downloads.lock() {
                downloads.in_flight.remove(&key);
            }
        }
    }

    fn spawn_download(&self, key: TileKey) -> Result<()> {
        let url = TemplateSource::for_style(key.style).url(key.coord);
        let tx = self.tx.clone();
        let cache = self.cache.clone();
        let fetch = Arc::clone(&self.fetch);
        let downloads = Arc::clone(&self.downloads);

        thread::Builder::new()
            .name("pinmap-tile".to_string())
            .spawn(move || {
                let mut loaded = None;
                for attempt in 1..=MAX_ATTEMPTS {
                    log::debug!("fetch tile {:?} attempt {} from {}", key, attempt, url);
                    match fetch(&url) {
                        Ok(data) => {
                            loaded = Some(data);
                            break;
                        }
                        Err(e) => log::warn!(
                            "tile {:?} download failed on attempt {}: {}",
                            key,
                            attempt,
                            e
                        ),
                    }
                }

                if let Some(data) = &loaded {
                    log::debug!("downloaded tile {:?} ({} bytes)", key, data.len());
                }
                if let Ok(mut downloads) = downloads.lock() {
                    if loaded.is_none() {
                        log::error!("giving up on tile {:?} for {:?}", key, RETRY_AFTER);
                        downloads.failed.insert(key, Instant::now());
                    }
                    downloads.in_flight.remove(&key);
                }
                if let Some(data) = loaded {
                    let data = cache.insert(key, data);
                    let _ = tx.send((key, data));
                }
            })?;
        Ok(())
    }

    /// Whether a download for `key` is running
    pub fn is_pending(&self, key: &TileKey) -> bool {
        self.downloads
            .lock()
            .map(|downloads| downloads.in_flight.contains(key))
            .unwrap_or(false)
    }

    /// Whether `key` recently failed and is waiting out its retry delay
    pub fn has_failed(&self, key: &TileKey) -> bool {
        self.downloads
            .lock()
            .map(|downloads| downloads.failed.contains_key(key))
            .unwrap_or(false)
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    let client = HTTP_CLIENT
        .as_ref()
        .ok_or_else(|| crate::MapError::Backend("tile HTTP client unavailable".to_string()))?;
    let resp = client.get(url).send()?;
    if !resp.status().is_success() {
        return Err(crate::MapError::Backend(format!("HTTP {}", resp.status())));
    }
    Ok(resp.bytes()?.to_vec())
}
