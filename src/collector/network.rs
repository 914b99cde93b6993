//! Network round-trip producer.
//!
//! Two ways in:
//! - [`NetworkTracker::start`] swaps an instrumented fetcher into a
//!   [`FetchSlot`] and [`NetworkTracker::stop`] swaps the original back.
//! - [`RequestTimer`] is for clients with their own interceptor hooks: call
//!   `begin` from the request hook and `finish`/`fail` from the response hook.
//!
//! Telemetry never changes what the application sees. A failed fetch is
//! recorded with status 0 and its original error is returned untouched.

use crate::collector::handle::Listener;
use crate::collector::types::NetworkEntry;
use crate::core::clock::SharedClock;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Error produced by the application's fetcher.
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// URL recorded when a client does not report one.
pub const UNKNOWN_URL: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub method: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A fetch-like function.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

impl<F> Fetch for F
where
    F: Fn(&FetchRequest) -> Result<FetchResponse, FetchError> + Send + Sync,
{
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self(request)
    }
}

/// A swappable fetch reference the host application calls through.
#[derive(Clone)]
pub struct FetchSlot {
    current: Arc<RwLock<Arc<dyn Fetch>>>,
}

impl FetchSlot {
    pub fn new(fetch: impl Fetch + 'static) -> Self {
        let fetch: Arc<dyn Fetch> = Arc::new(fetch);
        Self {
            current: Arc::new(RwLock::new(fetch)),
        }
    }

    /// The fetcher currently installed.
    pub fn get(&self) -> Arc<dyn Fetch> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Install `fetch`, returning what was there before.
    pub fn replace(&self, fetch: Arc<dyn Fetch>) -> Arc<dyn Fetch> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, fetch)
    }

    /// Call through whatever fetcher is installed.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.get().fetch(request)
    }
}

/// Uppercased method, or `POST` when a body is present, else `GET`.
pub fn normalize_method(method: Option<&str>, has_body: bool) -> String {
    match method.map(str::trim).filter(|m| !m.is_empty()) {
        Some(method) => method.to_uppercase(),
        None if has_body => "POST".to_string(),
        None => "GET".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct NetworkTrackerOptions {
    /// Whether `start` should instrument the fetch slot
    pub track_fetch: bool,
}

impl Default for NetworkTrackerOptions {
    fn default() -> Self {
        Self { track_fetch: true }
    }
}

struct InstrumentedFetch {
    inner: Arc<dyn Fetch>,
    listener: Listener<NetworkEntry>,
    clock: SharedClock,
}

impl Fetch for InstrumentedFetch {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let start_time = self.clock.now_ms();
        let method = normalize_method(request.method.as_deref(), request.body.is_some());

        let result = self.inner.fetch(request);

        let end_time = self.clock.now_ms();
        let status = match &result {
            Ok(response) => response.status,
            Err(_) => NetworkEntry::FAILED_STATUS,
        };
        (self.listener)(NetworkEntry {
            url: request.url.clone(),
            method,
            status,
            duration: end_time - start_time,
            start_time,
            end_time,
        });
        result
    }
}

/// A slot we instrumented, and what it held before.
struct Patched {
    slot: FetchSlot,
    original: Arc<dyn Fetch>,
}

pub struct NetworkTracker {
    listener: Listener<NetworkEntry>,
    clock: SharedClock,
    options: NetworkTrackerOptions,
    patched: Mutex<Option<Patched>>,
}

impl NetworkTracker {
    pub fn new(
        listener: Listener<NetworkEntry>,
        options: NetworkTrackerOptions,
        clock: SharedClock,
    ) -> Self {
        Self {
            listener,
            clock,
            options,
            patched: Mutex::new(None),
        }
    }

    /// Instrument `slot`. A no-op if fetch tracking is off or a slot is
    /// already instrumented.
    pub fn start(&self, slot: &FetchSlot) {
        if !self.options.track_fetch {
            return;
        }
        let mut patched = self.patched.lock().unwrap_or_else(PoisonError::into_inner);
        if patched.is_some() {
            return;
        }

        let instrumented = Arc::new(InstrumentedFetch {
            inner: slot.get(),
            listener: Arc::clone(&self.listener),
            clock: Arc::clone(&self.clock),
        });
        let original = slot.replace(instrumented);
        *patched = Some(Patched {
            slot: slot.clone(),
            original,
        });
        tracing::debug!("fetch instrumented");
    }

    /// Restore the original fetcher. Safe to call repeatedly.
    pub fn stop(&self) {
        let restored = self
            .patched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Patched { slot, original }) = restored {
            slot.replace(original);
            tracing::debug!("fetch restored");
        }
    }

    pub fn is_started(&self) -> bool {
        self.patched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Timer for clients that expose request/response interceptors.
    pub fn request_timer(&self) -> RequestTimer {
        RequestTimer {
            listener: Arc::clone(&self.listener),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl Drop for NetworkTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts timing requests for interceptor-style clients.
#[derive(Clone)]
pub struct RequestTimer {
    listener: Listener<NetworkEntry>,
    clock: SharedClock,
}

impl RequestTimer {
    /// Record the start of a request. Missing values default to
    /// [`UNKNOWN_URL`] and `GET`.
    pub fn begin(&self, url: Option<&str>, method: Option<&str>) -> InFlightRequest {
        InFlightRequest {
            url: url.unwrap_or(UNKNOWN_URL).to_string(),
            method: normalize_method(method, false),
            start_time: self.clock.now_ms(),
            listener: Arc::clone(&self.listener),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// A request between its request hook and its response hook.
pub struct InFlightRequest {
    url: String,
    method: String,
    start_time: f64,
    listener: Listener<NetworkEntry>,
    clock: SharedClock,
}

impl InFlightRequest {
    /// The response arrived with `status`.
    pub fn finish(self, status: u16) -> NetworkEntry {
        self.emit(status)
    }

    /// The request failed, with the response status if there was one.
    pub fn fail(self, status: Option<u16>) -> NetworkEntry {
        self.emit(status.unwrap_or(NetworkEntry::FAILED_STATUS))
    }

    fn emit(self, status: u16) -> NetworkEntry {
        let end_time = self.clock.now_ms();
        let entry = NetworkEntry {
            url: self.url,
            method: self.method,
            status,
            duration: end_time - self.start_time,
            start_time: self.start_time,
            end_time,
        };
        (self.listener)(entry.clone());
        entry
    }
}
