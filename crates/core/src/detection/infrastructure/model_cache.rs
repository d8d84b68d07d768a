use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::detection::infrastructure::model_resolver;
use crate::shared::config::BridgeConfig;

/// Where background model resolution currently stands.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelState {
    Pending,
    Ready(PathBuf),
    Failed(String),
}

/// Resolves the detector model in the background at startup.
///
/// Detectors built while resolution is pending report themselves
/// non-operational instead of blocking the caller.
pub struct ModelCache {
    result: Mutex<Option<Result<PathBuf, String>>>,
    ready: Condvar,
    progress: Arc<Mutex<(u64, u64)>>,
}

impl ModelCache {
    /// Create a cache and begin resolving the configured model.
    pub fn new(config: &BridgeConfig) -> Arc<Self> {
        let cache = Arc::new(Self::empty());

        let slot = cache.clone();
        let name = config.model_name.clone();
        let url = config.model_url.clone();
        let bundled = config.bundled_model_dir.clone();
        let allow_download = config.auto_download;
        thread::spawn(move || {
            let progress_mutex = slot.progress.clone();
            let result = model_resolver::resolve(
                &name,
                &url,
                bundled.as_deref(),
                allow_download,
                Some(Box::new(move |downloaded, total| {
                    if let Ok(mut p) = progress_mutex.lock() {
                        *p = (downloaded, total);
                    }
                })),
            );
            if let Err(ref e) = result {
                log::warn!("Face model unavailable: {e}");
            }
            slot.finish(result.map_err(|e| e.to_string()));
        });

        cache
    }

    /// A cache whose resolution already finished with `result`.
    pub fn resolved(result: Result<PathBuf, String>) -> Arc<Self> {
        let cache = Self::empty();
        cache.finish(result);
        Arc::new(cache)
    }

    fn empty() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
            progress: Arc::new(Mutex::new((0, 0))),
        }
    }

    fn finish(&self, result: Result<PathBuf, String>) {
        if let Ok(mut guard) = self.result.lock() {
            *guard = Some(result);
        }
        self.ready.notify_all();
    }

    pub fn state(&self) -> ModelState {
        match self.result.lock() {
            Ok(guard) => match guard.as_ref() {
                None => ModelState::Pending,
                Some(Ok(path)) => ModelState::Ready(path.clone()),
                Some(Err(e)) => ModelState::Failed(e.clone()),
            },
            Err(_) => ModelState::Failed("model cache lock poisoned".into()),
        }
    }

    /// Model path if resolution finished successfully. Never blocks on
    /// resolution.
    pub fn try_get(&self) -> Option<PathBuf> {
        match self.state() {
            ModelState::Ready(path) => Some(path),
            _ => None,
        }
    }

    /// Block until resolution finishes or `timeout` elapses, forwarding
    /// download progress while waiting.
    pub fn wait(
        &self,
        timeout: Duration,
        on_progress: &dyn Fn(u64, u64),
    ) -> Result<PathBuf, String> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.result.lock().map_err(|_| "model cache lock poisoned")?;
        loop {
            if let Some(ref result) = *guard {
                return result.clone();
            }
            let now = Instant::now();
            if now >= deadline {
                return Err("Timed out waiting for face model".into());
            }
            // Forward download progress while waiting
            if let Ok(progress) = self.progress.try_lock() {
                let (dl, total) = *progress;
                if total > 0 {
                    on_progress(dl, total);
                }
            }
            let step = (deadline - now).min(Duration::from_millis(100));
            let (new_guard, _) = self
                .ready
                .wait_timeout(guard, step)
                .map_err(|_| "model cache lock poisoned")?;
            guard = new_guard;
        }
    }
}
