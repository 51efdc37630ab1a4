//! cutline-session: Session lifecycle around the contour pipeline
//!
//! A [`Session`] is the single context object an application holds: it
//! owns a background [`StageWorker`] running contour generation and a
//! fingerprint-keyed [`ResultCache`] of recent results. There is no
//! global state; create a session, use it, drop it.
//!
//! Cache reads and writes happen only on the controller side, in
//! [`Session::generate`] and [`Session::resolve`]. The worker thread
//! sees plain inputs and returns plain results.

pub mod cache;
pub mod worker;

pub use cache::{CACHE_CAPACITY, ResultCache, fingerprint};
pub use worker::{JobHandle, StageWorker, WorkerError};

use tracing::debug;

use cutline_pipeline::{ContourConfig, ContourData, ContourError, RgbaImage, generate_contour};

/// Why a session request failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The worker did not deliver a result. Retryable.
    #[error(transparent)]
    Worker(#[from] WorkerError),
    /// The pipeline itself rejected the input.
    #[error(transparent)]
    Contour(#[from] ContourError),
}

struct ContourJob {
    image: RgbaImage,
    config: ContourConfig,
}

/// An in-progress contour request.
///
/// Obtain one from [`Session::generate`] and hand it back to
/// [`Session::resolve`] for the result.
pub struct PendingContour {
    key: u64,
    state: PendingState,
}

enum PendingState {
    Cached(ContourData),
    Submitted(JobHandle<Result<ContourData, ContourError>>),
}

impl PendingContour {
    /// Whether this request was served from the cache without touching
    /// the worker.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self.state, PendingState::Cached(_))
    }
}

/// Owns the contour worker and result cache for one user context.
pub struct Session {
    worker: StageWorker<ContourJob, Result<ContourData, ContourError>>,
    cache: ResultCache<ContourData>,
}

impl Session {
    /// Create a session with a fresh worker thread and an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker: StageWorker::new("cutline-contour", |job: ContourJob| {
                generate_contour(&job.image, &job.config)
            }),
            cache: ResultCache::default(),
        }
    }

    /// Request a contour for `image` under `config`.
    ///
    /// Returns immediately: either a cache hit carrying the finished
    /// result, or a handle to a job dispatched to the worker. A request
    /// submitted while another is pending supersedes it.
    pub fn generate(&mut self, image: RgbaImage, config: ContourConfig) -> PendingContour {
        let key = fingerprint(&image, &config);
        if let Some(data) = self.cache.get(key) {
            debug!(key, "contour served from cache");
            return PendingContour {
                key,
                state: PendingState::Cached(data),
            };
        }
        let handle = self.worker.submit(ContourJob { image, config });
        PendingContour {
            key,
            state: PendingState::Submitted(handle),
        }
    }

    /// Block until `pending` resolves, caching a successful result.
    ///
    /// # Errors
    ///
    /// [`SessionError::Worker`] when the job was superseded or the
    /// worker was recreated (both retryable), [`SessionError::Contour`]
    /// when the pipeline rejected the input.
    pub fn resolve(&mut self, pending: PendingContour) -> Result<ContourData, SessionError> {
        match pending.state {
            PendingState::Cached(data) => Ok(data),
            PendingState::Submitted(handle) => {
                let data = handle.wait()??;
                self.cache.insert(pending.key, data.clone());
                Ok(data)
            }
        }
    }

    /// Abandon the in-flight and pending jobs by replacing the worker
    /// thread. Outstanding handles resolve to a retryable error.
    pub fn cancel(&mut self) {
        self.worker.recreate();
    }

    /// Drop every cached result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of cached results.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Tear the session down, joining the worker thread.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use image::Rgba;

    use super::*;

    fn square_image() -> RgbaImage {
        RgbaImage::from_fn(60, 60, |x, y| {
            if (15..45).contains(&x) && (15..45).contains(&y) {
                Rgba([10, 10, 10, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn config() -> ContourConfig {
        ContourConfig {
            target_width_inches: 1.0,
            ..ContourConfig::default()
        }
    }

    #[test]
    fn generates_and_caches_a_contour() {
        let mut session = Session::new();
        let first = session.generate(square_image(), config());
        assert!(!first.is_cached());
        let data = session.resolve(first).unwrap();
        assert!(!data.path.is_empty());
        assert_eq!(session.cache_len(), 1);

        let second = session.generate(square_image(), config());
        assert!(second.is_cached());
        let replay = session.resolve(second).unwrap();
        assert_eq!(replay.path, data.path);
    }

    #[test]
    fn config_change_misses_the_cache() {
        let mut session = Session::new();
        let first = session.generate(square_image(), config());
        session.resolve(first).unwrap();

        let tweaked = ContourConfig {
            offset_inches: 0.25,
            ..config()
        };
        let second = session.generate(square_image(), tweaked);
        assert!(!second.is_cached());
        session.resolve(second).unwrap();
        assert_eq!(session.cache_len(), 2);
    }

    #[test]
    fn clear_cache_forces_regeneration() {
        let mut session = Session::new();
        let first = session.generate(square_image(), config());
        session.resolve(first).unwrap();
        session.clear_cache();
        assert_eq!(session.cache_len(), 0);
        assert!(!session.generate(square_image(), config()).is_cached());
    }

    #[test]
    fn cancel_then_retry_succeeds() {
        let mut session = Session::new();
        let pending = session.generate(square_image(), config());
        session.cancel();
        match session.resolve(pending) {
            // Depending on timing the job may have finished first.
            Ok(data) => assert!(!data.path.is_empty()),
            Err(SessionError::Worker(e)) => assert_eq!(e, WorkerError::Recreated),
            Err(other) => panic!("unexpected error: {other}"),
        }
        let retry = session.generate(square_image(), config());
        assert!(session.resolve(retry).is_ok());
    }

    #[test]
    fn pipeline_errors_surface_as_contour_errors() {
        let mut session = Session::new();
        let empty = RgbaImage::new(0, 0);
        let pending = session.generate(empty, config());
        let err = session.resolve(pending).unwrap_err();
        assert!(matches!(err, SessionError::Contour(_)));
    }
}
