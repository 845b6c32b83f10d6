//! Bounded-concurrency OCR.
//!
//! OCR dominates the cost of a run, so every recognition in a batch goes
//! through one shared [`OcrPool`] whose semaphore caps the number of
//! engine calls in flight, independent of how many documents are open.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{OcrEngine, OcrError};

/// A cloneable handle to an engine plus a shared concurrency limit.
#[derive(Clone)]
pub struct OcrPool {
    engine: Arc<dyn OcrEngine>,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl std::fmt::Debug for OcrPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrPool")
            .field("engine", &self.engine.name())
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl OcrPool {
    /// Creates a pool allowing at most `limit` concurrent recognitions.
    /// A limit of zero is raised to one.
    #[must_use]
    pub fn new(engine: Arc<dyn OcrEngine>, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            engine,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Maximum number of concurrent recognitions.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Recognizes `image`, waiting for a free slot first.
    ///
    /// # Errors
    ///
    /// Returns the engine's error.
    pub async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        // The semaphore is never closed, so acquiring only waits.
        let _permit = self.permits.acquire().await.ok();
        self.engine.recognize(image).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::PassthroughOcr;

    #[derive(Default)]
    struct CountingOcr {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for CountingOcr {
        async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(image).into_owned())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let engine = Arc::new(CountingOcr::default());
        let pool = OcrPool::new(engine.clone(), 2);

        let jobs = (0..8).map(|i| {
            let pool = pool.clone();
            async move { pool.recognize(format!("page {i}").as_bytes()).await }
        });
        let results = futures::future::join_all(jobs).await;

        assert!(results.iter().all(Result::is_ok));
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_limit_is_raised_to_one() {
        let pool = OcrPool::new(Arc::new(PassthroughOcr), 0);
        assert_eq!(pool.limit(), 1);
        assert_eq!(pool.recognize(b"ok").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn failed_recognition_frees_its_slot() {
        let pool = OcrPool::new(Arc::new(PassthroughOcr), 1);
        assert!(matches!(
            pool.recognize(&[0xff, 0xfe]).await,
            Err(OcrError::InvalidUtf8(_))
        ));

        let next = tokio::time::timeout(Duration::from_secs(1), pool.recognize(b"next"))
            .await
            .unwrap();
        assert_eq!(next.unwrap(), "next");
    }
}
