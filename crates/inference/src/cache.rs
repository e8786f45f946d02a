//! Process-wide holder for the loaded model.
//!
//! The first caller runs the loader; concurrent callers block until it
//! finishes and then share its outcome. Both success and failure are final.

use crate::error::InferenceError;
use crate::loader::{LoadedModel, ModelLoader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

pub struct ModelCache {
    loader: Box<dyn ModelLoader>,
    slot: OnceLock<Result<Arc<LoadedModel>, InferenceError>>,
    loading: AtomicBool,
}

impl ModelCache {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slot: OnceLock::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// The loaded model, loading it on first use.
    ///
    /// A failed load is returned as the original error, to this caller and
    /// to every later one.
    pub fn load(&self) -> Result<Arc<LoadedModel>, InferenceError> {
        self.slot
            .get_or_init(|| {
                let _flag = LoadingFlag::raise(&self.loading);
                let outcome = self.loader.load().map(Arc::new);
                if let Err(e) = &outcome {
                    tracing::error!(error = %e, "Model load failed");
                }
                outcome
            })
            .clone()
    }

    /// Like [`Self::load`], for callers that need a model to serve a request.
    /// A failed load is reported as `ModelUnavailable` wrapping the cause.
    pub fn get(&self) -> Result<Arc<LoadedModel>, InferenceError> {
        self.load()
            .map_err(|e| InferenceError::ModelUnavailable(Box::new(e)))
    }

    pub fn state(&self) -> CacheState {
        match self.slot.get() {
            Some(Ok(_)) => CacheState::Ready,
            Some(Err(_)) => CacheState::Failed,
            None if self.loading.load(Ordering::Acquire) => CacheState::Loading,
            None => CacheState::Unloaded,
        }
    }
}

/// Marks a load in progress. A loader that panics leaves the cell empty, so
/// the mark is cleared again while unwinding.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;
    use crate::registry::ClassList;
    use preprocess::ImageTensor;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Barrier, mpsc};
    use std::thread;
    use std::time::Duration;

    struct Constant;

    impl InferenceBackend for Constant {
        fn forward(&self, _input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            Ok(vec![0.0])
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        outcome: Result<(), InferenceError>,
    }

    impl ModelLoader for Counting {
        fn load(&self) -> Result<LoadedModel, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            self.outcome.clone()?;
            Ok(LoadedModel {
                classes: Arc::new(ClassList::new(vec!["healthy".to_string()])),
                network: Box::new(Constant),
            })
        }
    }

    fn counting(outcome: Result<(), InferenceError>) -> (ModelCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ModelCache::new(Counting {
            calls: Arc::clone(&calls),
            outcome,
        });
        (cache, calls)
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let (cache, calls) = counting(Ok(()));
        let cache = Arc::new(cache);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get().unwrap()
                })
            })
            .collect();
        let models: Vec<Arc<LoadedModel>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
        assert_eq!(cache.state(), CacheState::Ready);
    }

    #[test]
    fn test_failure_is_terminal_and_not_retried() {
        let cause = InferenceError::ArchitectureMismatch("fc.weight".to_string());
        let (cache, calls) = counting(Err(cause.clone()));

        let first = cache.load().unwrap_err();
        let second = cache.get().unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, cause);
        assert_eq!(second, InferenceError::ModelUnavailable(Box::new(cause)));
        assert_eq!(cache.state(), CacheState::Failed);
    }

    struct Panicking {
        calls: Arc<AtomicUsize>,
    }

    impl ModelLoader for Panicking {
        fn load(&self) -> Result<LoadedModel, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("loader exploded");
        }
    }

    #[test]
    fn test_panicking_loader_does_not_stick_in_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(ModelCache::new(Panicking {
            calls: Arc::clone(&calls),
        }));

        let outcome = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.load().map(|_| ())).join()
        };

        assert!(outcome.is_err());
        assert_eq!(cache.state(), CacheState::Unloaded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_state_walks_through_loading() {
        let (cache, _) = counting(Ok(()));
        let cache = Arc::new(cache);
        assert_eq!(cache.state(), CacheState::Unloaded);

        let (tx, rx) = mpsc::channel();
        let loader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                tx.send(()).unwrap();
                cache.get().map(|_| ())
            })
        };

        rx.recv().unwrap();
        // The counting loader sleeps long enough to observe the transition
        while cache.state() == CacheState::Unloaded {
            thread::yield_now();
        }
        let observed = cache.state();
        loader.join().unwrap().unwrap();

        assert!(matches!(observed, CacheState::Loading | CacheState::Ready));
        assert_eq!(cache.state(), CacheState::Ready);
    }
}
