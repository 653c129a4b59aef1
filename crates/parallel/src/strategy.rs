//! Parallel processing strategies

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::Arc;

/// A dedicated worker pool, built once and shared by every pass that runs
/// with it. Clones refer to the same threads.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    threads: usize,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl WorkerPool {
    /// Spawn a pool of `threads` workers (at least one).
    ///
    /// If the pool cannot be built, passes fall back to the global pool.
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        Self {
            threads,
            #[cfg(feature = "parallel")]
            pool: rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .ok()
                .map(Arc::new),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl PartialEq for WorkerPool {
    fn eq(&self, other: &Self) -> bool {
        self.threads == other.threads
    }
}

/// How a pass distributes its independent work items
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool
    Pool(WorkerPool),
}

impl ProcessingMode {
    /// Parallel on a freshly built dedicated pool of `threads` workers
    pub fn with_threads(threads: usize) -> Self {
        ProcessingMode::Pool(WorkerPool::new(threads))
    }
}

/// Strategy for mapping work items, preserving item order in the output
pub trait ParallelStrategy {
    /// Fallible map over indices, collected in index order; the first error
    /// (in completion order) aborts the collection
    fn try_par_map<T, E, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>, E>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn try_par_map<T, E, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>, E>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::Pool(workers) => match &workers.pool {
                Some(pool) => pool.install(|| range.into_par_iter().map(f).collect()),
                None => range.into_par_iter().map(f).collect(),
            },
            #[cfg(not(feature = "parallel"))]
            _ => range.map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(i: usize) -> Result<usize, String> {
        Ok(i * i)
    }

    #[test]
    fn test_modes_agree() {
        let expected: Vec<usize> = (0..100).map(|i| i * i).collect();
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::with_threads(2),
        ] {
            assert_eq!(mode.try_par_map(0..100, square).unwrap(), expected, "{:?}", mode);
        }
    }

    #[test]
    fn test_pool_is_reused_across_passes() {
        let mode = ProcessingMode::with_threads(3);
        let copy = mode.clone();
        #[cfg(feature = "parallel")]
        if let (ProcessingMode::Pool(a), ProcessingMode::Pool(b)) = (&mode, &copy) {
            match (&a.pool, &b.pool) {
                (Some(x), Some(y)) => assert!(Arc::ptr_eq(x, y)),
                _ => panic!("pool was not built"),
            }
        }
        for _ in 0..4 {
            assert_eq!(copy.try_par_map(0..10, square).unwrap().len(), 10);
        }
        assert_eq!(mode, ProcessingMode::Pool(WorkerPool::new(3)));
    }

    #[test]
    fn test_zero_threads_clamped() {
        assert_eq!(WorkerPool::new(0).threads(), 1);
    }

    #[test]
    fn test_try_par_map_propagates_error() {
        let result: Result<Vec<usize>, String> = ProcessingMode::Parallel
            .try_par_map(0..50, |i| if i == 17 { Err(format!("bad {}", i)) } else { Ok(i) });
        assert_eq!(result.unwrap_err(), "bad 17");
    }
}
