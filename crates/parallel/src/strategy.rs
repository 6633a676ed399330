//! Parallel processing strategies

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use obia_core::{Error, Result};

/// Processing mode for filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Number of workers this mode runs with
    pub fn worker_count(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(threads) => (*threads).max(1),
        }
    }

    /// Run `f` on the thread pool matching this mode.
    ///
    /// `ParallelWith` builds a dedicated pool for the call; a pool that
    /// cannot be created is reported as an error.
    pub fn install<R, F>(&self, f: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self {
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads((*threads).max(1))
                    .build()
                    .map_err(|e| Error::Other(format!("failed to build thread pool: {e}")))?;
                Ok(pool.install(f))
            }
            _ => Ok(f()),
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Execute a function over indices in parallel
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F) -> Result<()>
    where
        F: Fn(usize) + Sync + Send;

    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F) -> Result<()>
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => {
                range.for_each(f);
                Ok(())
            }
            #[cfg(feature = "parallel")]
            _ => self.install(|| range.into_par_iter().for_each(f)),
            #[cfg(not(feature = "parallel"))]
            _ => {
                range.for_each(f);
                Ok(())
            }
        }
    }

    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(range.map(f).collect()),
            #[cfg(feature = "parallel")]
            _ => self.install(|| range.into_par_iter().map(f).collect()),
            #[cfg(not(feature = "parallel"))]
            _ => Ok(range.map(f).collect()),
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_count() {
        assert_eq!(ProcessingMode::Sequential.worker_count(), 1);
        assert_eq!(ProcessingMode::ParallelWith(3).worker_count(), 3);
        assert_eq!(ProcessingMode::ParallelWith(0).worker_count(), 1);
        assert!(ProcessingMode::Parallel.worker_count() >= 1);
    }

    #[test]
    fn test_par_map_keeps_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let squares = mode.par_map(0..50, |i| i * i).unwrap();
            assert_eq!(squares.len(), 50);
            assert_eq!(squares[7], 49);
        }
    }

    #[test]
    fn test_par_for_each_visits_all() {
        let count = AtomicUsize::new(0);
        ProcessingMode::ParallelWith(4)
            .par_for_each(0..100, |_| {
                count.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 100);
    }
}
