//! Per-object dispatch engine for label-map filters
//!
//! A filter visits every [`LabelObject`] of a map exactly once. Objects are
//! enumerated up front and workers claim them through a shared atomic
//! cursor, so no lock is held while an object is processed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use obia_core::{Error, Label, LabelMap, LabelObject, Result};
use tracing::{debug, trace};

use crate::ProcessingMode;

/// A filter applied independently to each object of a label map.
///
/// `before` and `after` run on the calling thread around the parallel
/// section; `process` may run on any worker and sees only its own object.
pub trait ObjectFilter<L: Label>: Sync {
    /// Name used in log events
    fn name(&self) -> &'static str;

    /// Single-threaded setup, e.g. building caches from the map
    fn before(&mut self, _map: &LabelMap<L>) -> Result<()> {
        Ok(())
    }

    /// Process one object
    fn process(&self, object: &mut LabelObject<L>) -> Result<()>;

    /// Single-threaded teardown. Runs even when `process` failed.
    fn after(&mut self, _map: &mut LabelMap<L>) -> Result<()> {
        Ok(())
    }
}

/// Run `filter` over every object of `map`.
///
/// The first error raised by `process` stops further claims and is
/// returned after `after` has run. Objects processed before the failure
/// keep whatever the filter wrote to them.
pub fn run_object_filter<L, F>(
    map: &mut LabelMap<L>,
    filter: &mut F,
    mode: ProcessingMode,
) -> Result<()>
where
    L: Label,
    F: ObjectFilter<L>,
{
    filter.before(map)?;

    let objects: Vec<Mutex<&mut LabelObject<L>>> = map.iter_mut().map(Mutex::new).collect();
    let workers = mode.worker_count().min(objects.len()).max(1);
    debug!(
        filter = filter.name(),
        objects = objects.len(),
        workers,
        "running object filter"
    );

    let result = dispatch(&objects, &*filter, mode, workers);
    drop(objects);

    let after = filter.after(map);
    result.and(after)
}

fn dispatch<L, F>(
    objects: &[Mutex<&mut LabelObject<L>>],
    filter: &F,
    mode: ProcessingMode,
    workers: usize,
) -> Result<()>
where
    L: Label,
    F: ObjectFilter<L>,
{
    let cursor = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let failure: Mutex<Option<Error>> = Mutex::new(None);

    let worker = || loop {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        let index = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(slot) = objects.get(index) else {
            break;
        };

        let outcome = match slot.lock() {
            Ok(mut object) => {
                trace!(filter = filter.name(), label = %object.label(), "processing object");
                filter.process(&mut **object)
            }
            Err(_) => Err(Error::Algorithm(format!(
                "object slot {index} poisoned by a panicking worker"
            ))),
        };

        if let Err(e) = outcome {
            abort.store(true, Ordering::Relaxed);
            if let Ok(mut first) = failure.lock() {
                first.get_or_insert(e);
            }
            break;
        }
    };

    run_workers(&worker, mode, workers)?;

    match failure.into_inner() {
        Ok(Some(e)) => Err(e),
        Ok(None) => Ok(()),
        Err(_) => Err(Error::Algorithm("error slot poisoned".to_string())),
    }
}

#[cfg(feature = "parallel")]
fn run_workers<W>(worker: &W, mode: ProcessingMode, workers: usize) -> Result<()>
where
    W: Fn() + Sync,
{
    if workers <= 1 {
        worker();
        return Ok(());
    }
    mode.install(|| {
        rayon::scope(|s| {
            for _ in 0..workers {
                s.spawn(move |_| worker());
            }
        })
    })
}

#[cfg(not(feature = "parallel"))]
fn run_workers<W>(worker: &W, _mode: ProcessingMode, _workers: usize) -> Result<()>
where
    W: Fn() + Sync,
{
    worker();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use obia_core::RunLengthLine;
    use std::sync::atomic::AtomicUsize;

    fn map_with(n: u32) -> LabelMap<u32> {
        let mut map = LabelMap::new(n as usize, 4, 0);
        for label in 1..=n {
            map.set_line(label as usize - 1, 0, (label as usize % 4) + 1, label)
                .unwrap();
        }
        map
    }

    struct SizeFilter {
        calls: AtomicUsize,
        torn_down: bool,
    }

    impl ObjectFilter<u32> for SizeFilter {
        fn name(&self) -> &'static str {
            "size"
        }

        fn process(&self, object: &mut LabelObject<u32>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let size = object.size() as f64;
            object.set_attribute("Size", size);
            Ok(())
        }

        fn after(&mut self, _map: &mut LabelMap<u32>) -> Result<()> {
            self.torn_down = true;
            Ok(())
        }
    }

    #[test]
    fn test_every_object_once() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(3),
        ] {
            let mut map = map_with(40);
            let mut filter = SizeFilter {
                calls: AtomicUsize::new(0),
                torn_down: false,
            };
            run_object_filter(&mut map, &mut filter, mode).unwrap();
            assert_eq!(filter.calls.load(Ordering::Relaxed), 40);
            assert!(filter.torn_down);
            for obj in map.iter() {
                assert_eq!(obj.attribute("Size").unwrap(), obj.size() as f64);
            }
        }
    }

    #[test]
    fn test_empty_map() {
        let mut map = LabelMap::<u32>::new(3, 3, 0);
        let mut filter = SizeFilter {
            calls: AtomicUsize::new(0),
            torn_down: false,
        };
        run_object_filter(&mut map, &mut filter, ProcessingMode::Parallel).unwrap();
        assert_eq!(filter.calls.load(Ordering::Relaxed), 0);
        assert!(filter.torn_down);
    }

    struct FailOn(u32);

    impl ObjectFilter<u32> for FailOn {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn process(&self, object: &mut LabelObject<u32>) -> Result<()> {
            if object.label() == self.0 {
                return Err(Error::attribute_not_found("Size", object.label()));
            }
            object.add_line(RunLengthLine::new(0, 0, 1));
            Ok(())
        }
    }

    #[test]
    fn test_error_propagates() {
        let mut map = map_with(20);
        let err = run_object_filter(&mut map, &mut FailOn(7), ProcessingMode::ParallelWith(4))
            .unwrap_err();
        assert_eq!(err, Error::attribute_not_found("Size", 7));
        // The failing object itself is never mutated
        assert_eq!(map.label_object(7).unwrap().number_of_lines(), 1);
    }
}
