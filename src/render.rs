// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The threaded renderer.
//!
//! One distributor thread hands pixel indices to the workers'
//! input queues in round-robin order.  Each worker pops an index,
//! classifies the pixel and pushes the result onto its own output
//! queue.  One collector thread sweeps the output queues and writes
//! every result into the grid.  Every queue has exactly one writer
//! and one reader, so all hand-offs are lock-free.
//!
//! Shutdown is sequenced by `render` itself: the distributor is
//! joined, then the collector, and only then is the abort flag raised
//! and the workers joined.  Raising the flag any earlier could let a
//! worker leave a result behind in its output queue.
//!
//! All waiting is spinning.  There is no timeout: a thread that stops
//! making progress leaves its peers spinning forever.

use crate::config::RenderConfig;
use crate::errors::RenderError;
use crate::escape::{evaluate, Classification};
use crate::grid::{Grid, GridBuilder};
use crate::planes::PlaneMapper;
use crate::queue::{slot_queue, Consumer, Producer, SlotValue};
use crossbeam::thread::{self, ScopedJoinHandle};
use crossbeam::utils::{Backoff, CachePadded};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// A classified pixel on its way back to the collector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelResult {
    /// Linear index of the pixel.
    pub index: u32,
    /// Its classification.
    pub value: Classification,
}

// The index occupies the upper 33 bits and the classification the
// lowest one; the largest encoding is 2^33 - 1, far below the sentinel.
impl SlotValue for PixelResult {
    #[inline]
    fn encode(self) -> u64 {
        (u64::from(self.index) << 1) | self.value.to_bit()
    }

    #[inline]
    fn decode(raw: u64) -> Self {
        PixelResult {
            index: (raw >> 1) as u32,
            value: Classification::from_bit(raw),
        }
    }
}

/// The only state shared outside the queues.  Each field has a single
/// writer: `dispatched` the distributor, `collected` the collector and
/// `abort` the thread running `render`.
#[derive(Debug, Default)]
pub struct RenderState {
    dispatched: CachePadded<AtomicUsize>,
    collected: CachePadded<AtomicUsize>,
    abort: CachePadded<AtomicBool>,
}

impl RenderState {
    /// Fresh counters, flag down.
    pub fn new() -> Self {
        RenderState::default()
    }

    /// Pixels accepted by some input queue so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Pixels written into the grid so far.
    pub fn collected(&self) -> usize {
        self.collected.load(Ordering::Acquire)
    }

    /// Whether workers have been released.
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    fn raise_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }
}

/// What one worker did.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorkerReport {
    /// Pixels the distributor put on this worker's input queue.
    pub dispatched: usize,
    /// Pixels this worker classified.
    pub processed: usize,
    /// Whether the collector had emptied this worker's output queue by
    /// the time the worker exited.
    pub drained_on_exit: bool,
    /// Time spent in the worker loop, from its first poll to its exit.
    pub elapsed: Duration,
}

/// The outcome of a render.
#[derive(Debug)]
pub struct RenderReport {
    /// The finished image.
    pub grid: Grid,
    /// One entry per worker, in worker order.
    pub workers: Vec<WorkerReport>,
    /// Final value of the distributor's counter.
    pub dispatched: usize,
    /// Final value of the collector's counter.
    pub collected: usize,
    /// Validation, plane setup and queue allocation, before any spawn.
    pub preparation: Duration,
    /// From the first spawn until the distributor was joined.
    pub dispatching: Duration,
    /// From the first spawn until the collector was joined.
    pub collecting: Duration,
    /// Wall time from the first spawn to the last join.
    pub elapsed: Duration,
}

#[derive(Copy, Clone, Debug)]
struct WorkerSummary {
    processed: usize,
    drained_on_exit: bool,
    elapsed: Duration,
}

// Offsets from the first spawn at which each join returned.
#[derive(Copy, Clone, Debug)]
struct Phases {
    dispatching: Duration,
    collecting: Duration,
}

/// Feeds `0 … total-1` to the input queues, pixel `p` to worker
/// `p % workers`.  Returns how many pixels each worker received.
fn distribute(mut inputs: Vec<Producer<u32>>, total: usize, state: &RenderState) -> Vec<usize> {
    let workers = inputs.len();
    let mut counts = vec![0; workers];
    for index in 0..total {
        let worker = index % workers;
        inputs[worker].push(index as u32);
        counts[worker] += 1;
        state.dispatched.store(index + 1, Ordering::Release);
    }
    counts
}

/// Classifies pixels until the input queue is empty and the abort flag
/// is up.  The queue is polled once more after the flag is seen, so a
/// value that raced in is not stranded.
fn work(
    mut input: Consumer<u32>,
    mut output: Producer<PixelResult>,
    plane: &PlaneMapper,
    max_iterations: u32,
    state: &RenderState,
) -> WorkerSummary {
    let started = Instant::now();
    let backoff = Backoff::new();
    let mut processed = 0;
    loop {
        let index = match input.try_pop() {
            Some(index) => index,
            None if !state.is_aborted() => {
                backoff.snooze();
                continue;
            }
            None => match input.try_pop() {
                Some(index) => index,
                None => break,
            },
        };
        backoff.reset();

        let value = evaluate(plane.index_to_point(index as usize), max_iterations);
        output.push(PixelResult { index, value });
        processed += 1;
    }
    WorkerSummary {
        processed,
        drained_on_exit: output.is_drained(),
        elapsed: started.elapsed(),
    }
}

/// Sweeps the output queues round-robin, emptying each before moving
/// on, until `rows * cols` results have been assembled.  A bad result
/// is remembered, not acted on, so the workers are never left blocked
/// on a full output queue.
fn collect(
    mut outputs: Vec<Consumer<PixelResult>>,
    rows: usize,
    cols: usize,
    state: &RenderState,
) -> Result<Grid, RenderError> {
    let total = rows * cols;
    let mut builder = GridBuilder::new(rows, cols)?;
    let mut first_error = None;
    let mut count = 0;
    let backoff = Backoff::new();
    while count < total {
        let before = count;
        for queue in outputs.iter_mut() {
            while let Some(result) = queue.try_pop() {
                if let Err(e) = builder.set(result.index as usize, result.value) {
                    first_error.get_or_insert(e);
                }
                count += 1;
                state.collected.store(count, Ordering::Release);
            }
        }
        if count == before {
            backoff.snooze();
        } else {
            backoff.reset();
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => builder.finish(),
    }
}

fn panicked(role: &str) -> RenderError {
    RenderError::ThreadPanic {
        role: role.to_string(),
    }
}

/// Joins the distributor, then the collector, then raises the abort
/// flag and joins the workers.  Every handle is joined whatever
/// happened to the previous one.
fn shut_down<'scope>(
    distributor: ScopedJoinHandle<'scope, Vec<usize>>,
    collector: ScopedJoinHandle<'scope, Result<Grid, RenderError>>,
    workers: Vec<ScopedJoinHandle<'scope, WorkerSummary>>,
    state: &RenderState,
    started: Instant,
) -> Result<(Vec<usize>, Grid, Vec<WorkerSummary>, Phases), RenderError> {
    let dispatched = distributor.join().map_err(|_| panicked("distributor"));
    let dispatching = started.elapsed();
    info!("finished providing the input, waiting for the collector");

    let grid = collector
        .join()
        .map_err(|_| panicked("collector"))
        .and_then(|grid| grid);
    let collecting = started.elapsed();
    info!("finished collecting the output, releasing the workers");

    state.raise_abort();
    let summaries: Result<Vec<WorkerSummary>, RenderError> = workers
        .into_iter()
        .enumerate()
        .map(|(i, handle)| {
            handle
                .join()
                .map_err(|_| panicked(&format!("worker {}", i)))
        })
        .collect();
    info!("all workers have exited");

    let phases = Phases {
        dispatching,
        collecting,
    };
    Ok((dispatched?, grid?, summaries?, phases))
}

/// Renders the grid described by `config`.
///
/// The configuration is validated before anything is spawned.  The
/// returned grid does not depend on the number of workers.
pub fn render(config: &RenderConfig) -> Result<RenderReport, RenderError> {
    let prepared = Instant::now();
    config.validate()?;
    let plane = PlaneMapper::new(config.cols, config.rows, config.plane)?;
    let (rows, cols, max_iterations) = (config.rows, config.cols, config.max_iterations);
    let total = config.pixels();

    info!("working with {} worker thread(s)", config.workers);
    info!(
        "creating a {}x{} image with a maximum of {} iterations",
        rows, cols, max_iterations
    );

    let (input_tx, input_rx): (Vec<_>, Vec<_>) = (0..config.workers)
        .map(|_| slot_queue::<u32>(config.input_depth))
        .unzip();
    let (output_tx, output_rx): (Vec<_>, Vec<_>) = (0..config.workers)
        .map(|_| slot_queue::<PixelResult>(config.output_depth))
        .unzip();

    let state = RenderState::new();
    let preparation = prepared.elapsed();
    let started = Instant::now();
    let outcome = thread::scope(|s| {
        let state = &state;
        let plane = &plane;

        let distributor = s.spawn(move |_| distribute(input_tx, total, state));
        let workers: Vec<_> = input_rx
            .into_iter()
            .zip(output_tx)
            .map(|(input, output)| {
                s.spawn(move |_| work(input, output, plane, max_iterations, state))
            })
            .collect();
        let collector = s.spawn(move |_| collect(output_rx, rows, cols, state));

        shut_down(distributor, collector, workers, state, started)
    })
    .map_err(|_| panicked("render scope"))?;
    let elapsed = started.elapsed();
    let (dispatched, grid, summaries, phases) = outcome?;

    let workers: Vec<WorkerReport> = dispatched
        .into_iter()
        .zip(summaries)
        .map(|(dispatched, summary)| WorkerReport {
            dispatched,
            processed: summary.processed,
            drained_on_exit: summary.drained_on_exit,
            elapsed: summary.elapsed,
        })
        .collect();
    debug!(
        "preparation {:?}, dispatching {:?}, collecting {:?}, total {:?}",
        preparation, phases.dispatching, phases.collecting, elapsed
    );
    for (i, worker) in workers.iter().enumerate() {
        debug!(
            "worker {}: {} dispatched, {} processed in {:?}",
            i, worker.dispatched, worker.processed, worker.elapsed
        );
    }

    Ok(RenderReport {
        grid,
        workers,
        dispatched: state.dispatched(),
        collected: state.collected(),
        preparation,
        dispatching: phases.dispatching,
        collecting: phases.collecting,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::ComplexPlane;

    #[test]
    fn result_encoding_stays_below_the_sentinel() {
        let worst = PixelResult {
            index: u32::max_value(),
            value: Classification::Bounded,
        };
        assert_ne!(worst.encode(), crate::queue::SENTINEL);
        assert_eq!(PixelResult::decode(worst.encode()), worst);
        let escaped = PixelResult {
            index: 12,
            value: Classification::Escaped,
        };
        assert_eq!(PixelResult::decode(escaped.encode()), escaped);
    }

    #[test]
    fn distributor_round_robins() {
        let (producers, mut consumers): (Vec<_>, Vec<_>) =
            (0..3).map(|_| slot_queue::<u32>(8)).unzip();
        let state = RenderState::new();
        let counts = distribute(producers, 7, &state);
        assert_eq!(counts, vec![3, 2, 2]);
        assert_eq!(state.dispatched(), 7);
        let first: Vec<u32> = std::iter::from_fn(|| consumers[0].try_pop()).collect();
        assert_eq!(first, vec![0, 3, 6]);
        let second: Vec<u32> = std::iter::from_fn(|| consumers[1].try_pop()).collect();
        assert_eq!(second, vec![1, 4]);
    }

    #[test]
    fn worker_exits_only_after_abort_and_drains_first() {
        let plane = PlaneMapper::new(2, 2, ComplexPlane::classic()).unwrap();
        let (mut input_tx, input_rx) = slot_queue::<u32>(4);
        let (output_tx, mut output_rx) = slot_queue::<PixelResult>(4);
        for i in 0..4 {
            input_tx.push(i);
        }
        let state = RenderState::new();
        state.raise_abort();
        let summary = thread::scope(|s| {
            let handle = s.spawn(|_| work(input_rx, output_tx, &plane, 1, &state));
            let mut seen = Vec::new();
            while seen.len() < 4 {
                if let Some(result) = output_rx.try_pop() {
                    seen.push(result);
                }
            }
            assert!(seen.iter().all(|r| r.value == Classification::Bounded));
            handle.join().unwrap()
        })
        .unwrap();
        assert_eq!(summary.processed, 4);
    }

    #[test]
    fn collector_reports_duplicates() {
        let (mut tx, rx) = slot_queue::<PixelResult>(4);
        let result = PixelResult {
            index: 0,
            value: Classification::Bounded,
        };
        tx.push(result);
        tx.push(result);
        let state = RenderState::new();
        match collect(vec![rx], 1, 2, &state) {
            Err(RenderError::PixelWrittenTwice { index: 0 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.collected(), 2);
    }

    #[test]
    fn invalid_configuration_spawns_nothing() {
        match render(&RenderConfig::new(0, 3, 3)) {
            Err(RenderError::Configuration { field: "rows", .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn single_pixel_single_worker() {
        let report = render(&RenderConfig::new(1, 1, 10)).unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.collected, 1);
        assert_eq!(report.workers.len(), 1);
        assert_eq!(report.workers[0].processed, 1);
        // c = -1.5 - i escapes within ten iterations
        assert_eq!(report.grid.to_string(), ".\n");
    }

    #[test]
    fn every_worker_and_phase_is_timed() {
        let report = render(&RenderConfig::new(24, 24, 100).with_workers(3)).unwrap();
        assert_eq!(report.workers.len(), 3);
        for worker in &report.workers {
            assert!(worker.elapsed > Duration::from_secs(0));
            assert!(worker.elapsed <= report.elapsed);
        }
        assert!(report.collecting > Duration::from_secs(0));
        assert!(report.dispatching <= report.collecting);
        assert!(report.collecting <= report.elapsed);
    }
}
