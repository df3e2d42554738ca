// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Render parameters, where they come from, and the checks they must
//! pass before any thread is started.

use crate::errors::RenderError;
use crate::planes::ComplexPlane;
use std::env;
use std::io::BufRead;

/// Slots per worker input queue.
pub const DEFAULT_INPUT_DEPTH: usize = 16;

/// Slots per worker output queue.  Shallower than the input side, so
/// backpressure lands on the distributor rather than the collector.
pub const DEFAULT_OUTPUT_DEPTH: usize = 8;

/// Pixel indices travel through the queues as `u32`.
pub const MAX_PIXELS: usize = u32::max_value() as usize;

/// Environment variable holding the worker count.
pub const WORKERS_ENV: &str = "MAX_CPUS";

/// Everything a render needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Image height in pixels.
    pub rows: usize,
    /// Image width in pixels.
    pub cols: usize,
    /// Iteration budget per pixel.
    pub max_iterations: u32,
    /// Number of worker threads.
    pub workers: usize,
    /// Capacity of each worker's input queue.
    pub input_depth: usize,
    /// Capacity of each worker's output queue.
    pub output_depth: usize,
    /// The region of the complex plane the grid covers.
    pub plane: ComplexPlane,
}

impl RenderConfig {
    /// A single-worker configuration over the classic plane.
    pub fn new(rows: usize, cols: usize, max_iterations: u32) -> Self {
        RenderConfig {
            rows,
            cols,
            max_iterations,
            workers: 1,
            input_depth: DEFAULT_INPUT_DEPTH,
            output_depth: DEFAULT_OUTPUT_DEPTH,
            plane: ComplexPlane::classic(),
        }
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets both queue capacities.
    pub fn with_queue_depths(mut self, input_depth: usize, output_depth: usize) -> Self {
        self.input_depth = input_depth;
        self.output_depth = output_depth;
        self
    }

    /// Sets the complex region.
    pub fn with_plane(mut self, plane: ComplexPlane) -> Self {
        self.plane = plane;
        self
    }

    /// `rows * cols`.  Only meaningful once `validate` has passed.
    pub fn pixels(&self) -> usize {
        self.rows * self.cols
    }

    /// Checks every parameter.
    pub fn validate(&self) -> Result<(), RenderError> {
        positive("rows", self.rows)?;
        positive("cols", self.cols)?;
        positive("max_iterations", self.max_iterations as usize)?;
        positive("workers", self.workers)?;
        positive("input_depth", self.input_depth)?;
        positive("output_depth", self.output_depth)?;
        match self.rows.checked_mul(self.cols) {
            Some(pixels) if pixels <= MAX_PIXELS => {}
            _ => {
                return Err(RenderError::configuration(
                    "size",
                    format!("{}x{} exceeds {} pixels", self.rows, self.cols, MAX_PIXELS),
                ))
            }
        }
        self.plane.validate()
    }
}

fn positive(field: &'static str, value: usize) -> Result<(), RenderError> {
    if value == 0 {
        Err(RenderError::configuration(field, "must be a positive integer"))
    } else {
        Ok(())
    }
}

/// The three numbers of a task stream.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Task {
    /// Image height.
    pub rows: usize,
    /// Image width.
    pub cols: usize,
    /// Iteration budget.
    pub max_iterations: u32,
}

impl Task {
    /// A single-worker configuration for this task.
    pub fn into_config(self) -> RenderConfig {
        RenderConfig::new(self.rows, self.cols, self.max_iterations)
    }
}

/// Reads `rows cols max_iterations`, separated by any whitespace.
/// Anything after the third number is ignored.
pub fn read_task<R: BufRead>(mut input: R) -> Result<Task, RenderError> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let mut tokens = text.split_whitespace();
    let rows = next_number(&mut tokens, "rows")?;
    let cols = next_number(&mut tokens, "cols")?;
    let max_iterations = next_number(&mut tokens, "max_iterations")?;
    Ok(Task {
        rows,
        cols,
        max_iterations,
    })
}

fn next_number<'a, T, I>(tokens: &mut I, name: &str) -> Result<T, RenderError>
where
    T: std::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    let token = tokens.next().ok_or_else(|| RenderError::Input {
        reason: format!("missing {}", name),
    })?;
    token.parse().map_err(|_| RenderError::Input {
        reason: format!("{} is not an unsigned integer: {:?}", name, token),
    })
}

/// Interprets the value of `MAX_CPUS`.  Unset means one worker.
pub fn workers_from_var(value: Option<&str>) -> Result<usize, RenderError> {
    match value {
        None => Ok(1),
        Some(v) => match v.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(RenderError::configuration(
                "workers",
                format!("{} must be a positive integer, got {:?}", WORKERS_ENV, v),
            )),
            Ok(n) => Ok(n),
        },
    }
}

/// Reads the worker count from the environment.
pub fn workers_from_env() -> Result<usize, RenderError> {
    let value = env::var(WORKERS_ENV).ok();
    workers_from_var(value.as_ref().map(String::as_str))
}
