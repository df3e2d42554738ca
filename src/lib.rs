#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer with hand-off queues
//!
//! The Mandelbrot set is the set of points `c` on the complex plane
//! for which the orbit of `z ← z² + c`, started at zero, never leaves
//! the circle of radius 2.  This crate approximates it on a fixed grid
//! of pixels with an iteration budget, producing one symbol per pixel:
//! `#` for points that stayed bounded, `.` for points that escaped.
//!
//! The work is spread over a pool of worker threads.  Each worker owns
//! a small input queue and a small output queue; a single distributor
//! thread fills the input queues round-robin and a single collector
//! thread drains the output queues into the grid.  Each queue has one
//! producer and one consumer and is a ring of atomic slots, so no locks
//! are taken anywhere.  See `render` for the shutdown sequence.

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate log;
extern crate num;

pub mod config;
pub mod errors;
pub mod escape;
pub mod grid;
pub mod planes;
pub mod queue;
pub mod render;
pub mod timing;

pub use config::{read_task, workers_from_env, RenderConfig, Task};
pub use errors::RenderError;
pub use escape::{evaluate, Classification};
pub use grid::Grid;
pub use planes::{ComplexPlane, PlaneMapper};
pub use render::{render, RenderReport, WorkerReport};
pub use timing::Observation;
