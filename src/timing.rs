// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Timing observations, one `;`-separated line per run:
//! `name; parameters; cores; microseconds`.  A speedup chart is drawn
//! from these elsewhere.

use crate::config::RenderConfig;
use crate::errors::RenderError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// One `(cores, elapsed)` observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Series name.
    pub name: String,
    /// Free-form description of the task.
    pub parameters: String,
    /// Worker threads used.
    pub cores: usize,
    /// Wall time of the render.
    pub elapsed: Duration,
}

impl Observation {
    /// An observation of a render of `config` that took `elapsed`.
    pub fn of(config: &RenderConfig, elapsed: Duration) -> Self {
        Observation {
            name: "mandelbrot".to_string(),
            parameters: format!("{}x{}x{}", config.rows, config.cols, config.max_iterations),
            cores: config.workers,
            elapsed,
        }
    }

    /// The log line, without terminator.
    pub fn to_line(&self) -> String {
        let micros = self.elapsed.as_secs() * 1_000_000 + u64::from(self.elapsed.subsec_micros());
        format!(
            "{}; {}; {}; {}",
            self.name, self.parameters, self.cores, micros
        )
    }

    /// Appends the line to `path`, creating the file if needed.
    pub fn append_to<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let mut log = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(log, "{}", self.to_line())?;
        Ok(())
    }
}
