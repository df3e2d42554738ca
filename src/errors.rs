// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ways a render can fail.  Everything that can go wrong with the
//! parameters is caught before a single thread is spawned; the
//! remaining variants describe broken threads or a broken grid.

use failure::Fail;
use std::io;

/// Errors produced by the renderer and its stream collaborators.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// A parameter is out of range.  Always reported before any
    /// thread starts.
    #[fail(display = "invalid {}: {}", field, reason)]
    Configuration {
        /// The offending parameter.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The task stream could not be parsed.
    #[fail(display = "could not read task parameters: {}", reason)]
    Input {
        /// What was missing or malformed.
        reason: String,
    },

    /// Reading or writing a stream failed.
    #[fail(display = "i/o failure: {}", _0)]
    Io(#[cause] io::Error),

    /// One of the render threads panicked.
    #[fail(display = "the {} thread panicked", role)]
    ThreadPanic {
        /// Which thread: distributor, collector or worker N.
        role: String,
    },

    /// The collector received the same pixel twice.
    #[fail(display = "pixel {} was assembled more than once", index)]
    PixelWrittenTwice {
        /// The duplicated pixel index.
        index: usize,
    },

    /// A result named a pixel outside the grid.
    #[fail(display = "pixel {} lies outside a grid of {} pixels", index, pixels)]
    PixelOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of cells in the grid.
        pixels: usize,
    },

    /// The grid was finalized with a cell nobody wrote.
    #[fail(display = "pixel {} was never assembled", index)]
    PixelMissing {
        /// The first missing pixel index.
        index: usize,
    },
}

impl RenderError {
    pub(crate) fn configuration<S: Into<String>>(field: &'static str, reason: S) -> Self {
        RenderError::Configuration {
            field,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(e: io::Error) -> Self {
        RenderError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message_names_the_field() {
        let e = RenderError::configuration("rows", "must be positive");
        assert_eq!(format!("{}", e), "invalid rows: must be positive");
    }

    #[test]
    fn io_errors_convert() {
        let e: RenderError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        match e {
            RenderError::Io(_) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
