// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The output buffer.  A `GridBuilder` is filled by the collector one
//! cell at a time and refuses to write a cell twice; `finish` refuses
//! to produce a `Grid` with a hole in it.

use crate::errors::RenderError;
use crate::escape::Classification;
use image::pnm::{PNMEncoder, PNMSubtype, SampleEncoding};
use image::ColorType;
use itertools::Itertools;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Cells under construction, indexed `0 … rows*cols-1`.
#[derive(Debug)]
pub struct GridBuilder {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Classification>>,
}

impl GridBuilder {
    /// An empty builder for a `rows × cols` grid.  Both dimensions
    /// must be positive.
    pub fn new(rows: usize, cols: usize) -> Result<Self, RenderError> {
        if rows == 0 || cols == 0 {
            return Err(RenderError::configuration(
                "size",
                format!("a {}x{} grid has no pixels", rows, cols),
            ));
        }
        Ok(GridBuilder {
            rows,
            cols,
            cells: vec![None; rows * cols],
        })
    }

    /// Writes one cell.  Each index may be written exactly once.
    pub fn set(&mut self, index: usize, value: Classification) -> Result<(), RenderError> {
        match self.cells.get_mut(index) {
            Some(cell) if cell.is_some() => Err(RenderError::PixelWrittenTwice { index }),
            Some(cell) => {
                *cell = Some(value);
                Ok(())
            }
            None => Err(RenderError::PixelOutOfRange {
                index,
                pixels: self.cells.len(),
            }),
        }
    }

    /// Freezes the builder.  Fails on the first unwritten cell.
    pub fn finish(self) -> Result<Grid, RenderError> {
        let mut cells = Vec::with_capacity(self.cells.len());
        for (index, cell) in self.cells.into_iter().enumerate() {
            match cell {
                Some(value) => cells.push(value),
                None => return Err(RenderError::PixelMissing { index }),
            }
        }
        Ok(Grid {
            rows: self.rows,
            cols: self.cols,
            cells,
        })
    }
}

/// A finished image: one classification per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Classification>,
}

impl Grid {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Classification] {
        &self.cells
    }

    /// The cell at `row`, `col`, if inside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Classification> {
        if row < self.rows && col < self.cols {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// How many pixels never escaped.
    pub fn bounded_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| **c == Classification::Bounded)
            .count()
    }

    /// One line of symbols per row, without line terminators.
    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|c| c.symbol()).collect())
            .collect()
    }

    /// Writes `rows` lines of `cols` symbols, each followed by a newline.
    pub fn write_text<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", self.lines().iter().join("\n"))?;
        out.flush()
    }

    /// Writes a binary graymap: bounded pixels black, escaped white.
    pub fn write_pnm<W: Write>(&self, out: W) -> io::Result<()> {
        let pixels: Vec<u8> = self
            .cells
            .iter()
            .map(|c| match c {
                Classification::Bounded => 0,
                Classification::Escaped => 255,
            })
            .collect();
        let mut encoder =
            PNMEncoder::new(out).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
        encoder.encode(
            &pixels[..],
            self.cols as u32,
            self.rows as u32,
            ColorType::Gray(8),
        )?;
        Ok(())
    }

    /// `write_pnm` into a newly created file.
    pub fn save_pnm<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let output = File::create(path)?;
        self.write_pnm(output)?;
        Ok(())
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
