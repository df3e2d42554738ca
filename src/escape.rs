// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time test.  A point `c` belongs to the (approximated)
//! Mandelbrot set when the orbit of `z ← z² + c`, started at zero,
//! stays inside the circle of radius 2 for the whole iteration budget.

use num::Complex;

/// Squared escape radius.  Comparing `|z|²` against this avoids a
/// square root in the inner loop.
pub const ESCAPE_RADIUS_SQR: f64 = 4.0;

/// The final per-pixel value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The orbit crossed the escape radius.
    Escaped,
    /// The orbit survived every iteration.
    Bounded,
}

impl Classification {
    /// The character used for this classification in the text grid.
    pub fn symbol(self) -> char {
        match self {
            Classification::Bounded => '#',
            Classification::Escaped => '.',
        }
    }

    /// Inverse of `symbol`.
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '#' => Some(Classification::Bounded),
            '.' => Some(Classification::Escaped),
            _ => None,
        }
    }

    pub(crate) fn to_bit(self) -> u64 {
        match self {
            Classification::Escaped => 0,
            Classification::Bounded => 1,
        }
    }

    pub(crate) fn from_bit(bit: u64) -> Self {
        if bit & 1 == 1 {
            Classification::Bounded
        } else {
            Classification::Escaped
        }
    }
}

/// Classify `c` within `max_iterations`.
///
/// The orbit values `z_0 = 0, z_1, …, z_{max_iterations-1}` are tested
/// against the escape radius; the point escapes as soon as one of them
/// has `|z|² >= 4`.  With a budget of one, only `z_0` is tested and
/// every point is bounded.
#[inline]
pub fn evaluate(c: Complex<f64>, max_iterations: u32) -> Classification {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    for _ in 1..max_iterations {
        if z.norm_sqr() >= ESCAPE_RADIUS_SQR {
            return Classification::Escaped;
        }
        z = z * z + c;
    }
    if z.norm_sqr() >= ESCAPE_RADIUS_SQR {
        Classification::Escaped
    } else {
        Classification::Bounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_iteration_bounds_everything() {
        for c in &[
            Complex::new(-1.5, -1.0),
            Complex::new(10.0, 10.0),
            Complex::new(0.0, 0.0),
        ] {
            assert_eq!(evaluate(*c, 1), Classification::Bounded);
        }
    }

    #[test]
    fn origin_never_escapes() {
        assert_eq!(evaluate(Complex::new(0.0, 0.0), 10_000), Classification::Bounded);
    }

    #[test]
    fn minus_one_cycles_forever() {
        // 0, -1, 0, -1, ...
        assert_eq!(evaluate(Complex::new(-1.0, 0.0), 5_000), Classification::Bounded);
    }

    #[test]
    fn far_points_escape_on_the_second_test() {
        // z_1 = c, |c|² = 8
        assert_eq!(evaluate(Complex::new(2.0, 2.0), 1), Classification::Bounded);
        assert_eq!(evaluate(Complex::new(2.0, 2.0), 2), Classification::Escaped);
    }

    #[test]
    fn escape_is_inclusive_at_the_radius() {
        // z_1 = -2, |z_1|² = 4 exactly
        assert_eq!(evaluate(Complex::new(-2.0, 0.0), 2), Classification::Escaped);
    }

    #[test]
    fn boundary_neighbourhood() {
        assert_eq!(evaluate(Complex::new(0.25, 0.0), 1_000), Classification::Bounded);
        assert_eq!(evaluate(Complex::new(0.3, 0.0), 1_000), Classification::Escaped);
        assert_eq!(evaluate(Complex::new(-1.5, -1.0), 50), Classification::Escaped);
    }

    #[test]
    fn symbols_round_trip() {
        assert_eq!(Classification::Bounded.symbol(), '#');
        assert_eq!(Classification::Escaped.symbol(), '.');
        assert_eq!(Classification::from_symbol('#'), Some(Classification::Bounded));
        assert_eq!(Classification::from_symbol('x'), None);
        assert_eq!(
            Classification::from_bit(Classification::Bounded.to_bit()),
            Classification::Bounded
        );
    }
}
