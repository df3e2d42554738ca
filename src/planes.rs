// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane with an arbitrary pair of
//! corners defining the leftlower and rightupper corners.  Pixels are
//! addressed by a single linear index, row-major.
use crate::errors::RenderError;
use num::Complex;

/// Describes the width (columns) and height (rows) of an integral
/// plane that is assumed to start at 0,0.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the lower-left corner and upper-right corner of the
/// complex plane, treating the real part of each value as the
/// x-component and the imaginary part as the y-component.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlane(pub Complex<f64>, pub Complex<f64>);

impl ComplexPlane {
    /// Real axis [-1.5, 0.5], imaginary axis [-1.0, 1.0].
    pub fn classic() -> Self {
        ComplexPlane(Complex::new(-1.5, -1.0), Complex::new(0.5, 1.0))
    }

    /// Rejects corners that do not describe a rectangle with positive
    /// area and finite coordinates.
    pub fn validate(&self) -> Result<(), RenderError> {
        let (leftlower, rightupper) = (self.0, self.1);
        let finite = [leftlower.re, leftlower.im, rightupper.re, rightupper.im]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(RenderError::configuration(
                "plane",
                "corners must be finite numbers",
            ));
        }
        if rightupper.re <= leftlower.re {
            return Err(RenderError::configuration(
                "plane",
                "the left lower corner is not to the left of the right upper corner",
            ));
        }
        if rightupper.im <= leftlower.im {
            return Err(RenderError::configuration(
                "plane",
                "the left lower corner is not lower than the right upper corner",
            ));
        }
        Ok(())
    }
}

impl Default for ComplexPlane {
    fn default() -> Self {
        ComplexPlane::classic()
    }
}

/// Describes the column and row of a pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of an integral plane onto points of a complex plane.
/// The transform is affine and pure, so every thread holding a
/// reference gets the same answer for the same pixel.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// Columns and rows of the integral plane.
    pub integral_plane: IntegralPlane,
    /// The two corners of the complex plane.
    pub complex_plane: ComplexPlane,
    // Distance on the complex plane between two neighbouring pixels,
    // horizontally and vertically.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the integral plane and the two
    /// corners of the complex plane.
    pub fn new(width: usize, height: usize, plane: ComplexPlane) -> Result<PlaneMapper, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::configuration(
                "plane",
                "the integral plane must have at least one pixel",
            ));
        }
        plane.validate()?;

        let region_width = plane.1.re - plane.0.re;
        let region_height = plane.1.im - plane.0.im;

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            complex_plane: plane,
            steps: (region_width / (width as f64), region_height / (height as f64)),
        })
    }

    /// The total number of points in the integral grid.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits a linear, row-major index into its column and row.
    #[inline]
    pub fn index_to_pixel(&self, index: usize) -> Pixel {
        let cols = self.integral_plane.0;
        Pixel(index % cols, index / cols)
    }

    /// Given a pixel on the integral cartesian plane, map it to the
    /// corresponding point on the complex cartesian plane.
    #[inline]
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.complex_plane.0.re + (pixel.0 as f64) * self.steps.0,
            self.complex_plane.0.im + (pixel.1 as f64) * self.steps.1,
        )
    }

    /// The point for a linear pixel index.
    #[inline]
    pub fn index_to_point(&self, index: usize) -> Complex<f64> {
        self.pixel_to_point(&self.index_to_pixel(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let pm = PlaneMapper::new(
            4,
            4,
            ComplexPlane(Complex::new(-1.0, 1.0), Complex::new(1.0, -1.0)),
        );
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_fails_on_flat_shape() {
        let pm = PlaneMapper::new(
            4,
            4,
            ComplexPlane(Complex::new(-1.0, 1.0), Complex::new(1.0, 1.0)),
        );
        assert!(pm.is_err());
    }

    #[test]
    fn planemapper_fails_on_empty_grid() {
        assert!(PlaneMapper::new(0, 4, ComplexPlane::classic()).is_err());
        assert!(PlaneMapper::new(4, 0, ComplexPlane::classic()).is_err());
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(
            4,
            4,
            ComplexPlane(Complex::new(-1.0, -1.0), Complex::new(1.0, 1.0)),
        );
        assert!(pm.is_ok());
    }

    #[test]
    fn index_splits_row_major() {
        let pm = PlaneMapper::new(3, 2, ComplexPlane::classic()).unwrap();
        assert_eq!(pm.len(), 6);
        assert_eq!(pm.index_to_pixel(0), Pixel(0, 0));
        assert_eq!(pm.index_to_pixel(2), Pixel(2, 0));
        assert_eq!(pm.index_to_pixel(3), Pixel(0, 1));
        assert_eq!(pm.index_to_pixel(5), Pixel(2, 1));
    }

    #[test]
    fn pixel_to_point_on_positive_planes() {
        let pm = PlaneMapper::new(
            5,
            5,
            ComplexPlane(Complex::new(0.0, 0.0), Complex::new(5.0, 5.0)),
        )
        .unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(2.0, 2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(4.0, 4.0));
    }

    #[test]
    fn classic_plane_on_a_two_by_two_grid() {
        let pm = PlaneMapper::new(2, 2, ComplexPlane::classic()).unwrap();
        assert_eq!(pm.index_to_point(0), Complex::new(-1.5, -1.0));
        assert_eq!(pm.index_to_point(1), Complex::new(-0.5, -1.0));
        assert_eq!(pm.index_to_point(2), Complex::new(-1.5, 0.0));
        assert_eq!(pm.index_to_point(3), Complex::new(-0.5, 0.0));
    }

    #[test]
    fn columns_scale_the_real_axis_and_rows_the_imaginary() {
        let pm = PlaneMapper::new(4, 2, ComplexPlane::classic()).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(2, 1)), Complex::new(-0.5, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(3, 0)), Complex::new(0.0, -1.0));
    }
}
