//! Image planes and plane sources.
//!
//! A plane is a dense row-major `f32` intensity field. A `PlaneSource` hands
//! out planes by 1-based slice index, the same convention as the slice range.

use std::borrow::Cow;

use image::{ImageBuffer, Luma};

use crate::error::{EvaluationError, FitError};

/// A 2D scalar field of known width and height.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl ImagePlane {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, EvaluationError> {
        if data.len() != width * height {
            return Err(EvaluationError::MalformedPlane {
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a plane by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Intensities in `[0, 1]`, as produced by `DynamicImage::to_luma32f`.
    pub fn from_luma32f(img: &ImageBuffer<Luma<f32>, Vec<f32>>) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel value at integer coordinates.
    ///
    /// # Panics
    /// Panics if `(x, y)` is outside the plane.
    pub fn value(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn pixels(&self) -> &[f32] {
        &self.data
    }

    /// 8-bit grayscale copy, mapping `[lo, hi]` linearly to `[0, 255]`.
    pub fn to_gray8(&self, lo: f32, hi: f32) -> image::GrayImage {
        let span = (hi - lo).max(f32::EPSILON);
        let raw: Vec<u8> = self
            .data
            .iter()
            .map(|&v| (((v - lo) / span).clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        image::GrayImage::from_raw(self.width as u32, self.height as u32, raw)
            .unwrap_or_else(|| image::GrayImage::new(self.width as u32, self.height as u32))
    }
}

/// Anything that can hand out image planes by 1-based slice index.
pub trait PlaneSource {
    /// Number of slices available (`1..=slice_count()`).
    fn slice_count(&self) -> usize;

    /// `(width, height)` shared by all planes.
    fn dimensions(&self) -> (usize, usize);

    /// The plane for `slice`.
    ///
    /// Failures are evaluation errors: the fitter decides whether to skip the
    /// slice or abort the run.
    fn plane(&self, slice: usize) -> Result<Cow<'_, ImagePlane>, FitError>;
}

/// In-memory stack of planes.
#[derive(Debug, Clone, Default)]
pub struct ImageStack {
    planes: Vec<ImagePlane>,
}

impl ImageStack {
    pub fn new(planes: Vec<ImagePlane>) -> Self {
        Self { planes }
    }

    pub fn push(&mut self, plane: ImagePlane) {
        self.planes.push(plane);
    }

    pub fn planes(&self) -> &[ImagePlane] {
        &self.planes
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}

impl PlaneSource for ImageStack {
    fn slice_count(&self) -> usize {
        self.planes.len()
    }

    fn dimensions(&self) -> (usize, usize) {
        self.planes
            .first()
            .map(|p| (p.width(), p.height()))
            .unwrap_or((0, 0))
    }

    fn plane(&self, slice: usize) -> Result<Cow<'_, ImagePlane>, FitError> {
        slice
            .checked_sub(1)
            .and_then(|i| self.planes.get(i))
            .map(Cow::Borrowed)
            .ok_or_else(|| {
                EvaluationError::PlaneUnavailable {
                    slice,
                    reason: format!("stack holds {} slices", self.planes.len()),
                }
                .into()
            })
    }
}
