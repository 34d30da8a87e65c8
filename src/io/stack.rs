//! Image stacks backed by files on disk.
//!
//! Inputs are image files or directories of image files. Directory entries
//! are taken in file-name order, so `slice_0001.png`, `slice_0002.png`, ...
//! map to slices 1, 2, ...
//!
//! Planes are decoded lazily per slice; `preload` decodes the whole stack up
//! front in parallel.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use crate::domain::{ImagePlane, ImageStack, PlaneSource, SliceRange};
use crate::error::{AppError, EXIT_INPUT, EvaluationError, FitError};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "tif", "tiff", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct FileStack {
    paths: Vec<PathBuf>,
    width: usize,
    height: usize,
}

impl FileStack {
    /// Collect slices from `inputs`. Plane size is taken from the first image.
    pub fn open(inputs: &[PathBuf]) -> Result<Self, AppError> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                paths.extend(list_images(input)?);
            } else if input.is_file() {
                paths.push(input.clone());
            } else {
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("Input '{}' does not exist.", input.display()),
                ));
            }
        }

        let first = paths
            .first()
            .ok_or_else(|| AppError::new(EXIT_INPUT, "No input images found."))?;
        let (width, height) = image::image_dimensions(first).map_err(|e| {
            AppError::new(
                EXIT_INPUT,
                format!("Failed to read image '{}': {e}", first.display()),
            )
        })?;

        info!(
            "stack: {} slice(s) of {width}x{height} from {} input(s)",
            paths.len(),
            inputs.len()
        );
        Ok(Self {
            paths,
            width: width as usize,
            height: height as usize,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Decode the slices of `range` in parallel.
    ///
    /// Decode failures are kept per slice and surface when that slice is
    /// requested, like a lazy read would.
    pub fn preload(&self, range: SliceRange) -> PreloadedStack {
        let mut planes: Vec<Option<Result<ImagePlane, EvaluationError>>> = vec![None; self.paths.len()];
        let decoded: Vec<(usize, Result<ImagePlane, EvaluationError>)> = range
            .indices()
            .filter(|slice| (1..=self.paths.len()).contains(slice))
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|slice| (slice, self.decode(slice, &self.paths[slice - 1])))
            .collect();

        let failed = decoded.iter().filter(|(_, p)| p.is_err()).count();
        debug!("preloaded {} planes ({failed} unreadable)", decoded.len());
        for (slice, plane) in decoded {
            planes[slice - 1] = Some(plane);
        }
        PreloadedStack {
            width: self.width,
            height: self.height,
            planes,
        }
    }

    fn decode(&self, slice: usize, path: &Path) -> Result<ImagePlane, EvaluationError> {
        let img = image::open(path).map_err(|e| EvaluationError::PlaneUnavailable {
            slice,
            reason: format!("{}: {e}", path.display()),
        })?;
        let plane = ImagePlane::from_luma32f(&img.to_luma32f());
        if (plane.width(), plane.height()) != (self.width, self.height) {
            return Err(EvaluationError::MalformedPlane {
                expected: self.width * self.height,
                actual: plane.width() * plane.height(),
            });
        }
        Ok(plane)
    }
}

impl PlaneSource for FileStack {
    fn slice_count(&self) -> usize {
        self.paths.len()
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn plane(&self, slice: usize) -> Result<Cow<'_, ImagePlane>, FitError> {
        let path = slice
            .checked_sub(1)
            .and_then(|i| self.paths.get(i))
            .ok_or_else(|| EvaluationError::PlaneUnavailable {
                slice,
                reason: format!("stack holds {} slices", self.paths.len()),
            })?;
        Ok(Cow::Owned(self.decode(slice, path)?))
    }
}

/// Planes decoded up front by [`FileStack::preload`].
///
/// Slices outside the preloaded range are unavailable.
#[derive(Debug, Clone)]
pub struct PreloadedStack {
    width: usize,
    height: usize,
    planes: Vec<Option<Result<ImagePlane, EvaluationError>>>,
}

impl PreloadedStack {
    /// Number of slices holding a decoded plane.
    pub fn loaded(&self) -> usize {
        self.planes.iter().filter(|p| matches!(p, Some(Ok(_)))).count()
    }
}

impl PlaneSource for PreloadedStack {
    fn slice_count(&self) -> usize {
        self.planes.len()
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn plane(&self, slice: usize) -> Result<Cow<'_, ImagePlane>, FitError> {
        match slice.checked_sub(1).and_then(|i| self.planes.get(i)) {
            Some(Some(Ok(plane))) => Ok(Cow::Borrowed(plane)),
            Some(Some(Err(err))) => Err(err.clone().into()),
            Some(None) => Err(EvaluationError::PlaneUnavailable {
                slice,
                reason: "not preloaded".to_string(),
            }
            .into()),
            None => Err(EvaluationError::PlaneUnavailable {
                slice,
                reason: format!("stack holds {} slices", self.planes.len()),
            }
            .into()),
        }
    }
}

/// Write each plane as an 8-bit PNG (`slice_0001.png`, ...), mapping
/// `[lo, hi]` to the full gray range.
pub fn write_png_stack(dir: &Path, stack: &ImageStack, lo: f32, hi: f32) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create '{}': {e}", dir.display())))?;

    let mut written = Vec::with_capacity(stack.len());
    for (i, plane) in stack.planes().iter().enumerate() {
        let path = dir.join(format!("slice_{:04}.png", i + 1));
        plane
            .to_gray8(lo, hi)
            .save(&path)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write '{}': {e}", path.display())))?;
        written.push(path);
    }
    Ok(written)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to list '{}': {e}", dir.display())))?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to list '{}': {e}", dir.display())))?
            .path();
        if path.is_file() && has_image_extension(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
