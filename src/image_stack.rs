//! Validated stack of (image, variance) frames and their epochs.
//!
//! Every shape check required by the search happens here, once, before any
//! likelihood image is built or any trajectory is scanned.

use crate::{constants::Image, search_errors::SearchError, time::TimeSeries};

/// A time-ordered sequence of images with per-pixel variance estimates.
///
/// Invariants
/// -----------------
/// * at least one frame,
/// * `images.len() == variances.len() == times.len()`,
/// * every image and variance has the same `(rows, cols)` shape.
#[derive(Debug, Clone)]
pub struct ImageStack {
    images: Vec<Image>,
    variances: Vec<Image>,
    times: TimeSeries,
    shape: (usize, usize),
}

impl ImageStack {
    /// Assemble and validate a stack.
    ///
    /// Arguments
    /// -----------------
    /// * `images`: raw frames, indexed `[row, col]`.
    /// * `variances`: per-pixel noise estimate, paired with `images` by index.
    /// * `times`: capture epochs, one per frame.
    ///
    /// Return
    /// ----------
    /// * The stack, or the first shape / length mismatch found.
    pub fn new(
        images: Vec<Image>,
        variances: Vec<Image>,
        times: TimeSeries,
    ) -> Result<Self, SearchError> {
        let Some(first) = images.first() else {
            return Err(SearchError::EmptyImageStack);
        };
        let shape = first.dim();

        if variances.len() != images.len() {
            return Err(SearchError::LengthMismatch {
                what: "variance images",
                expected: images.len(),
                found: variances.len(),
            });
        }
        if times.len() != images.len() {
            return Err(SearchError::LengthMismatch {
                what: "time series",
                expected: images.len(),
                found: times.len(),
            });
        }

        for (frame, (image, variance)) in images.iter().zip(&variances).enumerate() {
            if image.dim() != shape {
                return Err(SearchError::ShapeMismatch {
                    frame,
                    what: "image",
                    expected: shape,
                    found: image.dim(),
                });
            }
            if variance.dim() != shape {
                return Err(SearchError::ShapeMismatch {
                    frame,
                    what: "variance",
                    expected: shape,
                    found: variance.dim(),
                });
            }
        }

        Ok(Self {
            images,
            variances,
            times,
            shape,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// `(rows, cols)` shared by every frame.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn variances(&self) -> &[Image] {
        &self.variances
    }

    pub fn times(&self) -> &TimeSeries {
        &self.times
    }

    /// Iterate over `(image, variance)` pairs in frame order.
    pub fn frames(&self) -> impl Iterator<Item = (&Image, &Image)> {
        self.images.iter().zip(&self.variances)
    }
}
