//! # Likelihood images (psi / phi)
//!
//! For each frame the search needs two derived images:
//!
//! ```text
//! psi = (image / variance)  ⊛ g        matched-filter signal
//! phi = (1 / variance)      ⊛ g²       matched-filter normalization
//! ```
//!
//! where `g` is the (separable) Gaussian PSF kernel. Summed along a trajectory,
//! `psi / sqrt(phi)` is the signal-to-noise of a point source following it and
//! `psi / phi` is its best-fit flux.
//!
//! ## Sentinels
//!
//! A zero, negative or non-finite variance has no meaningful reciprocal; it is
//! replaced by `NaN`, which the convolution spreads over the PSF footprint and
//! the scorer then skips. Building likelihood images never fails on bad pixels.
//!
//! ## Masking
//!
//! An [`ExclusionMask`] is applied to the inputs before convolution and to both
//! psi and phi afterwards, so an excluded pixel contributes exactly nothing.
//!
//! ## See also
//! * [`convolution`] – kernels and the separable convolution itself.
//! * [`crate::search::grid_scorer`] – consumer of [`LikelihoodStack`].

pub mod convolution;
pub mod mask;

use ndarray::Zip;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{Image, PixelPosition},
    image_stack::ImageStack,
    search_errors::SearchError,
};

use convolution::{convolve_separable, gaussian_kernel_1d, squared_kernel};
pub use mask::ExclusionMask;

/// Gaussian PSF width in pixels, possibly different along rows and columns.
///
/// A scalar converts into an isotropic width via `PsfSigma::from(1.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsfSigma {
    /// Standard deviation along the row index.
    pub row: f64,
    /// Standard deviation along the column index.
    pub col: f64,
}

impl PsfSigma {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Largest of the two widths; used as the "one PSF" tolerance in
    /// geometric comparisons.
    pub fn radius(&self) -> f64 {
        self.row.max(self.col)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.row.is_finite() && self.col.is_finite() && self.row > 0.0 && self.col > 0.0
    }
}

impl From<f64> for PsfSigma {
    fn from(sigma: f64) -> Self {
        Self::new(sigma, sigma)
    }
}

/// Reciprocal of a variance value, `NaN` when it is not strictly positive.
#[inline]
fn inverse_variance(v: f64) -> f64 {
    if v > 0.0 && v.is_finite() {
        1.0 / v
    } else {
        f64::NAN
    }
}

/// Fail with [`SearchError::ShapeMismatch`] unless `found` has the shape `expected`.
fn check_shape(what: &'static str, expected: &Image, found: &Image) -> Result<(), SearchError> {
    if expected.dim() != found.dim() {
        return Err(SearchError::ShapeMismatch {
            frame: 0,
            what,
            expected: expected.dim(),
            found: found.dim(),
        });
    }
    Ok(())
}

/// Precomputed 1-D kernels for one PSF width.
///
/// Every builder checks that its inputs (and the mask, when given) share one
/// shape before touching a pixel.
#[derive(Debug, Clone)]
pub struct MatchedFilter {
    row: Vec<f64>,
    col: Vec<f64>,
    row_sq: Vec<f64>,
    col_sq: Vec<f64>,
}

impl MatchedFilter {
    pub fn new(psf: PsfSigma) -> Self {
        let row = gaussian_kernel_1d(psf.row);
        let col = gaussian_kernel_1d(psf.col);
        let row_sq = squared_kernel(&row);
        let col_sq = squared_kernel(&col);
        Self {
            row,
            col,
            row_sq,
            col_sq,
        }
    }

    /// Signal image from a frame and its variance.
    pub fn psi(
        &self,
        image: &Image,
        variance: &Image,
        mask: Option<&ExclusionMask>,
    ) -> Result<Image, SearchError> {
        check_shape("variance", image, variance)?;
        let mut weighted = Image::zeros(image.dim());
        Zip::from(&mut weighted)
            .and(image)
            .and(variance)
            .for_each(|w, &i, &v| *w = i * inverse_variance(v));
        self.convolve_masked(weighted, mask, &self.row, &self.col)
    }

    /// Signal image when no variance model exists: the background estimate
    /// stands in for the variance, `(image - background) / background`.
    pub fn psi_background_subtracted(
        &self,
        image: &Image,
        background: &Image,
        mask: Option<&ExclusionMask>,
    ) -> Result<Image, SearchError> {
        check_shape("background", image, background)?;
        let mut weighted = Image::zeros(image.dim());
        Zip::from(&mut weighted)
            .and(image)
            .and(background)
            .for_each(|w, &i, &b| *w = (i - b) * inverse_variance(b));
        self.convolve_masked(weighted, mask, &self.row, &self.col)
    }

    /// Normalization image from a variance frame.
    pub fn phi(
        &self,
        variance: &Image,
        mask: Option<&ExclusionMask>,
    ) -> Result<Image, SearchError> {
        let inv = variance.mapv(inverse_variance);
        self.convolve_masked(inv, mask, &self.row_sq, &self.col_sq)
    }

    fn convolve_masked(
        &self,
        mut input: Image,
        mask: Option<&ExclusionMask>,
        row_kernel: &[f64],
        col_kernel: &[f64],
    ) -> Result<Image, SearchError> {
        if let Some(mask) = mask {
            check_shape("exclusion mask", &input, mask.weights())?;
            Zip::from(&mut input)
                .and(mask.weights())
                .for_each(|x, &w| *x = ExclusionMask::apply(w, *x));
        }

        let mut out = convolve_separable(input.view(), row_kernel, col_kernel);

        if let Some(mask) = mask {
            Zip::from(&mut out)
                .and(mask.weights())
                .for_each(|x, &w| *x = ExclusionMask::apply(w, *x));
        }
        Ok(out)
    }
}

/// Matched-filter signal image of one frame (`image / variance ⊛ g`).
///
/// Fails when `variance` does not have the shape of `image`.
pub fn build_psi(
    image: &Image,
    variance: &Image,
    psf: impl Into<PsfSigma>,
) -> Result<Image, SearchError> {
    MatchedFilter::new(psf.into()).psi(image, variance, None)
}

/// Matched-filter signal image of one frame without a variance model.
pub fn build_psi_background_subtracted(
    image: &Image,
    background: &Image,
    psf: impl Into<PsfSigma>,
) -> Result<Image, SearchError> {
    MatchedFilter::new(psf.into()).psi_background_subtracted(image, background, None)
}

/// Matched-filter normalization image of one frame (`1 / variance ⊛ g²`).
pub fn build_phi(variance: &Image, psf: impl Into<PsfSigma>) -> Result<Image, SearchError> {
    MatchedFilter::new(psf.into()).phi(variance, None)
}

/// Psi and phi images for a whole stack, computed once per search run.
#[derive(Debug, Clone)]
pub struct LikelihoodStack {
    psi: Vec<Image>,
    phi: Vec<Image>,
    shape: (usize, usize),
}

impl LikelihoodStack {
    /// Build psi/phi for every frame of `stack`, frames processed in parallel.
    ///
    /// Arguments
    /// -----------------
    /// * `stack`: validated images, variances and epochs.
    /// * `psf`: PSF width used for the matched filter.
    /// * `mask`: optional exclusion mask, same shape as the frames.
    ///
    /// Return
    /// ----------
    /// * The likelihood stack, or a configuration error (invalid PSF, mask shape mismatch).
    pub fn build(
        stack: &ImageStack,
        psf: PsfSigma,
        mask: Option<&ExclusionMask>,
    ) -> Result<Self, SearchError> {
        if !psf.is_valid() {
            return Err(SearchError::InvalidSearchParameter(format!(
                "psf sigma must be finite and > 0, got {psf:?}"
            )));
        }
        if let Some(mask) = mask {
            if mask.shape() != stack.shape() {
                return Err(SearchError::ShapeMismatch {
                    frame: 0,
                    what: "exclusion mask",
                    expected: stack.shape(),
                    found: mask.shape(),
                });
            }
        }

        let filter = MatchedFilter::new(psf);
        let frames = stack
            .images()
            .par_iter()
            .zip(stack.variances().par_iter())
            .map(|(image, variance)| -> Result<(Image, Image), SearchError> {
                Ok((
                    filter.psi(image, variance, mask)?,
                    filter.phi(variance, mask)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let (psi, phi): (Vec<Image>, Vec<Image>) = frames.into_iter().unzip();

        debug!(
            frames = psi.len(),
            rows = stack.shape().0,
            cols = stack.shape().1,
            "built likelihood images"
        );

        Ok(Self {
            psi,
            phi,
            shape: stack.shape(),
        })
    }

    /// Wrap precomputed psi/phi images (e.g. produced by an external pipeline).
    pub fn from_parts(psi: Vec<Image>, phi: Vec<Image>) -> Result<Self, SearchError> {
        let Some(first) = psi.first() else {
            return Err(SearchError::EmptyImageStack);
        };
        let shape = first.dim();
        if phi.len() != psi.len() {
            return Err(SearchError::LengthMismatch {
                what: "phi images",
                expected: psi.len(),
                found: phi.len(),
            });
        }
        for (frame, (p, f)) in psi.iter().zip(&phi).enumerate() {
            for (what, img) in [("psi", p), ("phi", f)] {
                if img.dim() != shape {
                    return Err(SearchError::ShapeMismatch {
                        frame,
                        what,
                        expected: shape,
                        found: img.dim(),
                    });
                }
            }
        }
        Ok(Self { psi, phi, shape })
    }

    pub fn len(&self) -> usize {
        self.psi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.psi.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn psi(&self) -> &[Image] {
        &self.psi
    }

    pub fn phi(&self) -> &[Image] {
        &self.phi
    }

    /// The `(psi, phi)` contribution of frame `frame` at `position`.
    ///
    /// The position is rounded to the nearest pixel. Returns `None` (a miss)
    /// when the pixel is outside the image, when either value is not finite,
    /// or when phi is exactly zero (masked pixel).
    #[inline]
    pub fn sample(&self, frame: usize, position: &PixelPosition) -> Option<(f64, f64)> {
        let row = position.x.round();
        let col = position.y.round();
        if !(row >= 0.0 && col >= 0.0) {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.shape.0 || col >= self.shape.1 {
            return None;
        }

        let psi = self.psi[frame][[row, col]];
        let phi = self.phi[frame][[row, col]];
        (psi.is_finite() && phi.is_finite() && phi != 0.0).then_some((psi, phi))
    }
}

#[cfg(test)]
mod likelihood_test {
    use super::*;
    use crate::time::TimeSeries;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use ndarray::Array2;

    #[test]
    fn test_psf_broadcast() {
        let psf = PsfSigma::from(1.5);
        assert_eq!(psf, PsfSigma::new(1.5, 1.5));
        assert_eq!(PsfSigma::new(1.0, 2.0).radius(), 2.0);
    }

    #[test]
    fn test_psi_phi_flat_unit_variance() {
        let image = Array2::from_elem((30, 30), 2.0);
        let variance = Array2::from_elem((30, 30), 1.0);

        let psi = build_psi(&image, &variance, 1.0).unwrap();
        let phi = build_phi(&variance, 1.0).unwrap();

        assert_relative_eq!(psi[[15, 15]], 2.0, epsilon = 1e-12);

        let k = gaussian_kernel_1d(1.0);
        let sq: f64 = squared_kernel(&k).iter().sum();
        assert_relative_eq!(phi[[15, 15]], sq * sq, epsilon = 1e-12);
    }

    #[test]
    fn test_variance_scales_phi() {
        let variance = Array2::from_elem((20, 20), 4.0);
        let unit = Array2::from_elem((20, 20), 1.0);
        let phi4 = build_phi(&variance, 1.0).unwrap();
        let phi1 = build_phi(&unit, 1.0).unwrap();
        assert_relative_eq!(phi4[[10, 10]] * 4.0, phi1[[10, 10]], epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_is_a_sentinel() {
        let image = Array2::from_elem((10, 10), 1.0);
        let variance = Array2::zeros((10, 10));
        let psi = build_psi(&image, &variance, 1.0).unwrap();
        let phi = build_phi(&variance, 1.0).unwrap();
        assert!(psi.iter().all(|v| v.is_nan()));
        assert!(phi.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_background_subtracted_psi() {
        let image = Array2::from_elem((20, 20), 10.0);
        let background = Array2::from_elem((20, 20), 10.0);
        let psi = build_psi_background_subtracted(&image, &background, 1.0).unwrap();
        assert_relative_eq!(psi[[10, 10]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let image = Array2::from_elem((10, 10), 1.0);
        let narrow = Array2::from_elem((10, 9), 1.0);

        assert!(matches!(
            build_psi(&image, &narrow, 1.0),
            Err(SearchError::ShapeMismatch {
                what: "variance",
                expected: (10, 10),
                found: (10, 9),
                ..
            })
        ));
        assert!(matches!(
            build_psi_background_subtracted(&image, &narrow, 1.0),
            Err(SearchError::ShapeMismatch { what: "background", .. })
        ));

        let filter = MatchedFilter::new(PsfSigma::from(1.0));
        let mask = ExclusionMask::around_sources((10, 9), &[], 1.0);
        assert!(matches!(
            filter.phi(&image, Some(&mask)),
            Err(SearchError::ShapeMismatch { what: "exclusion mask", .. })
        ));
        assert!(matches!(
            filter.psi(&image, &image, Some(&mask)),
            Err(SearchError::ShapeMismatch { what: "exclusion mask", .. })
        ));
    }

    #[test]
    fn test_stack_with_mask() {
        let n = 3;
        let images = vec![Array2::from_elem((20, 20), 1.0); n];
        let variances = vec![Array2::from_elem((20, 20), 1.0); n];
        let times = TimeSeries::from_elapsed(vec![0.0, 1.0, 2.0]).unwrap();
        let stack = ImageStack::new(images, variances, times).unwrap();

        let mask = ExclusionMask::around_sources((20, 20), &[Vector2::new(10.0, 10.0)], 2.0);
        let lh = LikelihoodStack::build(&stack, PsfSigma::from(1.0), Some(&mask)).unwrap();

        assert_eq!(lh.len(), 3);
        assert_eq!(lh.phi()[0][[10, 10]], 0.0);
        assert_eq!(lh.psi()[0][[10, 10]], 0.0);
        assert_eq!(lh.sample(0, &Vector2::new(10.0, 10.0)), None);
        assert!(lh.sample(0, &Vector2::new(3.2, 16.7)).is_some());
        assert_eq!(lh.sample(0, &Vector2::new(-0.7, 3.0)), None);
        assert_eq!(lh.sample(0, &Vector2::new(19.6, 3.0)), None);

        let bad_mask = ExclusionMask::around_sources((10, 20), &[], 1.0);
        assert!(matches!(
            LikelihoodStack::build(&stack, PsfSigma::from(1.0), Some(&bad_mask)),
            Err(SearchError::ShapeMismatch { what: "exclusion mask", .. })
        ));
        assert!(LikelihoodStack::build(&stack, PsfSigma::from(0.0), None).is_err());
    }

    #[test]
    fn test_from_parts_validation() {
        let psi = vec![Array2::zeros((4, 4)); 2];
        let phi = vec![Array2::zeros((4, 4)), Array2::zeros((4, 3))];
        assert!(matches!(
            LikelihoodStack::from_parts(psi, phi),
            Err(SearchError::ShapeMismatch { frame: 1, what: "phi", .. })
        ));
    }
}
