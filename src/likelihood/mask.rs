//! Exclusion masks for pixels that must never contribute to a trajectory score
//! (known stars, bad columns, saturated cores).
//!
//! A mask is a real-valued weight image: `1.0` keeps a pixel, `0.0` excludes it,
//! intermediate values down-weight it.

use ndarray::Array2;

use crate::{
    constants::{Image, PixelPosition},
    search_errors::SearchError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionMask {
    weights: Image,
}

impl ExclusionMask {
    /// Wrap a precomputed weight image.
    ///
    /// Return
    /// ----------
    /// * [`SearchError::InvalidSearchParameter`] if a weight is outside `[0, 1]` or not finite.
    pub fn from_weights(weights: Image) -> Result<Self, SearchError> {
        if let Some(w) = weights.iter().find(|w| !(0.0..=1.0).contains(*w)) {
            return Err(SearchError::InvalidSearchParameter(format!(
                "mask weights must lie in [0, 1], found {w}"
            )));
        }
        Ok(Self { weights })
    }

    /// Build a mask from a boolean image where `true` marks an excluded pixel.
    pub fn from_excluded(excluded: &Array2<bool>) -> Self {
        Self {
            weights: excluded.mapv(|x| if x { 0.0 } else { 1.0 }),
        }
    }

    /// Exclude every pixel within `radius` (inclusive) of one of `sources`.
    ///
    /// Arguments
    /// -----------------
    /// * `shape`: `(rows, cols)` of the frames.
    /// * `sources`: known source positions, `(row, col)`.
    /// * `radius`: disc radius in pixels, typically `MASK_RADIUS_SIGMAS · psf`.
    pub fn around_sources(shape: (usize, usize), sources: &[PixelPosition], radius: f64) -> Self {
        let mut weights = Array2::from_elem(shape, 1.0);
        let (rows, cols) = shape;
        if rows == 0 || cols == 0 {
            return Self { weights };
        }

        for src in sources {
            let r_lo = (src.x - radius).floor().max(0.0) as usize;
            let r_hi = ((src.x + radius).ceil().max(0.0) as usize).min(rows.saturating_sub(1));
            let c_lo = (src.y - radius).floor().max(0.0) as usize;
            let c_hi = ((src.y + radius).ceil().max(0.0) as usize).min(cols.saturating_sub(1));

            for r in r_lo..=r_hi {
                for c in c_lo..=c_hi {
                    let dr = r as f64 - src.x;
                    let dc = c as f64 - src.y;
                    if (dr * dr + dc * dc).sqrt() <= radius {
                        weights[[r, c]] = 0.0;
                    }
                }
            }
        }

        Self { weights }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.weights.dim()
    }

    pub fn weights(&self) -> &Image {
        &self.weights
    }

    pub fn is_excluded(&self, row: usize, col: usize) -> bool {
        self.weights.get([row, col]).is_some_and(|&w| w == 0.0)
    }

    /// Apply the mask to one value; excluded pixels become exactly `0.0`,
    /// even if the value itself is not finite.
    #[inline]
    pub(crate) fn apply(weight: f64, value: f64) -> f64 {
        if weight == 0.0 {
            0.0
        } else {
            value * weight
        }
    }
}

#[cfg(test)]
mod mask_test {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn test_around_sources() {
        let mask = ExclusionMask::around_sources((20, 20), &[Vector2::new(5.0, 5.0)], 2.0);
        assert!(mask.is_excluded(5, 5));
        assert!(mask.is_excluded(7, 5));
        assert!(!mask.is_excluded(7, 7));
        assert!(!mask.is_excluded(15, 15));
    }

    #[test]
    fn test_source_near_edge() {
        let mask = ExclusionMask::around_sources((10, 10), &[Vector2::new(0.0, 9.0)], 3.0);
        assert!(mask.is_excluded(0, 9));
        assert!(mask.is_excluded(3, 9));
        assert!(!mask.is_excluded(9, 0));
    }

    #[test]
    fn test_empty_shape() {
        let mask = ExclusionMask::around_sources((0, 10), &[Vector2::new(0.0, 2.0)], 3.0);
        assert_eq!(mask.shape(), (0, 10));
        let mask = ExclusionMask::around_sources((10, 0), &[Vector2::new(1.0, 0.0)], 3.0);
        assert_eq!(mask.shape(), (10, 0));
    }

    #[test]
    fn test_weights_validation() {
        assert!(ExclusionMask::from_weights(Array2::from_elem((2, 2), 1.5)).is_err());
        assert!(ExclusionMask::from_weights(Array2::from_elem((2, 2), f64::NAN)).is_err());
        assert!(ExclusionMask::from_weights(Array2::from_elem((2, 2), 0.5)).is_ok());
    }

    #[test]
    fn test_apply_zeroes_nan() {
        assert_eq!(ExclusionMask::apply(0.0, f64::NAN), 0.0);
        assert_eq!(ExclusionMask::apply(0.5, 4.0), 2.0);
    }
}
