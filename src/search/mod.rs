//! # Trajectory search
//!
//! The search turns a stack of frames into a short list of moving-object
//! detections:
//!
//! 1. build psi/phi likelihood images ([`crate::likelihood`]);
//! 2. enumerate candidate rates ([`crate::trajectories::velocity_grid`]);
//! 3. scan every starting pixel × candidate and keep the best scores in a
//!    bounded [`Scoreboard`](scoreboard::Scoreboard) ([`grid_scorer`]);
//! 4. rank and deduplicate ([`ranker`]);
//! 5. do 3–4 per row partition on the rayon pool and merge ([`partitioned`]).
//!
//! [`TrajectorySearch`] chains these steps from a validated
//! [`SearchParams`]:
//!
//! ```rust,no_run
//! use shiftstack::image_stack::ImageStack;
//! use shiftstack::search::{SearchParams, TrajectorySearch};
//!
//! # let stack: ImageStack = unimplemented!();
//! let params = SearchParams::builder()
//!     .psf_sigma(1.2)
//!     .speed_range(0.0, 8.0)
//!     .build()
//!     .unwrap();
//! let results = TrajectorySearch::new(params).run(&stack, None).unwrap();
//! for r in &results {
//!     println!("{:?} {:?} nu={:.1}", r.start, r.rate, r.score);
//! }
//! ```

pub mod grid_scorer;
pub mod params;
pub mod partitioned;
pub mod ranker;
pub mod scoreboard;

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    constants::Rate,
    image_stack::ImageStack,
    likelihood::{ExclusionMask, LikelihoodStack},
    search_errors::SearchError,
    time::TimeSeries,
    trajectories::{
        motion_model::{LinearMotion, MotionModel},
        velocity_grid::enumerate_velocities,
    },
};

pub use params::{SearchParams, SearchParamsBuilder};
pub use scoreboard::ScoredTrajectory;

/// Rectangle of starting pixels, half-open on both axes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRegion {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl SearchRegion {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    /// Every pixel of a `(rows, cols)` frame.
    pub fn full(shape: (usize, usize)) -> Self {
        Self::new(0..shape.0, 0..shape.1)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn num_pixels(&self) -> usize {
        self.num_rows() * self.num_cols()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    /// Fail unless the region is non-empty and inside a `(rows, cols)` frame.
    pub fn check_within(&self, shape: (usize, usize)) -> Result<(), SearchError> {
        if self.is_empty() {
            return Err(SearchError::InvalidSearchParameter(format!(
                "search region rows {:?} x cols {:?} is empty",
                self.rows, self.cols
            )));
        }
        if self.rows.end > shape.0 || self.cols.end > shape.1 {
            return Err(SearchError::RegionOutOfBounds {
                rows: (self.rows.start, self.rows.end),
                cols: (self.cols.start, self.cols.end),
                shape,
            });
        }
        Ok(())
    }

    /// Split into `min(parts, rows)` contiguous row bands of equal height,
    /// the last band absorbing the remainder.
    pub fn split_rows(&self, parts: usize) -> Vec<SearchRegion> {
        let n = parts.clamp(1, self.num_rows().max(1));
        let height = self.num_rows() / n;

        (0..n)
            .map(|i| {
                let lo = self.rows.start + i * height;
                let hi = if i + 1 == n {
                    self.rows.end
                } else {
                    lo + height
                };
                SearchRegion::new(lo..hi, self.cols.clone())
            })
            .collect()
    }
}

/// End-to-end search driven by [`SearchParams`].
#[derive(Debug, Clone, Default)]
pub struct TrajectorySearch {
    params: SearchParams,
}

impl TrajectorySearch {
    pub fn new(params: SearchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Region to scan for frames of the given shape.
    pub fn region(&self, shape: (usize, usize)) -> SearchRegion {
        self.params
            .region
            .clone()
            .unwrap_or_else(|| SearchRegion::full(shape))
    }

    /// Psi/phi images for `stack` with the configured PSF.
    pub fn likelihood(
        &self,
        stack: &ImageStack,
        mask: Option<&ExclusionMask>,
    ) -> Result<LikelihoodStack, SearchError> {
        LikelihoodStack::build(stack, self.params.psf_sigma, mask)
    }

    /// Pixel-rate velocity grid covering the configured speed range over the
    /// span of `times`.
    pub fn candidates(&self, times: &TimeSeries) -> Result<Vec<Rate>, SearchError> {
        enumerate_velocities(
            self.params.psf_sigma.radius(),
            self.params.min_speed,
            self.params.max_speed,
            times.span(),
        )
    }

    /// Run the linear-motion search on `stack`.
    ///
    /// Return
    /// ----------
    /// * Up to `num_results` distinct detections, best first. Empty when no
    ///   trajectory has a defined score.
    pub fn run(
        &self,
        stack: &ImageStack,
        mask: Option<&ExclusionMask>,
    ) -> Result<Vec<ScoredTrajectory>, SearchError> {
        let candidates = self.candidates(stack.times())?;
        self.run_with_model(stack, mask, &candidates, &LinearMotion)
    }

    /// Run the search with an arbitrary motion model and candidate list,
    /// e.g. [`EclipticMotion`](crate::trajectories::motion_model::EclipticMotion)
    /// with an [`ecliptic_rate_grid`](crate::trajectories::velocity_grid::ecliptic_rate_grid).
    pub fn run_with_model<M: MotionModel + ?Sized>(
        &self,
        stack: &ImageStack,
        mask: Option<&ExclusionMask>,
        candidates: &[Rate],
        model: &M,
    ) -> Result<Vec<ScoredTrajectory>, SearchError> {
        let region = self.region(stack.shape());
        region.check_within(stack.shape())?;

        info!(
            frames = stack.len(),
            rows = stack.shape().0,
            cols = stack.shape().1,
            candidates = candidates.len(),
            params = %self.params,
            "starting trajectory search"
        );

        let likelihood = self.likelihood(stack, mask)?;
        self.run_on_likelihood(&likelihood, stack.times(), candidates, model)
    }

    /// Search precomputed likelihood images.
    pub fn run_on_likelihood<M: MotionModel + ?Sized>(
        &self,
        likelihood: &LikelihoodStack,
        times: &TimeSeries,
        candidates: &[Rate],
        model: &M,
    ) -> Result<Vec<ScoredTrajectory>, SearchError> {
        let region = self.region(likelihood.shape());
        partitioned::search_partitioned(likelihood, times, candidates, model, &region, &self.params)
    }
}

#[cfg(test)]
mod search_test {
    use super::*;

    #[test]
    fn test_split_rows() {
        let region = SearchRegion::new(2..12, 0..5);
        let parts = region.split_rows(3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].rows, 2..5);
        assert_eq!(parts[1].rows, 5..8);
        assert_eq!(parts[2].rows, 8..12);
        assert!(parts.iter().all(|p| p.cols == (0..5)));
        assert_eq!(parts.iter().map(SearchRegion::num_pixels).sum::<usize>(), 50);

        assert_eq!(region.split_rows(100).len(), 10);
        assert_eq!(region.split_rows(0).len(), 1);
    }

    #[test]
    fn test_check_within() {
        let region = SearchRegion::new(0..10, 0..10);
        assert!(region.check_within((10, 10)).is_ok());
        assert_eq!(
            region.check_within((9, 10)),
            Err(SearchError::RegionOutOfBounds {
                rows: (0, 10),
                cols: (0, 10),
                shape: (9, 10),
            })
        );
        assert!(SearchRegion::new(4..4, 0..1).check_within((10, 10)).is_err());
    }
}
