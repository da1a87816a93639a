//! Brute-force trajectory scan over a pixel region.
//!
//! For every starting pixel of the region and every candidate rate the scorer
//! walks the trajectory through all frames, sums psi and phi at the visited
//! pixels and offers `nu = Σpsi / sqrt(Σphi)` to a bounded [`Scoreboard`].
//!
//! Frames where the trajectory leaves the image, lands on a non-finite value or
//! on a masked pixel are skipped; they are expected and never an error. A
//! trajectory whose total phi is not strictly positive has no defined score and
//! is never offered.

use tracing::trace;

use crate::{
    constants::{PixelPosition, Rate},
    likelihood::LikelihoodStack,
    search::{
        scoreboard::{ScoredTrajectory, Scoreboard},
        SearchRegion,
    },
    search_errors::SearchError,
    time::TimeSeries,
    trajectories::motion_model::MotionModel,
};

/// Accumulated psi/phi along one trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulation {
    pub psi: f64,
    pub phi: f64,
    pub valid_frames: usize,
}

impl Accumulation {
    /// Sum the contributions of every frame at the given positions.
    pub fn along(likelihood: &LikelihoodStack, positions: &[PixelPosition]) -> Self {
        positions
            .iter()
            .enumerate()
            .filter_map(|(frame, pos)| likelihood.sample(frame, pos))
            .fold(Self::default(), |acc, (psi, phi)| Self {
                psi: acc.psi + psi,
                phi: acc.phi + phi,
                valid_frames: acc.valid_frames + 1,
            })
    }

    /// `(nu, alpha)`, or `None` when the normalization is not strictly positive.
    pub fn score(&self) -> Option<(f64, f64)> {
        (self.phi > 0.0).then(|| (self.psi / self.phi.sqrt(), self.psi / self.phi))
    }
}

/// Scan `region` with every candidate rate and keep the best `capacity` scores.
///
/// Arguments
/// -----------------
/// * `likelihood`: psi/phi images, one pair per frame.
/// * `times`: frame epochs, same length as `likelihood`.
/// * `candidates`: rates to test at every starting pixel.
/// * `model`: how a `(start, rate)` pair moves through time.
/// * `region`: starting pixels to scan, must lie within the images.
/// * `capacity`: scoreboard size (≥ 1).
///
/// Return
/// ----------
/// * The filled scoreboard, or a configuration error detected before scanning.
pub fn score_region<M: MotionModel + ?Sized>(
    likelihood: &LikelihoodStack,
    times: &TimeSeries,
    candidates: &[Rate],
    model: &M,
    region: &SearchRegion,
    capacity: usize,
) -> Result<Scoreboard, SearchError> {
    if times.len() != likelihood.len() {
        return Err(SearchError::LengthMismatch {
            what: "time series",
            expected: likelihood.len(),
            found: times.len(),
        });
    }
    region.check_within(likelihood.shape())?;
    let mut board = Scoreboard::new(capacity)?;

    let elapsed = times.elapsed();
    let mut positions = Vec::with_capacity(elapsed.len());

    for row in region.rows.clone() {
        for col in region.cols.clone() {
            let start = PixelPosition::new(row as f64, col as f64);
            for rate in candidates {
                model.trajectory(&start, rate, elapsed, &mut positions);
                let acc = Accumulation::along(likelihood, &positions);

                let Some((score, flux)) = acc.score() else {
                    continue;
                };
                board.offer(ScoredTrajectory {
                    start,
                    rate: *rate,
                    end: positions.last().copied().unwrap_or(start),
                    score,
                    flux,
                    valid_frames: acc.valid_frames,
                });
            }
        }
        trace!(row, kept = board.len(), "scanned row");
    }

    Ok(board)
}

#[cfg(test)]
mod grid_scorer_test {
    use super::*;
    use crate::search::ranker::rank;
    use crate::trajectories::motion_model::LinearMotion;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use ndarray::Array2;

    /// psi = 1 on the diagonal track of a mover at (2, 2) with rate (1, 1), phi = 1 everywhere.
    fn diagonal_stack() -> (LikelihoodStack, TimeSeries) {
        let n = 4;
        let mut psi = vec![Array2::zeros((10, 10)); n];
        for (t, img) in psi.iter_mut().enumerate() {
            img[[2 + t, 2 + t]] = 1.0;
        }
        let phi = vec![Array2::from_elem((10, 10), 1.0); n];
        let lh = LikelihoodStack::from_parts(psi, phi).unwrap();
        let times = TimeSeries::from_elapsed(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        (lh, times)
    }

    #[test]
    fn test_accumulation_skips_out_of_bounds() {
        let (lh, _) = diagonal_stack();
        let positions = vec![
            Vector2::new(2.0, 2.0),
            Vector2::new(3.0, 3.0),
            Vector2::new(-4.0, 3.0),
            Vector2::new(5.2, 4.8),
        ];
        let acc = Accumulation::along(&lh, &positions);
        assert_eq!(acc.valid_frames, 3);
        assert_relative_eq!(acc.psi, 3.0);
        assert_relative_eq!(acc.phi, 3.0);
        let (nu, alpha) = acc.score().unwrap();
        assert_relative_eq!(nu, 3.0_f64.sqrt());
        assert_relative_eq!(alpha, 1.0);

        assert_eq!(Accumulation::default().score(), None);
    }

    #[test]
    fn test_finds_diagonal_mover() {
        let (lh, times) = diagonal_stack();
        let candidates = vec![
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 1.0),
        ];
        let region = SearchRegion::full(lh.shape());
        let board = score_region(&lh, &times, &candidates, &LinearMotion, &region, 5).unwrap();
        assert_eq!(board.len(), 5);

        let best = &board.into_sorted_vec()[0];
        assert_eq!(best.start, Vector2::new(2.0, 2.0));
        assert_eq!(best.rate, Vector2::new(1.0, 1.0));
        assert_eq!(best.end, Vector2::new(5.0, 5.0));
        assert_relative_eq!(best.score, 2.0);
        assert_relative_eq!(best.flux, 1.0);
        assert_eq!(best.valid_frames, 4);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let (lh, times) = diagonal_stack();
        let candidates = vec![Vector2::new(1.0, 1.0), Vector2::new(0.0, 0.0)];
        let region = SearchRegion::full(lh.shape());
        let board = score_region(&lh, &times, &candidates, &LinearMotion, &region, 7).unwrap();
        assert_eq!(board.len(), 7);
        assert_eq!(board.capacity(), 7);
    }

    #[test]
    fn test_configuration_errors() {
        let (lh, times) = diagonal_stack();
        let candidates = vec![Vector2::new(1.0, 1.0)];

        let region = SearchRegion::new(0..11, 0..10);
        assert!(matches!(
            score_region(&lh, &times, &candidates, &LinearMotion, &region, 5),
            Err(SearchError::RegionOutOfBounds { .. })
        ));

        let full = SearchRegion::full(lh.shape());
        assert!(score_region(&lh, &times, &candidates, &LinearMotion, &full, 0).is_err());

        let short = TimeSeries::from_elapsed(vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            score_region(&lh, &short, &candidates, &LinearMotion, &full, 5),
            Err(SearchError::LengthMismatch { what: "time series", .. })
        ));
    }

    #[test]
    fn test_non_finite_frame_is_a_miss() {
        let (lh, times) = diagonal_stack();
        let (mut psi, phi) = (lh.psi().to_vec(), lh.phi().to_vec());
        psi[2][[4, 4]] = f64::NAN;
        let lh = LikelihoodStack::from_parts(psi, phi).unwrap();

        let candidates = vec![
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 1.0),
        ];
        let region = SearchRegion::full(lh.shape());
        let board = score_region(&lh, &times, &candidates, &LinearMotion, &region, 20).unwrap();
        let ranked = rank(board.into_sorted_vec(), 3, 1.0);

        let best = &ranked[0];
        assert_eq!(best.start, Vector2::new(2.0, 2.0));
        assert_eq!(best.rate, Vector2::new(1.0, 1.0));
        assert_eq!(best.valid_frames, 3);
        assert_relative_eq!(best.score, 3.0 / 3.0_f64.sqrt());
        assert_relative_eq!(best.flux, 1.0);
    }

    #[test]
    fn test_zero_phi_is_never_scored() {
        let psi = vec![Array2::from_elem((5, 5), 1.0); 2];
        let phi = vec![Array2::zeros((5, 5)); 2];
        let lh = LikelihoodStack::from_parts(psi, phi).unwrap();
        let times = TimeSeries::from_elapsed(vec![0.0, 1.0]).unwrap();
        let board = score_region(
            &lh,
            &times,
            &[Vector2::new(0.0, 1.0)],
            &LinearMotion,
            &SearchRegion::full((5, 5)),
            10,
        )
        .unwrap();
        assert!(board.is_empty());
    }
}
