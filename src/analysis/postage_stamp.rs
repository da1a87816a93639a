//! Postage stamps: small cutouts of the raw frames following a trajectory.
//!
//! A stamp is centred on the rounded trajectory position in each frame; the
//! coadd is their pixel-wise sum. A real mover shows up as a point source at
//! the centre of the coadd, a false positive as noise or a streak of a
//! neighbouring star.
//!
//! Stamps can also be screened without looking at them: after
//! [`normalize`] to unit sum, [`center_filter`] keeps the stamps whose
//! brightest pixel carries a large enough fraction of the total flux.

use ndarray::s;
use tracing::debug;

use crate::{
    constants::{Image, PixelPosition, DEFAULT_STAMP_SCALE},
    likelihood::PsfSigma,
    search::ScoredTrajectory,
    search_errors::SearchError,
    time::TimeSeries,
    trajectories::motion_model::MotionModel,
};

/// Cutouts of one trajectory and their coadd.
#[derive(Debug, Clone, PartialEq)]
pub struct PostageStamps {
    /// One stamp per kept frame.
    pub stamps: Vec<Image>,
    /// Frame index of each stamp.
    pub frames: Vec<usize>,
    /// Sum of `stamps`.
    pub coadd: Image,
}

/// Stamp geometry and frame screening.
#[derive(Debug, Clone)]
pub struct StampCutter {
    half_width: (usize, usize),
    exclusion_radius: f64,
    known_sources: Vec<PixelPosition>,
}

impl StampCutter {
    /// Stamps of half-width `ceil(scale · σ)` on each axis.
    pub fn new(psf: PsfSigma, scale: f64) -> Result<Self, SearchError> {
        if !psf.is_valid() || !(scale.is_finite() && scale > 0.0) {
            return Err(SearchError::InvalidSearchParameter(format!(
                "stamps need a valid psf and scale > 0 (psf={psf:?}, scale={scale})"
            )));
        }
        Ok(Self {
            half_width: (
                (scale * psf.row).ceil() as usize,
                (scale * psf.col).ceil() as usize,
            ),
            exclusion_radius: scale * psf.radius(),
            known_sources: Vec::new(),
        })
    }

    /// Skip frames where one of `sources` lies within `scale · σ` of the
    /// trajectory position.
    pub fn with_known_sources(mut self, sources: Vec<PixelPosition>) -> Self {
        self.known_sources = sources;
        self
    }

    pub fn half_width(&self) -> (usize, usize) {
        self.half_width
    }

    /// Stamp shape `(2·h_row + 1, 2·h_col + 1)`.
    pub fn stamp_shape(&self) -> (usize, usize) {
        (2 * self.half_width.0 + 1, 2 * self.half_width.1 + 1)
    }

    /// Cut the stamps of `trajectory` from `images`.
    ///
    /// Every frame is bounds-checked before any pixel is copied, including
    /// frames later skipped because of a known source.
    ///
    /// Return
    /// ----------
    /// * The stamps and coadd, or [`SearchError::StampOutOfBounds`] for the first
    ///   frame whose stamp leaves the image.
    pub fn cut<M: MotionModel + ?Sized>(
        &self,
        images: &[Image],
        times: &TimeSeries,
        trajectory: &ScoredTrajectory,
        model: &M,
    ) -> Result<PostageStamps, SearchError> {
        if times.len() != images.len() {
            return Err(SearchError::LengthMismatch {
                what: "time series",
                expected: images.len(),
                found: times.len(),
            });
        }

        let mut positions = Vec::with_capacity(images.len());
        model.trajectory(
            &trajectory.start,
            &trajectory.rate,
            times.elapsed(),
            &mut positions,
        );

        let (hr, hc) = (self.half_width.0 as i64, self.half_width.1 as i64);
        let mut corners = Vec::with_capacity(images.len());
        for (frame, (image, pos)) in images.iter().zip(&positions).enumerate() {
            let center = (pos.x.round() as i64, pos.y.round() as i64);
            let (rows, cols) = image.dim();
            let inside = center.0 - hr >= 0
                && center.1 - hc >= 0
                && center.0 + hr < rows as i64
                && center.1 + hc < cols as i64;
            if !inside {
                return Err(SearchError::StampOutOfBounds {
                    frame,
                    center,
                    half_width: self.half_width,
                });
            }
            corners.push(((center.0 - hr) as usize, (center.1 - hc) as usize));
        }

        let (height, width) = self.stamp_shape();
        let mut coadd = Image::zeros((height, width));
        let mut stamps = Vec::new();
        let mut frames = Vec::new();

        for (frame, ((image, pos), (r0, c0))) in
            images.iter().zip(&positions).zip(corners).enumerate()
        {
            if self.near_known_source(pos) {
                debug!(frame, "known source inside stamp, frame skipped");
                continue;
            }
            let stamp = image.slice(s![r0..r0 + height, c0..c0 + width]).to_owned();
            coadd += &stamp;
            stamps.push(stamp);
            frames.push(frame);
        }

        Ok(PostageStamps {
            stamps,
            frames,
            coadd,
        })
    }

    fn near_known_source(&self, pos: &PixelPosition) -> bool {
        self.known_sources
            .iter()
            .any(|src| (src - pos).norm() <= self.exclusion_radius)
    }
}

impl Default for StampCutter {
    fn default() -> Self {
        let h = DEFAULT_STAMP_SCALE.ceil() as usize;
        Self {
            half_width: (h, h),
            exclusion_radius: DEFAULT_STAMP_SCALE,
            known_sources: Vec::new(),
        }
    }
}

/// Scale a stamp to unit sum; a stamp summing to zero is returned as is.
pub fn normalize(stamp: &Image) -> Image {
    let total = stamp.sum();
    if total == 0.0 || !total.is_finite() {
        return stamp.clone();
    }
    stamp / total
}

/// Indices of the stamps whose brightest pixel, after [`normalize`], exceeds `threshold`.
pub fn center_filter(stamps: &[Image], threshold: f64) -> Vec<usize> {
    let kept: Vec<usize> = stamps
        .iter()
        .enumerate()
        .filter(|(_, stamp)| {
            normalize(stamp)
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
                > threshold
        })
        .map(|(i, _)| i)
        .collect();
    debug!(kept = kept.len(), total = stamps.len(), "center filter");
    kept
}

#[cfg(test)]
mod postage_stamp_test {
    use super::*;
    use crate::trajectories::motion_model::LinearMotion;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use ndarray::Array2;

    fn moving_dot() -> (Vec<Image>, TimeSeries, ScoredTrajectory) {
        let images: Vec<Image> = (0..3)
            .map(|t| {
                let mut img = Array2::zeros((20, 20));
                img[[8 + t, 10]] = 4.0;
                img
            })
            .collect();
        let times = TimeSeries::from_elapsed(vec![0.0, 1.0, 2.0]).unwrap();
        let traj = ScoredTrajectory {
            start: Vector2::new(8.0, 10.0),
            rate: Vector2::new(1.0, 0.0),
            end: Vector2::new(10.0, 10.0),
            score: 1.0,
            flux: 1.0,
            valid_frames: 3,
        };
        (images, times, traj)
    }

    #[test]
    fn test_coadd_is_centred() {
        let (images, times, traj) = moving_dot();
        let cutter = StampCutter::new(PsfSigma::from(1.0), 2.5).unwrap();
        assert_eq!(cutter.half_width(), (3, 3));

        let stamps = cutter.cut(&images, &times, &traj, &LinearMotion).unwrap();
        assert_eq!(stamps.stamps.len(), 3);
        assert_eq!(stamps.frames, vec![0, 1, 2]);
        assert_eq!(stamps.coadd.dim(), (7, 7));
        assert_relative_eq!(stamps.coadd[[3, 3]], 12.0);
        assert_relative_eq!(stamps.coadd.sum(), 12.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let (images, times, traj) = moving_dot();
        let cutter = StampCutter::new(PsfSigma::from(1.0), 10.0).unwrap();
        assert_eq!(
            cutter.cut(&images, &times, &traj, &LinearMotion),
            Err(SearchError::StampOutOfBounds {
                frame: 0,
                center: (8, 10),
                half_width: (10, 10),
            })
        );
    }

    #[test]
    fn test_known_source_skips_frame() {
        let (images, times, traj) = moving_dot();
        let cutter = StampCutter::new(PsfSigma::from(1.0), 2.0)
            .unwrap()
            .with_known_sources(vec![Vector2::new(11.0, 10.0)]);
        let stamps = cutter.cut(&images, &times, &traj, &LinearMotion).unwrap();
        // frames at rows 9 and 10 are within 2 px of the source at row 11
        assert_eq!(stamps.frames, vec![0]);
        assert_relative_eq!(stamps.coadd.sum(), 4.0);
    }

    #[test]
    fn test_normalize_and_center_filter() {
        let mut peaked = Array2::from_elem((3, 3), 1.0);
        peaked[[1, 1]] = 8.0;
        let flat = Array2::from_elem((3, 3), 1.0);

        let n = normalize(&peaked);
        assert_relative_eq!(n.sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n[[1, 1]], 0.5);

        assert_eq!(center_filter(&[flat, peaked], 0.3), vec![1]);
        assert_eq!(normalize(&Array2::zeros((2, 2))), Array2::<f64>::zeros((2, 2)));
    }
}
