//! Per-frame psi/phi along a detected trajectory.

use crate::{
    likelihood::LikelihoodStack,
    search::ScoredTrajectory,
    search_errors::SearchError,
    time::TimeSeries,
    trajectories::motion_model::MotionModel,
};

/// Lightcurve of one trajectory.
///
/// Missed frames (outside the image, non-finite, masked) hold `NaN` in both
/// `psi` and `phi` and are absent from `valid`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lightcurve {
    psi: Vec<f64>,
    phi: Vec<f64>,
    valid: Vec<usize>,
}

impl Lightcurve {
    /// Sample the likelihood images along `trajectory` as moved by `model`.
    pub fn extract<M: MotionModel + ?Sized>(
        likelihood: &LikelihoodStack,
        times: &TimeSeries,
        trajectory: &ScoredTrajectory,
        model: &M,
    ) -> Result<Self, SearchError> {
        if times.len() != likelihood.len() {
            return Err(SearchError::LengthMismatch {
                what: "time series",
                expected: likelihood.len(),
                found: times.len(),
            });
        }

        let mut positions = Vec::with_capacity(times.len());
        model.trajectory(
            &trajectory.start,
            &trajectory.rate,
            times.elapsed(),
            &mut positions,
        );

        let mut psi = Vec::with_capacity(positions.len());
        let mut phi = Vec::with_capacity(positions.len());
        let mut valid = Vec::new();
        for (frame, pos) in positions.iter().enumerate() {
            match likelihood.sample(frame, pos) {
                Some((s, f)) => {
                    psi.push(s);
                    phi.push(f);
                    valid.push(frame);
                }
                None => {
                    psi.push(f64::NAN);
                    phi.push(f64::NAN);
                }
            }
        }

        Ok(Self { psi, phi, valid })
    }

    pub fn len(&self) -> usize {
        self.psi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.psi.is_empty()
    }

    pub fn psi(&self) -> &[f64] {
        &self.psi
    }

    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    /// Indices of the frames that contributed.
    pub fn valid_frames(&self) -> &[usize] {
        &self.valid
    }

    /// Per-frame flux estimate `psi / phi`, `NaN` on missed frames.
    pub fn flux(&self) -> Vec<f64> {
        self.psi.iter().zip(&self.phi).map(|(s, f)| s / f).collect()
    }

    /// Score recomputed from the valid frames only, `None` if phi sums to zero.
    pub fn score(&self) -> Option<f64> {
        let (psi, phi) = self
            .valid
            .iter()
            .fold((0.0, 0.0), |(s, f), &i| (s + self.psi[i], f + self.phi[i]));
        (phi > 0.0).then(|| psi / phi.sqrt())
    }
}
