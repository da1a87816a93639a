//! # Frame epochs and elapsed time
//!
//! The search only cares about **relative** time: every trajectory position is
//! `start + rate × (t - t₀)` where `t₀` is the epoch of the first frame.
//! [`TimeSeries`] stores the absolute epochs (MJD) together with the elapsed
//! days since the first frame, which is what the scorer consumes.
//!
//! Epochs can be supplied as raw MJD values, as [`hifitime::Epoch`]s, or as
//! date strings in any format understood by [`Epoch::from_str`].
use hifitime::Epoch;
use std::str::FromStr;

use crate::{
    constants::{Day, JDTOMJD, MJD},
    search_errors::SearchError,
};

/// Transformation from date strings (e.g. `YYYY-MM-ddTHH:mm:ss UTC`) to modified julian date (MJD)
///
/// Argument
/// --------
/// * `dates`: date strings understood by [`Epoch::from_str`]
///
/// Return
/// ------
/// * the dates as MJD (UTC days), or [`SearchError::EpochParsingError`] on the first unparsable entry
pub fn date_to_mjd(dates: &[&str]) -> Result<Vec<MJD>, SearchError> {
    dates
        .iter()
        .map(|x| {
            Epoch::from_str(x)
                .map(|e| e.to_mjd_utc_days())
                .map_err(|e| SearchError::EpochParsingError(format!("{x}: {e}")))
        })
        .collect()
}

/// Transformation from julian date (JD) in modified julian date (MJD)
pub fn jd_to_mjd(jd: &[f64]) -> Vec<MJD> {
    jd.iter().map(|x| x - JDTOMJD).collect()
}

/// Ordered capture epochs of a frame sequence.
///
/// Invariants
/// -----------------
/// * at least one epoch,
/// * every epoch finite,
/// * epochs non-decreasing (frames are time-ordered).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    epochs: Vec<MJD>,
    elapsed: Vec<Day>,
}

impl TimeSeries {
    /// Build a time series from MJD epochs.
    ///
    /// Return
    /// ----------
    /// * [`SearchError::InvalidTimeSeries`] if the series is empty, contains a
    ///   non-finite value, or goes backwards in time.
    pub fn from_mjd(epochs: Vec<MJD>) -> Result<Self, SearchError> {
        let Some(&t0) = epochs.first() else {
            return Err(SearchError::InvalidTimeSeries(
                "at least one epoch is required".into(),
            ));
        };
        if let Some(i) = epochs.iter().position(|t| !t.is_finite()) {
            return Err(SearchError::InvalidTimeSeries(format!(
                "epoch {i} is not finite"
            )));
        }
        if let Some(i) = epochs.windows(2).position(|w| w[1] < w[0]) {
            return Err(SearchError::InvalidTimeSeries(format!(
                "epoch {} precedes epoch {i}",
                i + 1
            )));
        }

        let elapsed = epochs.iter().map(|t| t - t0).collect();
        Ok(Self { epochs, elapsed })
    }

    /// Build a time series from [`hifitime::Epoch`]s (converted to MJD UTC).
    pub fn from_epochs(epochs: &[Epoch]) -> Result<Self, SearchError> {
        Self::from_mjd(epochs.iter().map(|e| e.to_mjd_utc_days()).collect())
    }

    /// Build a time series from date strings, see [`date_to_mjd`].
    pub fn from_dates(dates: &[&str]) -> Result<Self, SearchError> {
        Self::from_mjd(date_to_mjd(dates)?)
    }

    /// Build a time series directly from elapsed days, the first frame at `t = 0`.
    ///
    /// Useful for synthetic stacks where frames are simply numbered. A first
    /// value other than `0` is rejected rather than re-based.
    pub fn from_elapsed(elapsed: Vec<Day>) -> Result<Self, SearchError> {
        if let Some(&t0) = elapsed.first() {
            if t0 != 0.0 {
                return Err(SearchError::InvalidTimeSeries(format!(
                    "elapsed time must start at 0, got {t0}"
                )));
            }
        }
        Self::from_mjd(elapsed)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Absolute epochs (MJD).
    pub fn epochs(&self) -> &[MJD] {
        &self.epochs
    }

    /// Elapsed days since the first frame, aligned with frame indices.
    pub fn elapsed(&self) -> &[Day] {
        &self.elapsed
    }

    /// Total span of the series (elapsed time of the last frame).
    pub fn span(&self) -> Day {
        self.elapsed.last().copied().unwrap_or(0.0)
    }
}
