//! # Search configuration
//!
//! [`SearchParams`] gathers every tunable of a trajectory search. Build it with
//! [`SearchParams::builder`], which validates the values before anything is
//! scanned:
//!
//! ```rust,no_run
//! use shiftstack::search::SearchParams;
//!
//! let params = SearchParams::builder()
//!     .psf_sigma(1.4)
//!     .speed_range(0.0, 20.0)
//!     .num_results(25)
//!     .build()
//!     .unwrap();
//! println!("{params:#}");
//! ```
//!
//! Derived quantities
//! -----------------
//! * `min_separation` defaults to the PSF radius (largest of the two widths).
//! * the scoreboard capacity is `ceil(π·σ²) · num_results · scoreboard_oversampling`.
//! * `workers` defaults to the size of the rayon thread pool.

use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_NUM_RESULTS, SCOREBOARD_OVERSAMPLING},
    likelihood::PsfSigma,
    search::{
        scoreboard::{checked_scoreboard_capacity, scoreboard_capacity},
        SearchRegion,
    },
    search_errors::SearchError,
};

/// Tunables of a trajectory search.
///
/// Speeds are in pixels per day and apply to the pixel-rate velocity grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Gaussian PSF width in pixels.
    pub psf_sigma: PsfSigma,
    /// Slowest candidate speed (pixels/day).
    pub min_speed: f64,
    /// Fastest candidate speed (pixels/day).
    pub max_speed: f64,
    /// Number of distinct detections returned.
    pub num_results: usize,
    /// Start/end distance under which two detections are the same object.
    /// `None` uses the PSF radius.
    pub min_separation: Option<f64>,
    /// Scoreboard slots kept per PSF footprint and per result.
    pub scoreboard_oversampling: usize,
    /// Number of row partitions scanned concurrently. `None` uses the rayon pool size.
    pub workers: Option<usize>,
    /// Starting pixels to scan. `None` scans the whole frame.
    pub region: Option<SearchRegion>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SearchParamsBuilder {
        SearchParamsBuilder::new()
    }

    /// Separation used by the ranker.
    pub fn min_separation(&self) -> f64 {
        self.min_separation.unwrap_or_else(|| self.psf_sigma.radius())
    }

    /// Scoreboard capacity per partition.
    pub fn scoreboard_capacity(&self) -> usize {
        scoreboard_capacity(
            self.psf_sigma,
            self.num_results,
            self.scoreboard_oversampling,
        )
    }

    /// Number of partitions requested.
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(rayon::current_num_threads).max(1)
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            psf_sigma: PsfSigma::from(1.0),
            min_speed: 0.0,
            max_speed: 2.0,
            num_results: DEFAULT_NUM_RESULTS,
            min_separation: None,
            scoreboard_oversampling: SCOREBOARD_OVERSAMPLING,
            workers: None,
            region: None,
        }
    }
}

/// Builder for [`SearchParams`], with validation.
#[derive(Debug, Clone)]
pub struct SearchParamsBuilder {
    params: SearchParams,
}

impl Default for SearchParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: SearchParams::default(),
        }
    }

    pub fn psf_sigma(mut self, v: impl Into<PsfSigma>) -> Self {
        self.params.psf_sigma = v.into();
        self
    }
    pub fn min_speed(mut self, v: f64) -> Self {
        self.params.min_speed = v;
        self
    }
    pub fn max_speed(mut self, v: f64) -> Self {
        self.params.max_speed = v;
        self
    }
    pub fn speed_range(self, min: f64, max: f64) -> Self {
        self.min_speed(min).max_speed(max)
    }
    pub fn num_results(mut self, v: usize) -> Self {
        self.params.num_results = v;
        self
    }
    pub fn min_separation(mut self, v: f64) -> Self {
        self.params.min_separation = Some(v);
        self
    }
    pub fn scoreboard_oversampling(mut self, v: usize) -> Self {
        self.params.scoreboard_oversampling = v;
        self
    }
    pub fn workers(mut self, v: usize) -> Self {
        self.params.workers = Some(v);
        self
    }
    pub fn region(mut self, v: SearchRegion) -> Self {
        self.params.region = Some(v);
        self
    }

    // ---- NaN-aware comparisons ----

    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    #[inline]
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    /// Validate and produce the parameters.
    ///
    /// Validation rules
    /// -----------------
    /// * both PSF widths finite and `> 0`;
    /// * `0 ≤ min_speed ≤ max_speed`, `max_speed > 0`, both finite;
    /// * `num_results ≥ 1`, `scoreboard_oversampling ≥ 1`, and the scoreboard
    ///   capacity they imply fits in a `usize`;
    /// * `min_separation ≥ 0` when set;
    /// * `workers ≥ 1` when set;
    /// * `region` not empty when set (its bounds are checked against the frames at search time).
    pub fn build(self) -> Result<SearchParams, SearchError> {
        let p = &self.params;
        let invalid = |msg: &str| Err(SearchError::InvalidSearchParameter(msg.into()));

        if !p.psf_sigma.is_valid() {
            return invalid("psf_sigma must be finite and > 0");
        }
        if !Self::ge0(p.min_speed) || !p.max_speed.is_finite() || !Self::gt0(p.max_speed) {
            return invalid("require min_speed >= 0 and finite max_speed > 0");
        }
        if !Self::le(p.min_speed, p.max_speed) {
            return invalid("min_speed must be <= max_speed");
        }
        if p.num_results == 0 {
            return invalid("num_results must be >= 1");
        }
        if p.scoreboard_oversampling == 0 {
            return invalid("scoreboard_oversampling must be >= 1");
        }
        if checked_scoreboard_capacity(p.psf_sigma, p.num_results, p.scoreboard_oversampling)
            .is_none()
        {
            return invalid("num_results * scoreboard_oversampling overflows the scoreboard size");
        }
        if let Some(sep) = p.min_separation {
            if !Self::ge0(sep) || !sep.is_finite() {
                return invalid("min_separation must be finite and >= 0");
            }
        }
        if p.workers == Some(0) {
            return invalid("workers must be >= 1");
        }
        if p.region.as_ref().is_some_and(SearchRegion::is_empty) {
            return invalid("search region must not be empty");
        }

        Ok(self.params)
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Trajectory Search Parameters")?;
            writeln!(f, "----------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Matched filter]")?;
            line!(
                "psf_sigma               = {:.3} px",
                self.psf_sigma.row,
                "PSF width along rows"
            )?;
            line!(
                "                          {:.3} px",
                self.psf_sigma.col,
                "PSF width along columns"
            )?;

            writeln!(f, "\n[Candidate grid]")?;
            line!(
                "min_speed               = {:.3} px/d",
                self.min_speed,
                "Slowest candidate"
            )?;
            line!(
                "max_speed               = {:.3} px/d",
                self.max_speed,
                "Fastest candidate"
            )?;

            writeln!(f, "\n[Ranking]")?;
            line!(
                "num_results             = {}",
                self.num_results,
                "Distinct detections returned"
            )?;
            line!(
                "min_separation          = {:.3} px",
                self.min_separation(),
                "Duplicate radius at start and end"
            )?;
            line!(
                "scoreboard_oversampling = {}",
                self.scoreboard_oversampling,
                "Slots per PSF footprint per result"
            )?;
            line!(
                "scoreboard_capacity     = {}",
                self.scoreboard_capacity(),
                "Derived, per partition"
            )?;

            writeln!(f, "\n[Execution]")?;
            line!("workers                 = {}", self.workers(), "Row partitions")?;
            match &self.region {
                Some(r) => line!(
                    "region                  = {}",
                    format!("rows {:?} x cols {:?}", r.rows, r.cols),
                    "Starting pixels scanned"
                )?,
                None => line!("region                  = {}", "full frame", "Starting pixels scanned")?,
            }

            Ok(())
        } else {
            write!(
                f,
                "SearchParams(psf=({:.2},{:.2})px, speed∈[{:.2},{:.2}]px/d, num_results={}, min_sep={:.2}px, capacity={}, workers={})",
                self.psf_sigma.row,
                self.psf_sigma.col,
                self.min_speed,
                self.max_speed,
                self.num_results,
                self.min_separation(),
                self.scoreboard_capacity(),
                self.workers(),
            )
        }
    }
}

#[cfg(test)]
mod params_test {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SearchParams::default();
        assert_eq!(params.min_separation(), 1.0);
        assert_eq!(params.scoreboard_capacity(), 4 * 10 * 5);
        assert!(params.workers() >= 1);
        assert_eq!(SearchParams::builder().build().unwrap(), params);
    }

    #[test]
    fn test_builder_overrides() {
        let params = SearchParams::builder()
            .psf_sigma(PsfSigma::new(1.0, 2.0))
            .speed_range(0.5, 4.0)
            .num_results(3)
            .workers(2)
            .region(SearchRegion::new(0..10, 5..15))
            .build()
            .unwrap();
        assert_eq!(params.min_separation(), 2.0);
        assert_eq!(params.workers(), 2);
        assert_eq!(params.region.as_ref().map(|r| r.num_pixels()), Some(100));
    }

    #[test]
    fn test_validation() {
        let b = SearchParams::builder;
        assert!(b().psf_sigma(0.0).build().is_err());
        assert!(b().psf_sigma(f64::NAN).build().is_err());
        assert!(b().speed_range(3.0, 2.0).build().is_err());
        assert!(b().min_speed(-1.0).build().is_err());
        assert!(b().max_speed(0.0).build().is_err());
        assert!(b().max_speed(f64::INFINITY).build().is_err());
        assert!(b().num_results(0).build().is_err());
        assert!(b().scoreboard_oversampling(0).build().is_err());
        assert!(b().num_results(usize::MAX / 2).build().is_err());
        assert!(b().num_results(usize::MAX).scoreboard_oversampling(1).build().is_err());
        assert!(b().min_separation(-0.1).build().is_err());
        assert!(b().workers(0).build().is_err());
        assert!(b().region(SearchRegion::new(3..3, 0..4)).build().is_err());
    }

    #[test]
    fn test_display() {
        let params = SearchParams::default();
        let compact = format!("{params}");
        assert!(compact.starts_with("SearchParams(psf=(1.00,1.00)px"));

        let table = format!("{params:#}");
        assert!(table.contains("[Candidate grid]"));
        assert!(table.contains("scoreboard_capacity     = 200"));
        assert!(table.contains("full frame"));
    }
}
