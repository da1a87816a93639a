//! Candidate rate enumeration.
//!
//! Two grids are provided:
//!
//! * [`enumerate_velocities`] – pixel-rate velocities covering a disk of speeds,
//!   spaced so that two candidates never end more than one PSF apart (and never
//!   closer than `2σ`) over the observation span;
//! * [`ecliptic_rate_grid`] – a rectangular grid of angular rates parallel and
//!   perpendicular to the ecliptic, consumed by
//!   [`EclipticMotion`](crate::trajectories::motion_model::EclipticMotion).
//!
//! Both are deterministic; order is insertion order.

use itertools::iproduct;
use nalgebra::{Rotation2, Vector2};
use tracing::{debug, warn};

use crate::{
    constants::{Day, Rate, DPI},
    search_errors::SearchError,
};

/// Enumerate a deduplicated set of 2-D velocities (pixels per day).
///
/// Each velocity `v` is represented by its endpoint `v · max_time`. One ring of
/// endpoints is laid out at radius `max_speed · max_time` with an angular step
/// `θ = 2σ / radius` (adjacent endpoints one `2σ` arc apart), then scaled copies
/// of that ring are produced at radii `radius·(s+1)/n_steps` for
/// `n_steps = 2·ceil(radius / 2σ)`, innermost first.
///
/// Endpoints are then filtered in insertion order:
/// * dropped when closer than `2σ` to the origin (stationary within one PSF),
/// * dropped when closer than `min_speed · max_time` to the origin,
/// * dropped when closer than `2σ` to **any** endpoint already kept.
///
/// Arguments
/// -----------------
/// * `psf_sigma`: PSF width in pixels.
/// * `min_speed`, `max_speed`: speed range in pixels per day.
/// * `max_time`: elapsed time of the last frame, in days.
///
/// Return
/// ----------
/// * The kept velocities, possibly empty when the speed range is shorter than
///   one PSF over the span, or [`SearchError::InvalidSearchParameter`].
pub fn enumerate_velocities(
    psf_sigma: f64,
    min_speed: f64,
    max_speed: f64,
    max_time: Day,
) -> Result<Vec<Rate>, SearchError> {
    let all_finite = [psf_sigma, min_speed, max_speed, max_time]
        .iter()
        .all(|x| x.is_finite());
    if !all_finite
        || psf_sigma <= 0.0
        || max_speed <= 0.0
        || max_time <= 0.0
        || min_speed < 0.0
        || min_speed > max_speed
    {
        return Err(SearchError::InvalidSearchParameter(format!(
            "velocity grid requires psf > 0, 0 <= min_speed <= max_speed, max_speed > 0 and \
             max_time > 0 (psf={psf_sigma}, speeds=[{min_speed}, {max_speed}], max_time={max_time})"
        )));
    }

    let max_radius = max_speed * max_time;
    let max_sep = 2.0 * psf_sigma;
    let min_radius = min_speed * max_time;

    let num_steps = 2 * (max_radius / max_sep).ceil() as usize;
    let theta = max_sep / max_radius;
    let num_traj = (DPI / theta).ceil() as usize;

    let rotation = Rotation2::new(theta);
    let ring: Vec<Vector2<f64>> = std::iter::successors(Some(Vector2::new(max_radius, 0.0)), |p| {
        Some(rotation * p)
    })
    .take(num_traj)
    .collect();

    let endpoints = (0..num_steps).flat_map(|step| {
        let scale = (step + 1) as f64 / num_steps as f64;
        ring.iter().map(move |p| p * scale)
    });

    let mut kept: Vec<Vector2<f64>> = Vec::new();
    for endpoint in endpoints {
        let r = endpoint.norm();
        if r < max_sep || r < min_radius {
            continue;
        }
        if kept.iter().any(|k| (k - endpoint).norm() < max_sep) {
            continue;
        }
        kept.push(endpoint);
    }

    if kept.is_empty() {
        warn!(
            max_radius,
            max_sep, "velocity grid is empty: the fastest trajectory moves less than 2 PSF widths"
        );
    } else {
        debug!(
            candidates = kept.len(),
            ring = num_traj,
            steps = num_steps,
            "enumerated velocity grid"
        );
    }

    Ok(kept.into_iter().map(|e| e / max_time).collect())
}

/// Values `min, min + step, …` up to `max` inclusive (within half a step).
fn arange_inclusive(min: f64, max: f64, step: f64) -> impl Iterator<Item = f64> {
    let n = ((max + step / 2.0 - min) / step).ceil().max(0.0) as usize;
    (0..n).map(move |i| min + i as f64 * step)
}

/// Rectangular grid of angular rates `(parallel, perpendicular)` to the
/// ecliptic, in degrees per hour, parallel-major.
///
/// Arguments
/// -----------------
/// * `parallel`: `(min, max)` rate along ecliptic longitude.
/// * `perpendicular`: `(min, max)` rate along ecliptic latitude.
/// * `step`: `(d_parallel, d_perpendicular)` grid spacing.
pub fn ecliptic_rate_grid(
    parallel: (f64, f64),
    perpendicular: (f64, f64),
    step: (f64, f64),
) -> Result<Vec<Rate>, SearchError> {
    let valid = |(lo, hi): (f64, f64), d: f64| {
        lo.is_finite() && hi.is_finite() && d.is_finite() && d > 0.0 && lo <= hi
    };
    if !valid(parallel, step.0) || !valid(perpendicular, step.1) {
        return Err(SearchError::InvalidSearchParameter(format!(
            "ecliptic grid requires min <= max and step > 0 (parallel={parallel:?}, \
             perpendicular={perpendicular:?}, step={step:?})"
        )));
    }

    let par: Vec<f64> = arange_inclusive(parallel.0, parallel.1, step.0).collect();
    let perp: Vec<f64> = arange_inclusive(perpendicular.0, perpendicular.1, step.1).collect();

    Ok(iproduct!(par, perp)
        .map(|(a, b)| Vector2::new(a, b))
        .collect())
}
