//! Position-at-time models for trajectory candidates.
//!
//! The grid scorer does not care how a candidate moves, only where it is at
//! each frame. A [`MotionModel`] turns `(start pixel, candidate rate, elapsed
//! time)` into a pixel position:
//!
//! * [`LinearMotion`] – constant pixel rate, `start + rate · Δt`;
//! * [`EclipticMotion`] – constant angular rate along ecliptic longitude and
//!   latitude, projected back to pixels through a [`SkyProjection`].
//!
//! Real WCS and ecliptic-frame transforms live outside this crate; they plug in
//! by implementing [`SkyProjection`]. [`LinearSkyProjection`] is a first-order
//! (CD-matrix) projection good enough for small fields and for tests.

use nalgebra::{Matrix2, Vector2};

use crate::{
    constants::{Day, Degree, PixelPosition, Rate, HOURS_PER_DAY},
    search_errors::SearchError,
};

/// Produce the pixel position of a candidate trajectory at a given elapsed time.
pub trait MotionModel: Sync {
    fn position_at(&self, start: &PixelPosition, rate: &Rate, elapsed: Day) -> PixelPosition;

    /// Fill `out` with the positions at every elapsed time (cleared first).
    ///
    /// Models with an expensive per-start setup override this to do it once
    /// per trajectory instead of once per frame.
    fn trajectory(
        &self,
        start: &PixelPosition,
        rate: &Rate,
        elapsed: &[Day],
        out: &mut Vec<PixelPosition>,
    ) {
        out.clear();
        out.extend(elapsed.iter().map(|&t| self.position_at(start, rate, t)));
    }
}

/// Constant pixel-rate motion, rates in pixels per day.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearMotion;

impl MotionModel for LinearMotion {
    #[inline]
    fn position_at(&self, start: &PixelPosition, rate: &Rate, elapsed: Day) -> PixelPosition {
        start + rate * elapsed
    }
}

/// Pixel ↔ sky mapping, sky coordinates as `(longitude, latitude)` in degrees.
pub trait SkyProjection: Sync {
    fn pixel_to_sky(&self, pixel: &PixelPosition) -> Vector2<Degree>;
    fn sky_to_pixel(&self, sky: &Vector2<Degree>) -> PixelPosition;
}

/// First-order projection: `sky = ref_sky + CD · (pixel - ref_pixel)`.
///
/// No wrap-around of longitude is handled; keep fields away from 0°/360°.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSkyProjection {
    ref_pixel: PixelPosition,
    ref_sky: Vector2<Degree>,
    cd: Matrix2<f64>,
    cd_inv: Matrix2<f64>,
}

impl LinearSkyProjection {
    /// Arguments
    /// -----------------
    /// * `ref_pixel`: reference pixel `(row, col)`.
    /// * `ref_sky`: sky coordinates of the reference pixel, degrees.
    /// * `cd`: degrees per pixel; column 0 is the row axis, column 1 the column axis.
    ///
    /// Return
    /// ----------
    /// * [`SearchError::SingularProjection`] if `cd` cannot be inverted.
    pub fn new(
        ref_pixel: PixelPosition,
        ref_sky: Vector2<Degree>,
        cd: Matrix2<f64>,
    ) -> Result<Self, SearchError> {
        let cd_inv = cd.try_inverse().ok_or(SearchError::SingularProjection)?;
        Ok(Self {
            ref_pixel,
            ref_sky,
            cd,
            cd_inv,
        })
    }
}

impl SkyProjection for LinearSkyProjection {
    fn pixel_to_sky(&self, pixel: &PixelPosition) -> Vector2<Degree> {
        self.ref_sky + self.cd * (pixel - self.ref_pixel)
    }

    fn sky_to_pixel(&self, sky: &Vector2<Degree>) -> PixelPosition {
        self.ref_pixel + self.cd_inv * (sky - self.ref_sky)
    }
}

/// Constant angular-rate motion in an ecliptic basis.
///
/// Candidate rates are `(parallel, perpendicular)` to the ecliptic in degrees
/// per hour; elapsed times are in days.
#[derive(Debug, Clone)]
pub struct EclipticMotion<P> {
    projection: P,
}

impl<P: SkyProjection> EclipticMotion<P> {
    pub fn new(projection: P) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    #[inline]
    fn offset(start_sky: &Vector2<Degree>, rate: &Rate, elapsed: Day) -> Vector2<Degree> {
        start_sky + rate * (elapsed * HOURS_PER_DAY)
    }
}

impl<P: SkyProjection> MotionModel for EclipticMotion<P> {
    fn position_at(&self, start: &PixelPosition, rate: &Rate, elapsed: Day) -> PixelPosition {
        let start_sky = self.projection.pixel_to_sky(start);
        self.projection
            .sky_to_pixel(&Self::offset(&start_sky, rate, elapsed))
    }

    fn trajectory(
        &self,
        start: &PixelPosition,
        rate: &Rate,
        elapsed: &[Day],
        out: &mut Vec<PixelPosition>,
    ) {
        let start_sky = self.projection.pixel_to_sky(start);
        out.clear();
        out.extend(elapsed.iter().map(|&t| {
            self.projection
                .sky_to_pixel(&Self::offset(&start_sky, rate, t))
        }));
    }
}
