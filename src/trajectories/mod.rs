//! # Trajectory candidates
//!
//! Everything that describes *how* a hypothetical object moves across the stack:
//!
//! * [`velocity_grid`] – enumeration of candidate rates (pixel-rate disk grid and
//!   ecliptic angular-rate grid);
//! * [`motion_model`] – the [`MotionModel`](motion_model::MotionModel) trait turning a
//!   `(start, rate, elapsed)` triple into a pixel position, with linear and
//!   ecliptic implementations.
//!
//! Candidates are generated once per search and shared read-only across every
//! starting pixel and every worker.

pub mod motion_model;
pub mod velocity_grid;

pub use motion_model::{EclipticMotion, LinearMotion, LinearSkyProjection, MotionModel, SkyProjection};
pub use velocity_grid::{ecliptic_rate_grid, enumerate_velocities};
