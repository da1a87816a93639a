//! # Constants and type definitions for shiftstack
//!
//! This module centralizes the **numeric defaults**, **conversion factors**, and **common type
//! aliases** used by the trajectory search.
//!
//! ## Overview
//!
//! - Unit conversions (days ↔ hours)
//! - Kernel and mask extents expressed in PSF widths
//! - Scoreboard sizing factors
//! - Core type aliases used across the crate
//!
//! Images are indexed `[row, col]` everywhere; positions and rates are
//! [`Vector2`](nalgebra::Vector2) values in the same `(row, col)` order.

use nalgebra::Vector2;
use ndarray::Array2;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of hours in a day
pub const HOURS_PER_DAY: f64 = 24.0;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

// -------------------------------------------------------------------------------------------------
// Search defaults
// -------------------------------------------------------------------------------------------------

/// Half-width of the 1-D Gaussian kernel, in units of sigma
pub const KERNEL_HALF_WIDTH_SIGMAS: f64 = 4.0;

/// Radius of the exclusion disc drawn around a known source, in units of sigma
pub const MASK_RADIUS_SIGMAS: f64 = 4.0;

/// Extra scoreboard slots kept per final result, on top of the PSF footprint
pub const SCOREBOARD_OVERSAMPLING: usize = 5;

/// Number of distinct detections returned by default
pub const DEFAULT_NUM_RESULTS: usize = 10;

/// Default stamp half-width, in units of sigma
pub const DEFAULT_STAMP_SCALE: f64 = 10.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Modified Julian Date (days)
pub type MJD = f64;
/// Time interval in days
pub type Day = f64;
/// Distance or coordinate in pixels
pub type Pixel = f64;
/// Angle in degrees
pub type Degree = f64;

/// A single frame: intensities, variances, psi or phi values
pub type Image = Array2<f64>;

/// A `(row, col)` pixel position
pub type PixelPosition = Vector2<Pixel>;

/// A 2-D trajectory candidate rate. Pixels per day for linear motion,
/// degrees per hour for angular-rate motion.
pub type Rate = Vector2<f64>;
