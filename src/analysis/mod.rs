//! Follow-up products for a detection: its lightcurve and postage stamps.

pub mod lightcurve;
pub mod postage_stamp;

pub use lightcurve::Lightcurve;
pub use postage_stamp::{center_filter, normalize, PostageStamps, StampCutter};
