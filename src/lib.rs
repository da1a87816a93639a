pub mod analysis;
pub mod constants;
pub mod image_stack;
pub mod likelihood;
pub mod results_io;
pub mod search;
pub mod search_errors;
pub mod time;
pub mod trajectories;

pub use image_stack::ImageStack;
pub use likelihood::{ExclusionMask, LikelihoodStack, PsfSigma};
pub use search::{ScoredTrajectory, SearchParams, SearchRegion, TrajectorySearch};
pub use search_errors::SearchError;
pub use time::TimeSeries;
