//! Concurrent search over row partitions.
//!
//! Trajectories are attached to their starting pixel, so splitting the region
//! by rows splits the search space without overlap. Each partition gets its own
//! scoreboard and ranker on the rayon pool; the partial result sets are then
//! concatenated and ranked once more.
//!
//! The first partition error aborts the whole search and is returned as is.

use rayon::prelude::*;
use tracing::{debug, info};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    constants::Rate,
    likelihood::LikelihoodStack,
    search::{
        grid_scorer::score_region, params::SearchParams, ranker::rank,
        scoreboard::ScoredTrajectory, SearchRegion,
    },
    search_errors::SearchError,
    time::TimeSeries,
    trajectories::motion_model::MotionModel,
};

/// Score `region` split into `params.workers()` row partitions and merge.
///
/// Arguments
/// -----------------
/// * `likelihood`, `times`: the precomputed stack and its epochs.
/// * `candidates`: rates tested at every starting pixel.
/// * `model`: motion model shared by every partition.
/// * `region`: full region to scan.
/// * `params`: result count, separation, scoreboard sizing and worker count.
///
/// Return
/// ----------
/// * At most `params.num_results` distinct detections, best first.
pub fn search_partitioned<M: MotionModel + ?Sized>(
    likelihood: &LikelihoodStack,
    times: &TimeSeries,
    candidates: &[Rate],
    model: &M,
    region: &SearchRegion,
    params: &SearchParams,
) -> Result<Vec<ScoredTrajectory>, SearchError> {
    region.check_within(likelihood.shape())?;

    let partitions = region.split_rows(params.workers());
    let capacity = params.scoreboard_capacity();
    let num_results = params.num_results;
    let min_separation = params.min_separation();

    info!(
        partitions = partitions.len(),
        candidates = candidates.len(),
        capacity,
        "starting partitioned scan"
    );

    #[cfg(feature = "progress")]
    let pb = {
        let pb = ProgressBar::new(partitions.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} partitions | ETA {eta_precise} | {msg}",
        ) {
            pb.set_style(style);
        }
        pb
    };

    let partials = partitions
        .par_iter()
        .enumerate()
        .map(|(index, part)| -> Result<Vec<ScoredTrajectory>, SearchError> {
            let board = score_region(likelihood, times, candidates, model, part, capacity)?;
            let ranked = rank(board.into_sorted_vec(), num_results, min_separation);
            debug!(
                partition = index,
                rows = ?part.rows,
                kept = ranked.len(),
                "partition scanned"
            );

            #[cfg(feature = "progress")]
            pb.inc(1);

            Ok(ranked)
        })
        .collect::<Result<Vec<_>, _>>();

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    let merged = rank(
        partials?.into_iter().flatten().collect(),
        num_results,
        min_separation,
    );
    info!(results = merged.len(), "merged partition results");
    Ok(merged)
}
