//! Score ranking and spatial deduplication.
//!
//! A bright source lights up every starting pixel and every candidate rate
//! within roughly one PSF of its true trajectory, so the raw scoreboard is full
//! of near-copies of the same detection. The ranker keeps only the best of each
//! cluster: an entry is a duplicate of an accepted one when **both** its start
//! and its end positions lie within `min_separation` of that entry's.

use tracing::debug;

use crate::search::scoreboard::ScoredTrajectory;

/// Whether two trajectories are the same detection.
#[inline]
pub fn is_duplicate(a: &ScoredTrajectory, b: &ScoredTrajectory, min_separation: f64) -> bool {
    (a.start - b.start).norm() <= min_separation && (a.end - b.end).norm() <= min_separation
}

/// Sort by score and greedily keep up to `num_results` distinct detections.
///
/// Ties in score keep their input order. Each candidate is compared against
/// every entry accepted so far.
pub fn rank(
    mut entries: Vec<ScoredTrajectory>,
    num_results: usize,
    min_separation: f64,
) -> Vec<ScoredTrajectory> {
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));

    let total = entries.len();
    let mut accepted: Vec<ScoredTrajectory> = Vec::with_capacity(num_results.min(total));
    for entry in entries {
        if accepted.len() == num_results {
            break;
        }
        if accepted
            .iter()
            .any(|kept| is_duplicate(kept, &entry, min_separation))
        {
            continue;
        }
        accepted.push(entry);
    }

    debug!(
        candidates = total,
        accepted = accepted.len(),
        min_separation,
        "ranked scoreboard"
    );
    accepted
}
