//! Bounded top-K scoreboard.
//!
//! A scan produces one score per `(start pixel, candidate)` pair, which is far
//! too many to keep. The [`Scoreboard`] holds at most `capacity` of them in a
//! binary heap whose top is always the current *worst* entry, so deciding
//! whether a new score gets in and evicting the loser are both `O(log K)`.
//!
//! Ordering rules
//! -----------------
//! * While not full, every offered entry is kept.
//! * Once full, an entry is kept only if its score is **strictly** greater than
//!   the current minimum; equal scores never evict.
//! * Among entries with the same score, the most recently inserted one is the
//!   worst, so the first-seen entry survives. This makes the final content a
//!   pure function of the scan order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::{
    constants::{PixelPosition, Rate},
    likelihood::PsfSigma,
    search_errors::SearchError,
};

/// Heap slots reserved up front; larger boards grow on demand.
const MAX_PREALLOCATED: usize = 1 << 16;

/// One evaluated trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTrajectory {
    /// Starting pixel `(row, col)` at the first frame.
    pub start: PixelPosition,
    /// Candidate rate (pixels/day, or degrees/hour for angular-rate models).
    pub rate: Rate,
    /// Pixel position at the last frame, from the motion model used to score it.
    pub end: PixelPosition,
    /// Signal-to-noise `psi / sqrt(phi)` summed along the trajectory.
    pub score: f64,
    /// Best-fit flux `psi / phi`.
    pub flux: f64,
    /// Number of frames that contributed (in bounds, finite, unmasked).
    pub valid_frames: usize,
}

/// Heap slot: a trajectory plus its insertion rank.
#[derive(Debug)]
struct Slot {
    trajectory: ScoredTrajectory,
    seq: u64,
}

// Max-heap on "badness": the lowest score is the greatest element, and among
// equal scores the latest insertion is the greatest.
impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(other.trajectory.score)
            .cmp(&OrderedFloat(self.trajectory.score))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Slot {}

/// Fixed-capacity collection of the best scores seen so far.
#[derive(Debug)]
pub struct Scoreboard {
    heap: BinaryHeap<Slot>,
    capacity: usize,
    next_seq: u64,
}

impl Scoreboard {
    /// Return
    /// ----------
    /// * An empty scoreboard, or [`SearchError::InvalidSearchParameter`] if `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self, SearchError> {
        if capacity == 0 {
            return Err(SearchError::InvalidSearchParameter(
                "scoreboard capacity must be >= 1".into(),
            ));
        }
        Ok(Self {
            heap: BinaryHeap::with_capacity(capacity.min(MAX_PREALLOCATED) + 1),
            capacity,
            next_seq: 0,
        })
    }

    /// Offer a trajectory; returns `true` if it was kept.
    ///
    /// Entries with a non-finite score are refused outright.
    pub fn offer(&mut self, trajectory: ScoredTrajectory) -> bool {
        if !trajectory.score.is_finite() {
            return false;
        }

        if self.heap.len() < self.capacity {
            self.push(trajectory);
            return true;
        }

        match self.heap.peek() {
            Some(worst) if trajectory.score > worst.trajectory.score => {
                self.heap.pop();
                self.push(trajectory);
                true
            }
            _ => false,
        }
    }

    fn push(&mut self, trajectory: ScoredTrajectory) {
        self.heap.push(Slot {
            trajectory,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Lowest score currently held.
    pub fn min_score(&self) -> Option<f64> {
        self.heap.peek().map(|s| s.trajectory.score)
    }

    /// Drain into a vector sorted by score descending, ties in insertion order.
    pub fn into_sorted_vec(self) -> Vec<ScoredTrajectory> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|s| s.trajectory)
            .collect()
    }
}

/// Scoreboard size for a search: `ceil(π·σ²) · num_results · oversampling`.
///
/// A single bright source lights up roughly one PSF footprint of starting
/// pixels; the board must hold that many near-duplicates per requested result
/// before deduplication can pick the distinct ones. `None` on overflow.
pub fn checked_scoreboard_capacity(
    psf: PsfSigma,
    num_results: usize,
    oversampling: usize,
) -> Option<usize> {
    let area = (std::f64::consts::PI * psf.row * psf.col).ceil() as usize;
    area.max(1)
        .checked_mul(num_results)?
        .checked_mul(oversampling)
}

/// [`checked_scoreboard_capacity`], saturating at `usize::MAX`.
pub fn scoreboard_capacity(psf: PsfSigma, num_results: usize, oversampling: usize) -> usize {
    checked_scoreboard_capacity(psf, num_results, oversampling).unwrap_or(usize::MAX)
}
