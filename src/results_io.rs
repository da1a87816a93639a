//! CSV persistence of search results.
//!
//! One row per detection, columns:
//!
//! ```text
//! lh,flux,x,y,vx,vy,num_obs,x_end,y_end
//! ```
//!
//! `lh` is the score, `flux` the best-fit flux, `(x, y)` the starting pixel
//! `(row, col)`, `(vx, vy)` the rate and `num_obs` the number of frames that
//! contributed. The end position closes the row so that a reloaded result can
//! be deduplicated again without knowing the motion model.

use std::fs::File;
use std::io::{Read, Write};

use camino::Utf8Path;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{search::ScoredTrajectory, search_errors::SearchError};

/// Flat CSV row of a [`ScoredTrajectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub lh: f64,
    pub flux: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub num_obs: usize,
    pub x_end: f64,
    pub y_end: f64,
}

impl From<&ScoredTrajectory> for ResultRecord {
    fn from(t: &ScoredTrajectory) -> Self {
        Self {
            lh: t.score,
            flux: t.flux,
            x: t.start.x,
            y: t.start.y,
            vx: t.rate.x,
            vy: t.rate.y,
            num_obs: t.valid_frames,
            x_end: t.end.x,
            y_end: t.end.y,
        }
    }
}

impl From<ResultRecord> for ScoredTrajectory {
    fn from(r: ResultRecord) -> Self {
        Self {
            start: Vector2::new(r.x, r.y),
            rate: Vector2::new(r.vx, r.vy),
            end: Vector2::new(r.x_end, r.y_end),
            score: r.lh,
            flux: r.flux,
            valid_frames: r.num_obs,
        }
    }
}

/// Write `results` as CSV (with header) to any writer.
pub fn write_results<W: Write>(writer: W, results: &[ScoredTrajectory]) -> Result<(), SearchError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for r in results {
        csv_writer.serialize(ResultRecord::from(r))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read results written by [`write_results`].
pub fn read_results<R: Read>(reader: R) -> Result<Vec<ScoredTrajectory>, SearchError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize::<ResultRecord>()
        .map(|rec| rec.map(ScoredTrajectory::from).map_err(SearchError::from))
        .collect()
}

pub fn save_results(path: &Utf8Path, results: &[ScoredTrajectory]) -> Result<(), SearchError> {
    write_results(File::create(path)?, results)
}

pub fn load_results(path: &Utf8Path) -> Result<Vec<ScoredTrajectory>, SearchError> {
    read_results(File::open(path)?)
}
