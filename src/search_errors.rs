use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Image stack is empty")]
    EmptyImageStack,

    #[error("Frame {frame}: {what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        frame: usize,
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid time series: {0}")]
    InvalidTimeSeries(String),

    #[error("Unable to parse epoch: {0}")]
    EpochParsingError(String),

    #[error("Invalid search parameter: {0}")]
    InvalidSearchParameter(String),

    #[error("Search region rows {rows:?} x cols {cols:?} exceeds image shape {shape:?}")]
    RegionOutOfBounds {
        rows: (usize, usize),
        cols: (usize, usize),
        shape: (usize, usize),
    },

    #[error("Sky projection matrix is singular (cannot be inverted)")]
    SingularProjection,

    #[error("Postage stamp centred at {center:?} with half-width {half_width:?} leaves the image in frame {frame}")]
    StampOutOfBounds {
        frame: usize,
        center: (i64, i64),
        half_width: (usize, usize),
    },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for SearchError {
    fn eq(&self, other: &Self) -> bool {
        use SearchError::*;
        match (self, other) {
            (EmptyImageStack, EmptyImageStack) => true,
            (
                ShapeMismatch {
                    frame: f1,
                    what: w1,
                    expected: e1,
                    found: x1,
                },
                ShapeMismatch {
                    frame: f2,
                    what: w2,
                    expected: e2,
                    found: x2,
                },
            ) => f1 == f2 && w1 == w2 && e1 == e2 && x1 == x2,
            (
                LengthMismatch {
                    what: w1,
                    expected: e1,
                    found: f1,
                },
                LengthMismatch {
                    what: w2,
                    expected: e2,
                    found: f2,
                },
            ) => w1 == w2 && e1 == e2 && f1 == f2,
            (InvalidTimeSeries(a), InvalidTimeSeries(b)) => a == b,
            (EpochParsingError(a), EpochParsingError(b)) => a == b,
            (InvalidSearchParameter(a), InvalidSearchParameter(b)) => a == b,
            (
                RegionOutOfBounds {
                    rows: r1,
                    cols: c1,
                    shape: s1,
                },
                RegionOutOfBounds {
                    rows: r2,
                    cols: c2,
                    shape: s2,
                },
            ) => r1 == r2 && c1 == c2 && s1 == s2,
            (SingularProjection, SingularProjection) => true,
            (
                StampOutOfBounds {
                    frame: f1,
                    center: c1,
                    half_width: h1,
                },
                StampOutOfBounds {
                    frame: f2,
                    center: c2,
                    half_width: h2,
                },
            ) => f1 == f2 && c1 == c2 && h1 == h2,

            // Wrapped errors are not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}
