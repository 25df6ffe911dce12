// Intensity normalization range
// Maps raw intensity values onto [0, 1] for color and emphasis

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tracks::{DatabaseError, Field, TrackDatabase};

/// Normalizing over a range with no width
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("cannot normalize over degenerate range [{min}, {max}]")]
pub struct DegenerateRangeError {
    pub min: f64,
    pub max: f64,
}

/// Minimum and maximum intensity used for normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityRange {
    pub min: f64,
    pub max: f64,
}

impl IntensityRange {
    pub fn new(min: f64, max: f64) -> Self {
        IntensityRange { min, max }
    }

    /// Global range of a column across a whole database
    pub fn from_database(database: &TrackDatabase, field: Field) -> Result<Self, DatabaseError> {
        let (min, max) = database.field_range(field)?;
        Ok(IntensityRange { min, max })
    }

    /// Smallest range covering both
    pub fn union(self, other: IntensityRange) -> Self {
        IntensityRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Fails unless `max > min` with both bounds finite
    pub fn validate(&self) -> Result<(), DegenerateRangeError> {
        if self.min.is_finite() && self.max.is_finite() && self.max > self.min {
            Ok(())
        } else {
            Err(DegenerateRangeError {
                min: self.min,
                max: self.max,
            })
        }
    }

    /// `(value - min) / (max - min)`
    pub fn normalize(&self, value: f64) -> Result<f64, DegenerateRangeError> {
        self.validate()?;
        Ok((value - self.min) / (self.max - self.min))
    }
}
