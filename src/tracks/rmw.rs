// Radius of maximum wind - Reads extended best-track files and fills gaps
// Missing radii (-99) are interpolated per storm before export

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Sentinel used by the extended best-track files for unknown radii
pub const MISSING_RADIUS: i64 = -99;

#[derive(Debug, Error)]
pub enum RmwError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("line {line}: expected at least 9 fields, found {found}")]
    MissingFields { line: usize, found: usize },

    #[error("line {line}: radius {value:?} is not an integer")]
    InvalidRadius { line: usize, value: String },
}

/// One radius sample, keyed by `MMDDHH-YYYY`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmwSample {
    pub key: String,
    pub radius: f64,
}

/// Radius series for one storm, in file order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmwStorm {
    pub id: String,
    pub samples: Vec<RmwSample>,
}

/// Gap-free radius series for every storm in an extended best-track file
///
/// Storms keep the order in which they first appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RmwTable {
    pub storms: Vec<RmwStorm>,
}

impl RmwTable {
    /// Read and interpolate an extended best-track file
    pub fn load(path: &Path) -> Result<Self, RmwError> {
        let source = fs::read_to_string(path)?;
        let table = Self::parse(&source)?;
        log::info!("Read radius data for {} storms from {}", table.storms.len(), path.display());
        Ok(table)
    }

    /// Parse whitespace separated rows: storm id, name, `MMDDHH`, year, ..., radius (field 8)
    ///
    /// Reading stops at the first blank line. A key seen twice for the same storm
    /// keeps its original position and takes the later value.
    pub fn parse(source: &str) -> Result<Self, RmwError> {
        let mut raw: Vec<(String, Vec<(String, Option<f64>)>)> = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                break;
            }
            if fields.len() < 9 {
                return Err(RmwError::MissingFields {
                    line: idx + 1,
                    found: fields.len(),
                });
            }

            let radius: i64 = fields[8].parse().map_err(|_| RmwError::InvalidRadius {
                line: idx + 1,
                value: fields[8].to_string(),
            })?;
            let radius = (radius != MISSING_RADIUS).then_some(radius as f64);
            let key = format!("{}-{}", fields[2], fields[3]);

            let storm = match raw.iter().position(|(id, _)| id == fields[0]) {
                Some(pos) => pos,
                None => {
                    raw.push((fields[0].to_string(), Vec::new()));
                    raw.len() - 1
                }
            };
            let samples = &mut raw[storm].1;
            match samples.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = radius,
                None => samples.push((key, radius)),
            }
        }

        let storms = raw
            .into_iter()
            .map(|(id, samples)| {
                let values: Vec<Option<f64>> = samples.iter().map(|(_, r)| *r).collect();
                let filled = fill_gaps(&values);
                let samples = samples
                    .into_iter()
                    .zip(filled)
                    .map(|((key, _), radius)| RmwSample { key, radius })
                    .collect();
                RmwStorm { id, samples }
            })
            .collect();

        Ok(RmwTable { storms })
    }

    pub fn storm(&self, id: &str) -> Option<&RmwStorm> {
        self.storms.iter().find(|s| s.id == id)
    }

    /// Total samples across all storms
    pub fn sample_count(&self) -> usize {
        self.storms.iter().map(|s| s.samples.len()).sum()
    }

    /// Radius for a storm at a `MMDDHH-YYYY` key
    pub fn radius(&self, storm: &str, key: &str) -> Option<f64> {
        self.storm(storm)?
            .samples
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.radius)
    }

    /// Write the table as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), RmwError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Linear interpolation between known neighbours, nearest value past either end,
/// zeros when nothing is known
pub fn fill_gaps(values: &[Option<f64>]) -> Vec<f64> {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let (Some(&(first_idx, first_val)), Some(&(last_idx, last_val))) = (known.first(), known.last())
    else {
        return vec![0.0; values.len()];
    };

    let mut filled = Vec::with_capacity(values.len());
    let mut next_known = 0;
    for (i, value) in values.iter().enumerate() {
        if let Some(v) = value {
            filled.push(*v);
            continue;
        }
        if i < first_idx {
            filled.push(first_val);
        } else if i > last_idx {
            filled.push(last_val);
        } else {
            while known[next_known].0 < i {
                next_known += 1;
            }
            let (hi_idx, hi_val) = known[next_known];
            let (lo_idx, lo_val) = known[next_known - 1];
            let t = (i - lo_idx) as f64 / (hi_idx - lo_idx) as f64;
            filled.push(lo_val + (hi_val - lo_val) * t);
        }
    }
    filled
}
