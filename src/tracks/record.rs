// Track records - Timestamped cyclone observations and per-cyclone series
// A series is the ordered time line of one storm, keyed by its identifier

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::database::ParseError;

/// Sustained wind (knots) above which a storm counts as catastrophic
pub const CATASTROPHIC_WIND: f64 = 137.0;

/// Numeric column of a track record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Latitude,
    Longitude,
    /// Maximum sustained wind, the intensity measure used for color and pitch
    MaxWind,
}

impl Field {
    /// Parse a column name as written in configuration files
    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "latitude" => Some(Field::Latitude),
            "longitude" => Some(Field::Longitude),
            "max_wind" => Some(Field::MaxWind),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::MaxWind => "max_wind",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A map position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Numeric columns exactly as they appeared in the track file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordText {
    pub latitude: String,
    pub longitude: String,
    pub max_wind: String,
}

/// One observation of a cyclone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Observation instant (date and time combined, seconds always zero)
    pub timestamp: NaiveDateTime,

    /// Latitude in degrees north
    pub latitude: f64,

    /// Longitude in degrees east (west is negative)
    pub longitude: f64,

    /// Maximum sustained wind in knots
    pub max_wind: f64,

    /// Source text of the numeric columns, written back verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<RecordText>,
}

impl TrackRecord {
    pub fn new(timestamp: NaiveDateTime, latitude: f64, longitude: f64, max_wind: f64) -> Self {
        TrackRecord {
            timestamp,
            latitude,
            longitude,
            max_wind,
            text: None,
        }
    }

    /// Attach the source text the values were parsed from
    pub fn with_text(mut self, text: RecordText) -> Self {
        self.text = Some(text);
        self
    }

    /// Read a numeric column by name
    pub fn value(&self, field: Field) -> f64 {
        match field {
            Field::Latitude => self.latitude,
            Field::Longitude => self.longitude,
            Field::MaxWind => self.max_wind,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Ordered observations of a single cyclone
///
/// Timestamps are strictly increasing. The series is built once during
/// parsing and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycloneSeries {
    id: String,
    records: Vec<TrackRecord>,
}

impl CycloneSeries {
    /// Create an empty series for a cyclone identifier
    pub fn new(id: impl Into<String>) -> Self {
        CycloneSeries {
            id: id.into(),
            records: Vec::new(),
        }
    }

    /// Build a series from records, rejecting out-of-order timestamps
    pub fn from_records(
        id: impl Into<String>,
        records: Vec<TrackRecord>,
    ) -> Result<Self, ParseError> {
        let mut series = CycloneSeries::new(id);
        for (row, record) in records.into_iter().enumerate() {
            series.push(record, row)?;
        }
        Ok(series)
    }

    /// Append a record; `row` is only used for error reporting
    pub(crate) fn push(&mut self, record: TrackRecord, row: usize) -> Result<(), ParseError> {
        if let Some(last) = self.records.last() {
            if record.timestamp <= last.timestamp {
                return Err(ParseError::NonIncreasingTimestamp {
                    cyclone_id: self.id.clone(),
                    row,
                    timestamp: record.timestamp,
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of samples as a float (used as a duration in ticks)
    pub fn duration(&self) -> f64 {
        self.records.len() as f64
    }

    pub fn first_instant(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_instant(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.timestamp)
    }

    /// All timestamps in order
    pub fn instants(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.records.iter().map(|r| r.timestamp)
    }

    /// Values of one column in order
    pub fn values(&self, field: Field) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(move |r| r.value(field))
    }

    /// Record observed exactly at `instant`, if any
    pub fn record_at(&self, instant: NaiveDateTime) -> Option<&TrackRecord> {
        self.records
            .binary_search_by_key(&instant, |r| r.timestamp)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Minimum and maximum of a column, `None` for an empty series
    pub fn value_range(&self, field: Field) -> Option<(f64, f64)> {
        let mut values = self.values(field);
        let first = values.next()?;
        Some(values.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }

    /// True when the storm ever exceeds [`CATASTROPHIC_WIND`]
    pub fn is_catastrophic(&self) -> bool {
        self.values(Field::MaxWind).any(|w| w > CATASTROPHIC_WIND)
    }
}
