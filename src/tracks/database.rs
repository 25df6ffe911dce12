// Track database - Parses historical track files and answers cross-storm queries
// Keeps storms in order of first appearance; derived ranges are computed on demand

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

use super::record::{CycloneSeries, Field, RecordText, TrackRecord};

/// Spacing of the global time grid in the source data sets
pub const DEFAULT_STEP_HOURS: i64 = 6;

/// Default grid step (six hours)
pub fn default_step() -> TimeDelta {
    TimeDelta::hours(DEFAULT_STEP_HOURS)
}

/// Errors raised while reading a track file
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: malformed header {content:?}, expected `<cyclone_id>, <record_count>`")]
    MalformedHeader { line: usize, content: String },

    #[error("cyclone {cyclone_id}: record count {value:?} is not a positive integer")]
    InvalidCount { cyclone_id: String, value: String },

    #[error("cyclone {cyclone_id}: expected {expected} rows, found {found} before end of input")]
    TruncatedBlock {
        cyclone_id: String,
        expected: usize,
        found: usize,
    },

    #[error("cyclone {cyclone_id}, row {row}: expected 5 fields, found {found}")]
    MissingFields {
        cyclone_id: String,
        row: usize,
        found: usize,
    },

    #[error("cyclone {cyclone_id}, row {row}: date {value:?} is not YYYYMMDD")]
    InvalidDate {
        cyclone_id: String,
        row: usize,
        value: String,
    },

    #[error("cyclone {cyclone_id}, row {row}: time {value:?} is not HHMM")]
    InvalidTime {
        cyclone_id: String,
        row: usize,
        value: String,
    },

    #[error("cyclone {cyclone_id}, row {row}: {date} {time} is not a valid instant")]
    InvalidTimestamp {
        cyclone_id: String,
        row: usize,
        date: String,
        time: String,
    },

    #[error("cyclone {cyclone_id}, row {row}: {field} value {value:?} is not a finite number")]
    InvalidNumber {
        cyclone_id: String,
        row: usize,
        field: Field,
        value: String,
    },

    #[error("cyclone {cyclone_id}, row {row}: timestamp {timestamp} does not follow the previous row")]
    NonIncreasingTimestamp {
        cyclone_id: String,
        row: usize,
        timestamp: NaiveDateTime,
    },

    #[error("cyclone {0} appears more than once")]
    DuplicateCyclone(String),

    #[error("cyclone {0} has no records")]
    EmptySeries(String),
}

/// Errors raised by queries against a loaded database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database contains no cyclones")]
    Empty,

    #[error("time grid step must be positive, got {0}")]
    NonPositiveStep(TimeDelta),

    #[error("unknown cyclone: {0}")]
    UnknownCyclone(String),
}

/// All cyclones of one data set
#[derive(Debug, Clone, Default)]
pub struct TrackDatabase {
    /// Identifiers in order of first appearance
    cyclone_ids: Vec<String>,
    events: HashMap<String, CycloneSeries>,
}

impl TrackDatabase {
    pub fn new() -> Self {
        TrackDatabase::default()
    }

    /// Read and parse a track file from disk
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let source = fs::read_to_string(path)?;
        let database = Self::parse(&source)?;
        log::info!(
            "Loaded {}: {} cyclones, {} records",
            path.display(),
            database.len(),
            database.record_count()
        );
        Ok(database)
    }

    /// Parse the text track format
    ///
    /// Each block is a `<cyclone_id>, <record_count>` header followed by
    /// exactly `record_count` rows of `<YYYYMMDD>, <HHMM>, <lat>, <lon>, <max_wind>`.
    /// Rows are read verbatim, so a blank line inside a block is a malformed row.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let mut database = TrackDatabase::new();
        let mut lines = source.lines().enumerate();

        while let Some((line_idx, line)) = lines.next() {
            // Trailing blank lines close the file
            if line.trim().is_empty() && lines.clone().all(|(_, l)| l.trim().is_empty()) {
                break;
            }

            let (cyclone_id, count) = parse_header(line, line_idx + 1)?;
            let mut series = CycloneSeries::new(cyclone_id.clone());

            for row in 0..count {
                let (_, raw) = lines.next().ok_or_else(|| ParseError::TruncatedBlock {
                    cyclone_id: cyclone_id.clone(),
                    expected: count,
                    found: row,
                })?;
                let record = parse_row(raw, &cyclone_id, row)?;
                series.push(record, row)?;
            }

            database.insert(series)?;
        }

        Ok(database)
    }

    /// Add a fully built series
    pub fn insert(&mut self, series: CycloneSeries) -> Result<(), ParseError> {
        if series.is_empty() {
            return Err(ParseError::EmptySeries(series.id().to_string()));
        }
        if self.events.contains_key(series.id()) {
            return Err(ParseError::DuplicateCyclone(series.id().to_string()));
        }
        self.cyclone_ids.push(series.id().to_string());
        self.events.insert(series.id().to_string(), series);
        Ok(())
    }

    /// Series for a cyclone identifier
    pub fn event_data(&self, cyclone_id: &str) -> Result<&CycloneSeries, DatabaseError> {
        self.events
            .get(cyclone_id)
            .ok_or_else(|| DatabaseError::UnknownCyclone(cyclone_id.to_string()))
    }

    /// Identifiers in order of first appearance
    pub fn list_events(&self) -> &[String] {
        &self.cyclone_ids
    }

    /// Series in order of first appearance
    pub fn iter(&self) -> impl Iterator<Item = &CycloneSeries> + '_ {
        self.cyclone_ids.iter().filter_map(|id| self.events.get(id))
    }

    pub fn len(&self) -> usize {
        self.cyclone_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cyclone_ids.is_empty()
    }

    /// Total number of records across all cyclones
    pub fn record_count(&self) -> usize {
        self.iter().map(CycloneSeries::len).sum()
    }

    /// Global minimum and maximum of a column across every cyclone
    pub fn field_range(&self, field: Field) -> Result<(f64, f64), DatabaseError> {
        self.iter()
            .filter_map(|series| series.value_range(field))
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
            .ok_or(DatabaseError::Empty)
    }

    /// Earliest first timestamp and latest last timestamp
    pub fn span(&self) -> Result<(NaiveDateTime, NaiveDateTime), DatabaseError> {
        let start = self
            .iter()
            .filter_map(CycloneSeries::first_instant)
            .min()
            .ok_or(DatabaseError::Empty)?;
        let end = self
            .iter()
            .filter_map(CycloneSeries::last_instant)
            .max()
            .ok_or(DatabaseError::Empty)?;
        Ok((start, end))
    }

    /// Hours covered by the data set
    pub fn total_hours(&self) -> Result<f64, DatabaseError> {
        let (start, end) = self.span()?;
        Ok((end - start).num_minutes() as f64 / 60.0)
    }

    /// Equally spaced instants from the start of the span up to its end
    ///
    /// The grid holds `floor((end - start) / step) + 1` instants; the last one
    /// may fall short of `end` when the span is not a multiple of `step`.
    pub fn time_grid(&self, step: TimeDelta) -> Result<Vec<NaiveDateTime>, DatabaseError> {
        if step <= TimeDelta::zero() {
            return Err(DatabaseError::NonPositiveStep(step));
        }
        let (start, end) = self.span()?;

        let mut grid = Vec::new();
        let mut current = Some(start);
        while let Some(instant) = current.filter(|t| *t <= end) {
            grid.push(instant);
            current = instant.checked_add_signed(step);
        }
        Ok(grid)
    }

    /// Number of storms per starting year
    pub fn annual_frequency(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for start in self.iter().filter_map(CycloneSeries::first_instant) {
            *counts.entry(start.year()).or_insert(0) += 1;
        }
        counts
    }

    /// Write the database back out in the text track format
    pub fn write_track_file<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for series in self.iter() {
            writeln!(writer, "{}, {}", series.id(), series.len())?;
            for record in series.records() {
                writeln!(writer, "{}", format_row(record))?;
            }
        }
        Ok(())
    }

    /// Serialize to a string in the text track format
    pub fn to_track_file(&self) -> String {
        let mut out = String::new();
        for series in self.iter() {
            out.push_str(&format!("{}, {}\n", series.id(), series.len()));
            for record in series.records() {
                out.push_str(&format_row(record));
                out.push('\n');
            }
        }
        out
    }
}

/// Split a header line into identifier and record count
fn parse_header(line: &str, line_no: usize) -> Result<(String, usize), ParseError> {
    let parts: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    let (cyclone_id, count) = match parts.as_slice() {
        [id, count] if !id.is_empty() => (id.to_string(), *count),
        _ => {
            return Err(ParseError::MalformedHeader {
                line: line_no,
                content: line.to_string(),
            })
        }
    };

    match count.parse::<usize>() {
        Ok(n) if n > 0 => Ok((cyclone_id, n)),
        _ => Err(ParseError::InvalidCount {
            cyclone_id,
            value: count.to_string(),
        }),
    }
}

/// Parse one data row of a cyclone block
fn parse_row(raw: &str, cyclone_id: &str, row: usize) -> Result<TrackRecord, ParseError> {
    let fields: Vec<&str> = raw.trim().split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(ParseError::MissingFields {
            cyclone_id: cyclone_id.to_string(),
            row,
            found: fields.len(),
        });
    }

    let (date, time) = (fields[0], fields[1]);
    if !is_digits(date, 8) {
        return Err(ParseError::InvalidDate {
            cyclone_id: cyclone_id.to_string(),
            row,
            value: date.to_string(),
        });
    }
    if !is_digits(time, 4) {
        return Err(ParseError::InvalidTime {
            cyclone_id: cyclone_id.to_string(),
            row,
            value: time.to_string(),
        });
    }

    let timestamp = combine_date_time(date, time).ok_or_else(|| ParseError::InvalidTimestamp {
        cyclone_id: cyclone_id.to_string(),
        row,
        date: date.to_string(),
        time: time.to_string(),
    })?;

    let number = |field: Field, value: &str| -> Result<f64, ParseError> {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::InvalidNumber {
                cyclone_id: cyclone_id.to_string(),
                row,
                field,
                value: value.to_string(),
            })
    };

    let record = TrackRecord::new(
        timestamp,
        number(Field::Latitude, fields[2])?,
        number(Field::Longitude, fields[3])?,
        number(Field::MaxWind, fields[4])?,
    );
    Ok(record.with_text(RecordText {
        latitude: fields[2].to_string(),
        longitude: fields[3].to_string(),
        max_wind: fields[4].to_string(),
    }))
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYYMMDD` + `HHMM` -> `YYYY-MM-DD HH:MM:00`
fn combine_date_time(date: &str, time: &str) -> Option<NaiveDateTime> {
    let year = date[0..4].parse().ok()?;
    let month = date[4..6].parse().ok()?;
    let day = date[6..8].parse().ok()?;
    let hour = time[0..2].parse().ok()?;
    let minute = time[2..4].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(NaiveDateTime::new(date, time))
}

/// One data row, using the source text when the record was parsed from a file
fn format_row(record: &TrackRecord) -> String {
    let date = record.timestamp.format("%Y%m%d");
    let time = record.timestamp.format("%H%M");
    match &record.text {
        Some(text) => format!(
            "{}, {}, {}, {}, {}",
            date, time, text.latitude, text.longitude, text.max_wind
        ),
        None => format!(
            "{}, {}, {}, {}, {}",
            date,
            time,
            format_value(record.latitude),
            format_value(record.longitude),
            format_value(record.max_wind)
        ),
    }
}

/// Shortest decimal that parses back to the same value, always with a fraction
fn format_value(value: f64) -> String {
    format!("{:?}", value)
}
