// Track data module
// Parses historical cyclone track files into per-storm time series

pub mod database;
pub mod record;
pub mod rmw;

pub use database::{default_step, DatabaseError, ParseError, TrackDatabase, DEFAULT_STEP_HOURS};
pub use record::{CycloneSeries, Field, GeoPoint, RecordText, TrackRecord, CATASTROPHIC_WIND};
pub use rmw::{fill_gaps, RmwError, RmwSample, RmwStorm, RmwTable};
