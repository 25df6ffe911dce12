// Storm lifecycle module
// Per-storm playback state, intensity normalization, and threshold intervals

pub mod cyclone;
pub mod intervals;
pub mod range;

pub use cyclone::{Cyclone, LifecycleSettings, LifecycleState, FADE_FLOOR, REMOVAL_THRESHOLD};
pub use intervals::{extract_threshold_intervals, threshold_intervals, ThresholdInterval, MIN_INTERVAL_LEN};
pub use range::{DegenerateRangeError, IntensityRange};
