// Score events - Synthesis events derived from one cyclone's intensity series
// A base event per storm plus one layer per threshold interval of each band

use serde::{Deserialize, Serialize};

use crate::lifecycle::extract_threshold_intervals;
use crate::tracks::{CycloneSeries, Field};

/// Intensity band that adds a synthesis layer while the storm is at or above `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerBand {
    pub threshold: f64,
    /// Multiplier applied to the layer's pitch table
    pub weight: f64,
}

impl LayerBand {
    pub const fn new(threshold: f64, weight: f64) -> Self {
        LayerBand { threshold, weight }
    }
}

/// Standard tropical-cyclone wind thresholds (knots), weakest first
pub fn default_layer_bands() -> Vec<LayerBand> {
    vec![
        LayerBand::new(34.0, 0.9),
        LayerBand::new(64.0, 0.8),
        LayerBand::new(83.0, 0.7),
        LayerBand::new(96.0, 0.6),
        LayerBand::new(113.0, 0.5),
        LayerBand::new(137.0, 0.4),
    ]
}

/// Timing and pitch mapping used when scoring a storm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSettings {
    /// Grid ticks per video frame
    pub sample_rate: f64,
    /// Video frames per second
    pub fps: f64,
    pub field: Field,
    pub pitch_scale: f64,
    pub pitch_shift: f64,
    pub pan: f64,
    pub layer_bands: Vec<LayerBand>,
}

impl Default for ScoreSettings {
    fn default() -> Self {
        ScoreSettings {
            sample_rate: 10.0,
            fps: 600.0,
            field: Field::MaxWind,
            pitch_scale: 0.04,
            pitch_shift: 2.2,
            pan: 0.5,
            layer_bands: default_layer_bands(),
        }
    }
}

impl ScoreSettings {
    /// Seconds of audio covered by one grid tick
    pub fn tick_seconds(&self) -> f64 {
        1.0 / (self.sample_rate * self.fps)
    }

    /// Map a raw field value to a pitch value
    pub fn pitch(&self, raw: f64) -> f64 {
        raw * self.pitch_scale + self.pitch_shift
    }
}

/// Base event covering a storm's whole lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisEvent {
    /// Seconds from the start of the score
    pub start: f64,
    pub duration: f64,
    pub pitch_table: Vec<f64>,
    pub pan_left: f64,
    pub pan_right: f64,
}

/// Extra layer sounding while the storm stays inside one intensity band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEvent {
    pub band: LayerBand,
    pub start: f64,
    pub duration: f64,
    pub pitch_table: Vec<f64>,
}

/// All synthesis events for one storm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycloneScore {
    pub id: String,
    pub base: SynthesisEvent,
    /// Grouped by band in band order, intervals in time order within a band
    pub layers: Vec<LayerEvent>,
}

/// Build the events for a storm whose first record falls on grid tick `start_tick`
///
/// Sample `i` of the storm sounds at `start + i * tick_seconds`, so a storm
/// with a single record gets a zero-length base event.
pub fn build_cyclone_score(series: &CycloneSeries, start_tick: usize, settings: &ScoreSettings) -> CycloneScore {
    let tick_seconds = settings.tick_seconds();
    let start = start_tick as f64 * tick_seconds;
    let times: Vec<f64> = (0..series.len())
        .map(|i| start + i as f64 * tick_seconds)
        .collect();

    let duration = match (times.first(), times.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };
    let base = SynthesisEvent {
        start,
        duration,
        pitch_table: series.values(settings.field).map(|v| settings.pitch(v)).collect(),
        pan_left: settings.pan,
        pan_right: settings.pan,
    };

    let mut layers = Vec::new();
    for band in &settings.layer_bands {
        for interval in extract_threshold_intervals(series, settings.field, band.threshold) {
            let layer_start = times[interval.start];
            layers.push(LayerEvent {
                band: *band,
                start: layer_start,
                duration: times[interval.release] - layer_start,
                pitch_table: interval
                    .values
                    .iter()
                    .map(|&v| settings.pitch(v) * band.weight)
                    .collect(),
            });
        }
    }

    CycloneScore {
        id: series.id().to_string(),
        base,
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::TrackDatabase;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn series_with_winds(winds: &[f64]) -> TrackDatabase {
        let mut source = format!("AL01, {}\n", winds.len());
        for (i, wind) in winds.iter().enumerate() {
            source.push_str(&format!("200508{:02}, 0000, 25.0, -80.0, {:.1}\n", 10 + i, wind));
        }
        TrackDatabase::parse(&source).unwrap()
    }

    #[test]
    fn test_base_event_timing_and_pitch() {
        let db = series_with_winds(&[30.0, 40.0, 50.0]);
        let settings = ScoreSettings::default();
        let score = build_cyclone_score(db.event_data("AL01").unwrap(), 12, &settings);

        assert!(approx(score.base.start, 12.0 / 6000.0));
        assert!(approx(score.base.duration, 2.0 / 6000.0));
        assert_eq!(score.base.pitch_table.len(), 3);
        assert!(approx(score.base.pitch_table[0], 30.0 * 0.04 + 2.2));
        assert!(approx(score.base.pitch_table[2], 50.0 * 0.04 + 2.2));
        assert_eq!((score.base.pan_left, score.base.pan_right), (0.5, 0.5));
    }

    #[test]
    fn test_layers_per_band() {
        // 34 band: indices 1..=4 release at 5; 64 band: 2..=3 release at 4; 83 band: lone 90 dropped
        let db = series_with_winds(&[30.0, 40.0, 70.0, 90.0, 50.0, 20.0]);
        let settings = ScoreSettings::default();
        let score = build_cyclone_score(db.event_data("AL01").unwrap(), 0, &settings);

        assert_eq!(score.layers.len(), 2);

        let weak = &score.layers[0];
        assert_eq!(weak.band.threshold, 34.0);
        assert!(approx(weak.start, 1.0 / 6000.0));
        assert!(approx(weak.duration, 4.0 / 6000.0));
        assert_eq!(weak.pitch_table.len(), 4);
        assert!(approx(weak.pitch_table[0], (40.0 * 0.04 + 2.2) * 0.9));

        let hurricane = &score.layers[1];
        assert_eq!(hurricane.band.threshold, 64.0);
        assert!(approx(hurricane.start, 2.0 / 6000.0));
        assert!(approx(hurricane.duration, 2.0 / 6000.0));
        assert!(approx(hurricane.pitch_table[1], (90.0 * 0.04 + 2.2) * 0.8));
    }

    #[test]
    fn test_layer_reaching_series_end_releases_on_last_sample() {
        let db = series_with_winds(&[20.0, 40.0, 45.0, 50.0]);
        let settings = ScoreSettings {
            layer_bands: vec![LayerBand::new(34.0, 1.0)],
            ..ScoreSettings::default()
        };
        let score = build_cyclone_score(db.event_data("AL01").unwrap(), 0, &settings);

        assert_eq!(score.layers.len(), 1);
        assert!(approx(score.layers[0].duration, 2.0 / 6000.0));
        assert!(approx(score.layers[0].duration, score.base.duration - 1.0 / 6000.0));
    }

    #[test]
    fn test_single_record_storm() {
        let db = series_with_winds(&[150.0]);
        let score = build_cyclone_score(db.event_data("AL01").unwrap(), 3, &ScoreSettings::default());
        assert_eq!(score.base.duration, 0.0);
        assert!(score.layers.is_empty());
    }

    #[test]
    fn test_default_bands_ascend() {
        let bands = default_layer_bands();
        assert_eq!(bands.len(), 6);
        assert!(bands.windows(2).all(|w| w[0].threshold < w[1].threshold));
        assert!(bands.windows(2).all(|w| w[0].weight > w[1].weight));
    }
}
