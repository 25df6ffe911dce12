// Cyclone lifecycle - Per-storm playback state driven by the global time grid
// Pending -> Active -> Fading -> Removed

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::range::{DegenerateRangeError, IntensityRange};
use crate::render::DrawInstruction;
use crate::tracks::{CycloneSeries, GeoPoint};

/// Fade level below which an ended storm is removed
pub const REMOVAL_THRESHOLD: f64 = 1e-2;

/// Fade only decreases while it is above this level
pub const FADE_FLOOR: f64 = 0.1;

/// Playback state of a single storm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Grid has not reached the first record yet
    Pending,

    /// Grid is inside the recorded span; positions are emitted each tick
    Active,

    /// Grid has passed the last record; the track is fading out
    Fading,

    /// Fade dropped below [`REMOVAL_THRESHOLD`]; track cleared, nothing more to draw
    Removed,
}

/// Drawing parameters shared by every storm in a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// Amount subtracted from the fade level per fading tick
    pub fade_increment: f64,

    /// Line width of track segments
    pub line_width: f64,
}

impl LifecycleSettings {
    /// A usable decay step is finite and in (0, 1]
    pub fn is_valid_fade_increment(increment: f64) -> bool {
        increment.is_finite() && increment > 0.0 && increment <= 1.0
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        LifecycleSettings {
            fade_increment: 0.005,
            line_width: 9.0,
        }
    }
}

/// Playback state for one storm, borrowing its series from the database
#[derive(Debug, Clone)]
pub struct Cyclone<'a> {
    series: &'a CycloneSeries,
    wind_range: IntensityRange,
    settings: LifecycleSettings,
    state: LifecycleState,

    /// Next record to emit
    current_index: usize,

    /// Track opacity, starts at 1.0 and never increases
    fade: f64,

    /// Positions emitted so far
    path: Vec<GeoPoint>,
}

impl<'a> Cyclone<'a> {
    pub fn new(
        series: &'a CycloneSeries,
        wind_range: IntensityRange,
        settings: LifecycleSettings,
    ) -> Self {
        Cyclone {
            series,
            wind_range,
            settings,
            state: LifecycleState::Pending,
            current_index: 0,
            fade: 1.0,
            path: Vec::new(),
        }
    }

    pub fn id(&self) -> &'a str {
        self.series.id()
    }

    pub fn series(&self) -> &'a CycloneSeries {
        self.series
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn fade(&self) -> f64 {
        self.fade
    }

    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_catastrophic(&self) -> bool {
        self.series.is_catastrophic()
    }

    /// True when the storm's first record falls on `instant`
    pub fn starts_at(&self, instant: NaiveDateTime) -> bool {
        self.series.first_instant() == Some(instant)
    }

    /// True when the storm's last record is before `instant`
    pub fn has_ended_by(&self, instant: NaiveDateTime) -> bool {
        self.series.last_instant().map_or(true, |last| last < instant)
    }

    /// Pending -> Active. Returns false from any other state.
    pub fn activate(&mut self) -> bool {
        if self.state != LifecycleState::Pending {
            return false;
        }
        self.state = LifecycleState::Active;
        true
    }

    /// Active -> Fading. Returns false from any other state.
    pub fn begin_fading(&mut self) -> bool {
        if self.state != LifecycleState::Active {
            return false;
        }
        self.state = LifecycleState::Fading;
        true
    }

    /// Intensity mapped onto [0, 1] using the run-wide range
    pub fn color_scale(&self, wind: f64) -> Result<f64, DegenerateRangeError> {
        self.wind_range.normalize(wind)
    }

    /// Step the storm to grid instant `instant`
    ///
    /// Active storms with a record at `instant` extend their path; records that
    /// fall between grid instants are skipped. Fading storms report their current
    /// opacity and then decay; the tick that drops the fade below
    /// [`REMOVAL_THRESHOLD`] clears the path and yields `ClearTrack` instead.
    pub fn advance(
        &mut self,
        instant: NaiveDateTime,
    ) -> Result<Option<DrawInstruction>, DegenerateRangeError> {
        match self.state {
            LifecycleState::Pending | LifecycleState::Removed => Ok(None),
            LifecycleState::Active => self.advance_active(instant),
            LifecycleState::Fading => Ok(Some(self.advance_fading())),
        }
    }

    fn advance_active(
        &mut self,
        instant: NaiveDateTime,
    ) -> Result<Option<DrawInstruction>, DegenerateRangeError> {
        let series: &'a CycloneSeries = self.series;
        let records = series.records();
        while let Some(record) = records.get(self.current_index) {
            if record.timestamp >= instant {
                break;
            }
            log::debug!("{}: skipping off-grid record at {}", self.id(), record.timestamp);
            self.current_index += 1;
        }

        let record = match records.get(self.current_index) {
            Some(r) if r.timestamp == instant => r,
            _ => return Ok(None),
        };

        let color_scalar = self.color_scale(record.max_wind)?;
        let to_point = record.position();
        self.current_index += 1;

        let instruction = match self.path.last().copied() {
            None => DrawInstruction::NewTrack {
                id: self.id().to_string(),
                initial_point: to_point,
            },
            Some(from_point) => DrawInstruction::UpdateTrack {
                id: self.id().to_string(),
                from_point,
                to_point,
                color_scalar,
                line_width: self.settings.line_width,
            },
        };
        self.path.push(to_point);
        Ok(Some(instruction))
    }

    fn advance_fading(&mut self) -> DrawInstruction {
        let alpha = self.fade;
        if self.fade > FADE_FLOOR {
            self.fade -= self.settings.fade_increment;
        }

        if self.fade < REMOVAL_THRESHOLD {
            self.path.clear();
            self.state = LifecycleState::Removed;
            return DrawInstruction::ClearTrack {
                id: self.id().to_string(),
            };
        }

        DrawInstruction::FadeTrack {
            id: self.id().to_string(),
            alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::TrackRecord;
    use chrono::{NaiveDate, TimeDelta};

    fn t(step: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2005, 8, 23)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::hours(6 * step)
    }

    fn series(winds: &[f64]) -> CycloneSeries {
        let records = winds
            .iter()
            .enumerate()
            .map(|(i, w)| TrackRecord::new(t(i as i64), 23.0 + i as f64, -75.0 - i as f64, *w))
            .collect();
        CycloneSeries::from_records("AL122005", records).unwrap()
    }

    fn settings(fade_increment: f64) -> LifecycleSettings {
        LifecycleSettings {
            fade_increment,
            line_width: 9.0,
        }
    }

    #[test]
    fn test_new_cyclone_is_pending() {
        let s = series(&[30.0, 40.0]);
        let cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.1));
        assert_eq!(cyclone.state(), LifecycleState::Pending);
        assert_eq!(cyclone.fade(), 1.0);
        assert!(cyclone.path().is_empty());
        assert!(cyclone.starts_at(t(0)));
        assert!(!cyclone.has_ended_by(t(1)));
        assert!(cyclone.has_ended_by(t(2)));
    }

    #[test]
    fn test_pending_advance_emits_nothing() {
        let s = series(&[30.0, 40.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.1));
        assert_eq!(cyclone.advance(t(0)).unwrap(), None);
        assert!(!cyclone.begin_fading());
    }

    #[test]
    fn test_active_emits_new_then_update() {
        let s = series(&[30.0, 80.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(30.0, 130.0), settings(0.1));
        assert!(cyclone.activate());
        assert!(!cyclone.activate());

        let first = cyclone.advance(t(0)).unwrap().unwrap();
        assert_eq!(
            first,
            DrawInstruction::NewTrack {
                id: "AL122005".to_string(),
                initial_point: GeoPoint { latitude: 23.0, longitude: -75.0 },
            }
        );

        let second = cyclone.advance(t(1)).unwrap().unwrap();
        match second {
            DrawInstruction::UpdateTrack {
                from_point,
                to_point,
                color_scalar,
                line_width,
                ..
            } => {
                assert_eq!(from_point, GeoPoint { latitude: 23.0, longitude: -75.0 });
                assert_eq!(to_point, GeoPoint { latitude: 24.0, longitude: -76.0 });
                assert_eq!(color_scalar, 0.5);
                assert_eq!(line_width, 9.0);
            }
            other => panic!("unexpected instruction: {other:?}"),
        }
        assert_eq!(cyclone.path().len(), 2);
        assert_eq!(cyclone.current_index(), 2);
    }

    #[test]
    fn test_active_skips_off_grid_records() {
        let records = vec![
            TrackRecord::new(t(0), 23.0, -75.0, 30.0),
            TrackRecord::new(t(0) + TimeDelta::hours(3), 23.2, -75.2, 35.0),
            TrackRecord::new(t(1), 23.5, -75.5, 40.0),
        ];
        let s = CycloneSeries::from_records("AL01", records).unwrap();
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.1));
        cyclone.activate();

        cyclone.advance(t(0)).unwrap();
        let update = cyclone.advance(t(1)).unwrap().unwrap();
        match update {
            DrawInstruction::UpdateTrack { to_point, .. } => {
                assert_eq!(to_point, GeoPoint { latitude: 23.5, longitude: -75.5 })
            }
            other => panic!("unexpected instruction: {other:?}"),
        }
        assert_eq!(cyclone.current_index(), 3);
    }

    #[test]
    fn test_degenerate_range_fails_active_advance() {
        let s = series(&[50.0, 50.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(50.0, 50.0), settings(0.1));
        cyclone.activate();
        assert!(cyclone.advance(t(0)).is_err());
        assert!(cyclone.path().is_empty());
    }

    #[test]
    fn test_first_fading_tick_keeps_fade_at_or_above_point_nine() {
        let s = series(&[30.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.1));
        cyclone.activate();
        cyclone.advance(t(0)).unwrap();
        assert!(cyclone.begin_fading());

        let instruction = cyclone.advance(t(1)).unwrap().unwrap();
        // Opacity is reported before the decrement is applied
        assert_eq!(
            instruction,
            DrawInstruction::FadeTrack {
                id: "AL122005".to_string(),
                alpha: 1.0,
            }
        );
        assert!(cyclone.fade() >= 0.9);
        assert_eq!(cyclone.state(), LifecycleState::Fading);
    }

    #[test]
    fn test_removed_exactly_when_fade_drops_below_threshold() {
        let s = series(&[30.0, 40.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.25));
        cyclone.activate();
        cyclone.advance(t(0)).unwrap();
        cyclone.advance(t(1)).unwrap();
        cyclone.begin_fading();

        let mut removal_tick = None;
        for tick in 1..=10 {
            let instruction = cyclone.advance(t(1 + tick)).unwrap();
            if cyclone.state() == LifecycleState::Removed {
                assert!(cyclone.fade() < REMOVAL_THRESHOLD);
                assert!(matches!(instruction, Some(DrawInstruction::ClearTrack { .. })));
                removal_tick = Some(tick);
                break;
            }
            assert!(cyclone.fade() >= REMOVAL_THRESHOLD);
            assert!(matches!(instruction, Some(DrawInstruction::FadeTrack { .. })));
        }

        // 1.0 -> 0.75 -> 0.5 -> 0.25 -> 0.0
        assert_eq!(removal_tick, Some(4));
        assert!(cyclone.path().is_empty());
        assert_eq!(cyclone.advance(t(20)).unwrap(), None);
    }

    #[test]
    fn test_fade_never_increases() {
        let s = series(&[30.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.1));
        cyclone.activate();
        cyclone.advance(t(0)).unwrap();
        cyclone.begin_fading();

        let mut previous = cyclone.fade();
        for tick in 1..=20 {
            cyclone.advance(t(tick)).unwrap();
            assert!(cyclone.fade() <= previous);
            previous = cyclone.fade();
        }
        assert_eq!(cyclone.state(), LifecycleState::Removed);
    }

    #[test]
    fn test_small_increment_settles_at_floor() {
        let s = series(&[30.0]);
        let mut cyclone = Cyclone::new(&s, IntensityRange::new(0.0, 100.0), settings(0.005));
        cyclone.activate();
        cyclone.advance(t(0)).unwrap();
        cyclone.begin_fading();

        for tick in 1..=1000 {
            cyclone.advance(t(tick)).unwrap();
        }
        // Decay stops once the fade reaches the floor, leaving a faint track
        assert_eq!(cyclone.state(), LifecycleState::Fading);
        assert!(cyclone.fade() <= FADE_FLOOR);
        assert!(cyclone.fade() > FADE_FLOOR - 0.005);
        assert_eq!(cyclone.path().len(), 1);
    }
}
