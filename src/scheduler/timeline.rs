// Timeline scheduler - Walks the global time grid and drives every storm
// One sequential pass per grid instant; the sink sees ticks in ascending order

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

use crate::lifecycle::{Cyclone, DegenerateRangeError, IntensityRange, LifecycleSettings, LifecycleState};
use crate::render::DrawInstruction;
use crate::tracks::{default_step, CycloneSeries, DatabaseError, Field, TrackDatabase};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Intensity range error: {0}")]
    DegenerateRange(#[from] DegenerateRangeError),

    #[error("fade increment must be in (0, 1], got {0}")]
    InvalidFadeIncrement(f64),
}

/// Grid spacing and per-storm drawing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSettings {
    pub step: TimeDelta,
    pub lifecycle: LifecycleSettings,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            step: default_step(),
            lifecycle: LifecycleSettings::default(),
        }
    }
}

/// Everything that happened on one grid instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// Position of the instant in the grid
    pub index: usize,
    pub instant: NaiveDateTime,
    /// Fade/clear instructions of ended storms first, then new and updated tracks
    pub instructions: Vec<DrawInstruction>,
}

impl Tick {
    /// Date annotation shown on the frame (`YYYY-MM-DD`)
    pub fn date_label(&self) -> String {
        self.instant.format("%Y-%m-%d").to_string()
    }
}

/// A storm whose first record lands on a grid instant
#[derive(Debug, Clone, Copy)]
pub struct Onset<'a> {
    pub tick: usize,
    pub instant: NaiveDateTime,
    pub series: &'a CycloneSeries,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: usize,
    pub activated: usize,
    pub removed: usize,
    /// Storms still fading when the grid ran out
    pub fading_at_end: usize,
    /// Storms whose first record never fell on a grid instant
    pub never_activated: usize,
}

/// Drives storm lifecycles over a database's time grid
pub struct Scheduler<'a> {
    database: &'a TrackDatabase,
    wind_range: IntensityRange,
    settings: ScheduleSettings,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        database: &'a TrackDatabase,
        wind_range: IntensityRange,
        settings: ScheduleSettings,
    ) -> Self {
        Scheduler {
            database,
            wind_range,
            settings,
        }
    }

    /// Scheduler normalizing against the database's own wind range
    pub fn for_database(
        database: &'a TrackDatabase,
        settings: ScheduleSettings,
    ) -> Result<Self, ScheduleError> {
        let wind_range = IntensityRange::from_database(database, Field::MaxWind)?;
        Ok(Scheduler::new(database, wind_range, settings))
    }

    pub fn wind_range(&self) -> IntensityRange {
        self.wind_range
    }

    /// The global time grid
    pub fn grid(&self) -> Result<Vec<NaiveDateTime>, ScheduleError> {
        Ok(self.database.time_grid(self.settings.step)?)
    }

    /// Storms in starting order, paired with the grid tick they start on
    ///
    /// Storms starting between grid instants are left out.
    pub fn onsets(&self) -> Result<Vec<Onset<'a>>, ScheduleError> {
        let grid = self.grid()?;
        let mut queue = self.starting_order();
        let mut onsets = Vec::new();

        for (tick, instant) in grid.iter().copied().enumerate() {
            while let Some(series) = queue.front().copied() {
                match series.first_instant() {
                    Some(first) if first < instant => {
                        queue.pop_front();
                    }
                    Some(first) if first == instant => {
                        queue.pop_front();
                        onsets.push(Onset { tick, instant, series });
                    }
                    _ => break,
                }
            }
        }
        Ok(onsets)
    }

    /// Run the full grid, calling `on_tick` once per instant
    ///
    /// Within a tick, storms that ended before the instant start fading and
    /// every fading storm decays (and is dropped once removed) before new
    /// storms are activated and active storms advance. The wind range is
    /// checked up front so a degenerate range fails before the first tick.
    pub fn run<F, E>(&self, mut on_tick: F) -> Result<RunSummary, E>
    where
        F: FnMut(&Tick) -> Result<(), E>,
        E: From<ScheduleError>,
    {
        self.wind_range.validate().map_err(ScheduleError::from)?;
        let fade_increment = self.settings.lifecycle.fade_increment;
        if !LifecycleSettings::is_valid_fade_increment(fade_increment) {
            return Err(ScheduleError::InvalidFadeIncrement(fade_increment).into());
        }
        let grid = self.grid()?;
        log::info!(
            "Scheduling {} storms over {} grid instants",
            self.database.len(),
            grid.len()
        );

        let mut pending: VecDeque<Cyclone<'a>> = self
            .starting_order()
            .into_iter()
            .map(|series| Cyclone::new(series, self.wind_range, self.settings.lifecycle))
            .collect();
        let mut active: Vec<Cyclone<'a>> = Vec::new();
        let mut fading: Vec<Cyclone<'a>> = Vec::new();
        let mut summary = RunSummary::default();

        for (index, instant) in grid.iter().copied().enumerate() {
            let mut instructions = Vec::new();

            // Ended storms move over to the fading set
            let (ended, still_active): (Vec<_>, Vec<_>) =
                active.drain(..).partition(|c| c.has_ended_by(instant));
            active = still_active;
            for mut cyclone in ended {
                cyclone.begin_fading();
                fading.push(cyclone);
            }

            for cyclone in fading.iter_mut() {
                if let Some(instruction) = cyclone.advance(instant).map_err(ScheduleError::from)? {
                    instructions.push(instruction);
                }
            }
            let before = fading.len();
            fading.retain(|c| c.state() != LifecycleState::Removed);
            summary.removed += before - fading.len();

            // Activate storms starting now; anything earlier missed the grid
            while let Some(first) = pending.front().and_then(|c| c.series().first_instant()) {
                if first > instant {
                    break;
                }
                let Some(mut cyclone) = pending.pop_front() else {
                    break;
                };
                if first < instant {
                    log::warn!(
                        "{} starts at {} which is not on the time grid; it will not be drawn",
                        cyclone.id(),
                        first
                    );
                    summary.never_activated += 1;
                    continue;
                }
                cyclone.activate();
                summary.activated += 1;
                active.push(cyclone);
            }

            for cyclone in active.iter_mut() {
                if let Some(instruction) = cyclone.advance(instant).map_err(ScheduleError::from)? {
                    instructions.push(instruction);
                }
            }

            on_tick(&Tick {
                index,
                instant,
                instructions,
            })?;
            summary.ticks += 1;
        }

        summary.never_activated += pending.len();
        summary.fading_at_end = fading.len();
        log::info!(
            "Schedule finished: {} ticks, {} activated, {} removed, {} still fading",
            summary.ticks,
            summary.activated,
            summary.removed,
            summary.fading_at_end
        );
        Ok(summary)
    }

    /// Series ordered by first timestamp, ties kept in database order
    fn starting_order(&self) -> VecDeque<&'a CycloneSeries> {
        let mut order: Vec<&'a CycloneSeries> = self.database.iter().collect();
        order.sort_by_key(|series| series.first_instant());
        order.into()
    }
}

/// Run a database over its own time grid with the given settings
pub fn run<F, E>(database: &TrackDatabase, settings: ScheduleSettings, on_tick: F) -> Result<RunSummary, E>
where
    F: FnMut(&Tick) -> Result<(), E>,
    E: From<ScheduleError>,
{
    Scheduler::for_database(database, settings)?.run(on_tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    // A spans t0..t1, B spans t1..t2
    const TWO_STORMS: &str = "\
A, 2
20050825, 0000, 25.0, -80.0, 40.0
20050825, 0600, 25.5, -80.5, 60.0
B, 2
20050825, 0600, 20.0, -70.0, 80.0
20050825, 1200, 20.5, -70.5, 100.0
";

    fn collect(db: &TrackDatabase, settings: ScheduleSettings) -> (Vec<Tick>, RunSummary) {
        let mut ticks = Vec::new();
        let summary = run::<_, ScheduleError>(db, settings, |tick| {
            ticks.push(tick.clone());
            Ok(())
        })
        .unwrap();
        (ticks, summary)
    }

    fn kinds_for(tick: &Tick, id: &str) -> Vec<&'static str> {
        tick.instructions
            .iter()
            .filter(|i| i.id() == id)
            .map(DrawInstruction::kind)
            .collect()
    }

    #[test]
    fn test_two_storm_scenario() {
        let db = TrackDatabase::parse(TWO_STORMS).unwrap();
        let (ticks, summary) = collect(&db, ScheduleSettings::default());

        assert_eq!(ticks.len(), 3);
        assert_eq!(kinds_for(&ticks[0], "A"), vec!["NEW_TRACK"]);
        assert!(kinds_for(&ticks[0], "B").is_empty());

        assert_eq!(kinds_for(&ticks[1], "A"), vec!["UPDATE_TRACK"]);
        assert_eq!(kinds_for(&ticks[1], "B"), vec!["NEW_TRACK"]);

        // A's last record is t1, so it starts fading on the next instant
        assert_eq!(kinds_for(&ticks[2], "A"), vec!["FADE_TRACK"]);
        assert_eq!(kinds_for(&ticks[2], "B"), vec!["UPDATE_TRACK"]);

        let new_tracks: Vec<&str> = ticks
            .iter()
            .flat_map(|t| t.instructions.iter())
            .filter(|i| i.kind() == "NEW_TRACK")
            .map(DrawInstruction::id)
            .collect();
        assert_eq!(new_tracks, vec!["A", "B"]);

        assert_eq!(summary.activated, 2);
        assert_eq!(summary.fading_at_end, 1);
    }

    #[test]
    fn test_fade_runs_before_new_tracks_within_a_tick() {
        let source = "\
A, 1
20050825, 0000, 25.0, -80.0, 40.0
B, 2
20050825, 0600, 20.0, -70.0, 80.0
20050825, 1200, 20.5, -70.5, 100.0
";
        let db = TrackDatabase::parse(source).unwrap();
        let (ticks, _) = collect(&db, ScheduleSettings::default());

        let kinds: Vec<&str> = ticks[1].instructions.iter().map(DrawInstruction::kind).collect();
        assert_eq!(kinds, vec!["FADE_TRACK", "NEW_TRACK"]);
    }

    #[test]
    fn test_fading_storm_is_cleared_and_purged() {
        let source = "\
A, 1
20050825, 0000, 25.0, -80.0, 40.0
B, 6
20050825, 0000, 20.0, -70.0, 80.0
20050825, 0600, 20.5, -70.5, 100.0
20050825, 1200, 21.0, -71.0, 100.0
20050825, 1800, 21.5, -71.5, 100.0
20050826, 0000, 22.0, -72.0, 100.0
20050826, 0600, 22.5, -72.5, 100.0
";
        let db = TrackDatabase::parse(source).unwrap();
        let settings = ScheduleSettings {
            lifecycle: LifecycleSettings {
                fade_increment: 0.5,
                line_width: 9.0,
            },
            ..ScheduleSettings::default()
        };
        let (ticks, summary) = collect(&db, settings);

        assert_eq!(kinds_for(&ticks[1], "A"), vec!["FADE_TRACK"]);
        assert_eq!(kinds_for(&ticks[2], "A"), vec!["CLEAR_TRACK"]);
        for tick in &ticks[3..] {
            assert!(kinds_for(tick, "A").is_empty());
        }
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.fading_at_end, 0);
    }

    #[test]
    fn test_off_grid_start_never_activates() {
        let source = "\
A, 2
20050825, 0000, 25.0, -80.0, 40.0
20050825, 1200, 25.5, -80.5, 60.0
LATE, 1
20050825, 0300, 20.0, -70.0, 80.0
";
        let db = TrackDatabase::parse(source).unwrap();
        let (ticks, summary) = collect(&db, ScheduleSettings::default());

        assert!(ticks.iter().all(|t| kinds_for(t, "LATE").is_empty()));
        assert_eq!(summary.never_activated, 1);
        assert_eq!(summary.activated, 1);
    }

    #[test]
    fn test_degenerate_range_fails_before_first_tick() {
        let db = TrackDatabase::parse("A, 2\n20050825, 0000, 25.0, -80.0, 40.0\n20050825, 0600, 25.5, -80.5, 40.0\n")
            .unwrap();
        let mut calls = 0;
        let result = run::<_, ScheduleError>(&db, ScheduleSettings::default(), |_| {
            calls += 1;
            Ok(())
        });
        assert!(matches!(result, Err(ScheduleError::DegenerateRange(_))));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_growing_fade_is_rejected_before_first_tick() {
        let db = TrackDatabase::parse(TWO_STORMS).unwrap();
        for fade_increment in [-0.5, 0.0, 2.0, f64::NAN] {
            let settings = ScheduleSettings {
                lifecycle: LifecycleSettings {
                    fade_increment,
                    line_width: 9.0,
                },
                ..ScheduleSettings::default()
            };
            let mut calls = 0;
            let result = run::<_, ScheduleError>(&db, settings, |_| {
                calls += 1;
                Ok(())
            });
            assert!(matches!(result, Err(ScheduleError::InvalidFadeIncrement(_))));
            assert_eq!(calls, 0);
        }
    }

    #[test]
    fn test_fade_alpha_never_increases() {
        let source = "\
A, 1
20050825, 0000, 25.0, -80.0, 40.0
B, 6
20050825, 0000, 20.0, -70.0, 80.0
20050825, 0600, 20.5, -70.5, 100.0
20050825, 1200, 21.0, -71.0, 100.0
20050825, 1800, 21.5, -71.5, 100.0
20050826, 0000, 22.0, -72.0, 100.0
20050826, 0600, 22.5, -72.5, 100.0
";
        let db = TrackDatabase::parse(source).unwrap();
        let (ticks, _) = collect(&db, ScheduleSettings::default());
        let alphas: Vec<f64> = ticks
            .iter()
            .flat_map(|t| t.instructions.iter())
            .filter_map(|i| match i {
                DrawInstruction::FadeTrack { alpha, .. } => Some(*alpha),
                _ => None,
            })
            .collect();

        assert_eq!(alphas.len(), 5);
        assert!(alphas.iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(alphas.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_empty_database_fails() {
        let db = TrackDatabase::new();
        let result = run::<_, ScheduleError>(&db, ScheduleSettings::default(), |_| Ok(()));
        assert!(matches!(result, Err(ScheduleError::Database(DatabaseError::Empty))));
    }

    #[test]
    fn test_ticks_are_ascending() {
        let db = TrackDatabase::parse(TWO_STORMS).unwrap();
        let (ticks, _) = collect(&db, ScheduleSettings::default());
        for pair in ticks.windows(2) {
            assert!(pair[0].instant < pair[1].instant);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
        assert_eq!(ticks[0].date_label(), "2005-08-25");
    }

    #[test]
    fn test_onsets_follow_grid() {
        let db = TrackDatabase::parse(TWO_STORMS).unwrap();
        let scheduler = Scheduler::for_database(&db, ScheduleSettings::default()).unwrap();
        let onsets = scheduler.onsets().unwrap();

        let summary: Vec<(usize, &str)> = onsets.iter().map(|o| (o.tick, o.series.id())).collect();
        assert_eq!(summary, vec![(0, "A"), (1, "B")]);
    }
}
