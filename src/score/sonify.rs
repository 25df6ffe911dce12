// Sonification driver - Scores every storm that starts on the time grid
// Storm onsets come from the same grid the animation uses

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use super::events::{build_cyclone_score, ScoreSettings};
use super::writer::{ScoreHeader, ScoreWriter};
use crate::scheduler::{ScheduleError, Scheduler};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Counts reported after writing a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub cyclones: usize,
    pub layers: usize,
}

/// Write base and layer events for every storm onset, in grid order
pub fn sonify<W: Write>(
    scheduler: &Scheduler<'_>,
    settings: &ScoreSettings,
    writer: &mut ScoreWriter<W>,
) -> Result<ScoreSummary, ScoreError> {
    let mut summary = ScoreSummary::default();

    for onset in scheduler.onsets()? {
        let score = build_cyclone_score(onset.series, onset.tick, settings);
        log::debug!(
            "{} enters the score at {:.4}s with {} layers",
            score.id,
            score.base.start,
            score.layers.len()
        );
        writer.write_cyclone(&score)?;
        summary.cyclones += 1;
        summary.layers += score.layers.len();
    }

    log::info!(
        "Scored {} storms with {} intensity layers",
        summary.cyclones,
        summary.layers
    );
    Ok(summary)
}

/// Create a score file at `path`, write the preamble and every storm
pub fn write_score_file(
    path: &Path,
    header: &ScoreHeader,
    scheduler: &Scheduler<'_>,
    settings: &ScoreSettings,
) -> Result<ScoreSummary, ScoreError> {
    let file = BufWriter::new(File::create(path)?);
    let mut writer = ScoreWriter::new(file, header)?;
    let summary = sonify(scheduler, settings, &mut writer)?;
    writer.into_inner()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ScheduleSettings;
    use crate::tracks::TrackDatabase;
    use tempfile::TempDir;

    const SOURCE: &str = "\
A, 3
20050825, 0000, 25.0, -80.0, 40.0
20050825, 0600, 25.5, -80.5, 70.0
20050825, 1200, 26.0, -81.0, 75.0
B, 2
20050825, 1200, 20.0, -70.0, 20.0
20050825, 1800, 20.5, -70.5, 30.0
";

    #[test]
    fn test_sonify_scores_each_onset() {
        let db = TrackDatabase::parse(SOURCE).unwrap();
        let scheduler = Scheduler::for_database(&db, ScheduleSettings::default()).unwrap();
        let mut writer = ScoreWriter::new(Vec::new(), &ScoreHeader::new("test.wav")).unwrap();

        let summary = sonify(&scheduler, &ScoreSettings::default(), &mut writer).unwrap();

        // A: 34 band over all three samples, 64 band over the last two
        assert_eq!(summary, ScoreSummary { cyclones: 2, layers: 2 });
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let events: Vec<&str> = text.lines().filter(|l| l.starts_with("GRANSYNTH(")).collect();
        assert_eq!(events.len(), 4);
        // B starts on grid tick 2
        assert!(events[3].starts_with(&format!("GRANSYNTH({}, ", 2.0 / 6000.0)));
    }

    #[test]
    fn test_write_score_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storms.sco");
        let db = TrackDatabase::parse(SOURCE).unwrap();
        let scheduler = Scheduler::for_database(&db, ScheduleSettings::default()).unwrap();

        let summary = write_score_file(
            &path,
            &ScoreHeader::new("storms.wav"),
            &scheduler,
            &ScoreSettings::default(),
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("rtoutput(\"storms.wav\")"));
        assert_eq!(text.matches("GRANSYNTH(").count(), summary.cyclones + summary.layers);
    }
}
