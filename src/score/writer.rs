// Score writer - RTcmix score text for the GRANSYNTH instrument
// One preamble, then one GRANSYNTH call per synthesis event

use std::io::{self, Write};

use super::events::{CycloneScore, LayerEvent, SynthesisEvent};

/// Output parameters written into the score preamble
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreHeader {
    pub audio_sample_rate: u32,
    pub channels: u32,
    /// Sound file the synthesis engine writes
    pub output_file: String,
}

impl ScoreHeader {
    pub fn new(output_file: impl Into<String>) -> Self {
        ScoreHeader {
            audio_sample_rate: 44100,
            channels: 2,
            output_file: output_file.into(),
        }
    }
}

/// Writes GRANSYNTH events to an RTcmix score
pub struct ScoreWriter<W: Write> {
    inner: W,
    events_written: usize,
    layers_written: usize,
}

impl<W: Write> ScoreWriter<W> {
    /// Start a score by writing the preamble and the shared instrument tables
    pub fn new(mut inner: W, header: &ScoreHeader) -> io::Result<Self> {
        writeln!(inner, "set_option(\"clobber = on\")")?;
        writeln!(inner, "rtsetparams({}, {})", header.audio_sample_rate, header.channels)?;
        writeln!(inner, "reset({})", header.audio_sample_rate)?;
        writeln!(inner, "load(\"GRANSYNTH\")")?;
        writeln!(inner, "rtoutput(\"{}\")", header.output_file)?;
        writeln!(inner, "amp = maketable(\"line\", 1000, 0,0, 1,1, 2,0.5, 3,1, 4,0)")?;
        writeln!(inner, "wave = maketable(\"wave\", 2000, 1, 0, 1, 0, 1, 0, 1, 0)")?;
        writeln!(inner, "granenv = maketable(\"window\", 2000, \"hanning\")")?;
        writeln!(inner, "hoptime = maketable(\"line\", \"nonorm\", 1000, 0,0.01, 1, 0.002, 2,0.05)")?;
        writeln!(inner, "hopjitter = 0.0001")?;
        writeln!(inner, "mindur = .04")?;
        writeln!(inner, "maxdur = .06")?;
        writeln!(inner, "minamp = maxamp = 1")?;
        writeln!(inner, "transpcoll = maketable(\"literal\", \"nonorm\", 0, 0, .02, .03, .05, .07, .10)")?;
        writeln!(inner, "pitchjitter = 1")?;

        Ok(ScoreWriter {
            inner,
            events_written: 0,
            layers_written: 0,
        })
    }

    /// Write a storm's base event followed by its layers
    pub fn write_cyclone(&mut self, score: &CycloneScore) -> io::Result<()> {
        self.write_base(&score.base)?;
        for layer in &score.layers {
            self.write_layer(layer, score.base.pan_left, score.base.pan_right)?;
        }
        Ok(())
    }

    pub fn write_base(&mut self, event: &SynthesisEvent) -> io::Result<()> {
        self.write_gransynth(
            event.start,
            event.duration,
            &event.pitch_table,
            event.pan_left,
            event.pan_right,
        )?;
        self.events_written += 1;
        Ok(())
    }

    pub fn write_layer(&mut self, layer: &LayerEvent, pan_left: f64, pan_right: f64) -> io::Result<()> {
        self.write_gransynth(layer.start, layer.duration, &layer.pitch_table, pan_left, pan_right)?;
        self.layers_written += 1;
        Ok(())
    }

    fn write_gransynth(
        &mut self,
        start: f64,
        duration: f64,
        pitches: &[f64],
        pan_left: f64,
        pan_right: f64,
    ) -> io::Result<()> {
        writeln!(
            self.inner,
            "GRANSYNTH({}, {}, amp*6000, wave, granenv, hoptime, hopjitter, mindur, maxdur, minamp, 0.7*maxamp, {}, transpcoll, pitchjitter, 14, {}, {})",
            start,
            duration,
            pitch_table(pitches),
            pan_left,
            pan_right
        )
    }

    pub fn events_written(&self) -> usize {
        self.events_written
    }

    pub fn layers_written(&self) -> usize {
        self.layers_written
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Inline `maketable` call interpolating `values` over their sample indices
pub fn pitch_table(values: &[f64]) -> String {
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{}, {}", i, v))
        .collect();

    if points.is_empty() {
        "maketable(\"line\", \"nonorm\", 1000)".to_string()
    } else {
        format!("maketable(\"line\", \"nonorm\", 1000, {})", points.join(", "))
    }
}
