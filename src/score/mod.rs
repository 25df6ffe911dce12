// Score module - Sonification of storm intensity as RTcmix granular synthesis
// Events are built per storm, not per tick

pub mod events;
pub mod sonify;
pub mod writer;

pub use events::{
    build_cyclone_score, default_layer_bands, CycloneScore, LayerBand, LayerEvent, ScoreSettings, SynthesisEvent,
};
pub use sonify::{sonify, write_score_file, ScoreError, ScoreSummary};
pub use writer::{pitch_table, ScoreHeader, ScoreWriter};
