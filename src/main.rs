// Hurricanes - CLI entry point
//
// Usage:
//   hurricanes <base_name>
//
// Reads <data_dir>/<base_name>.txt, writes the frame log and score, runs the
// synthesis engine and muxes the sound into the movie. Settings come from
// hurricanes.json in the working directory when present.

use hurricanes_lib::pipeline::{self, PipelineConfig, CONFIG_FILE};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(base_name) = args.get(1) else {
        eprintln!("usage: {} <base_name>", args.first().map(String::as_str).unwrap_or("hurricanes"));
        return ExitCode::FAILURE;
    };

    let config = match PipelineConfig::load_or_default(Path::new(CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load {}: {}", CONFIG_FILE, e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(base_name, &config) {
        Ok(report) => {
            log::info!(
                "Finished {}: {} storms, {} frames, {} score events",
                report.base_name,
                report.cyclones,
                report.stages.frames_grabbed,
                report.stages.score.cyclones + report.stages.score.layers
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
