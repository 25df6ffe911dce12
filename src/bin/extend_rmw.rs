// Extend RMW - Radius of maximum wind table from an extended best-track file
//
// Usage:
//   extend_rmw <ebtrk_file> [output.json]
//
// Missing radii are interpolated per storm; the table is written as JSON
// (default rmw_data.json).

use hurricanes_lib::tracks::RmwTable;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(input) = args.get(1) else {
        eprintln!("usage: extend_rmw <ebtrk_file> [output.json]");
        return ExitCode::FAILURE;
    };
    let output = args.get(2).map(String::as_str).unwrap_or("rmw_data.json");

    let result = RmwTable::load(Path::new(input)).and_then(|table| {
        table.save(Path::new(output))?;
        Ok(table)
    });

    match result {
        Ok(table) => {
            log::info!(
                "Wrote {} storms ({} samples) to {}",
                table.storms.len(),
                table.sample_count(),
                output
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
