//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `kinship_core` linkage with deterministic ping/version output.
//! - Render a snapshot file: `kinship_cli <snapshot.json> [stacked|flowing]`
//!   prints the render projection as JSON.
//!
//! Setting `KINSHIP_LOG_DIR` (absolute path) enables file logging.

use kinship_core::{read_snapshot_file, render_tree, LayoutConfig, Orientation};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("KINSHIP_LOG_DIR") {
        let level = kinship_core::default_log_level();
        if let Err(err) = kinship_core::init_logging(level.as_str(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        println!("kinship_core ping={}", kinship_core::ping());
        println!("kinship_core version={}", kinship_core::core_version());
        return ExitCode::SUCCESS;
    };

    let orientation = match args.next() {
        None => Orientation::default(),
        Some(value) => match Orientation::parse(&value) {
            Some(orientation) => orientation,
            None => {
                eprintln!("unknown orientation `{value}`; expected stacked|flowing");
                return ExitCode::from(2);
            }
        },
    };

    match run(&path, orientation) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_render module=cli status=error error={err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str, orientation: Orientation) -> Result<String, Box<dyn std::error::Error>> {
    let imported = read_snapshot_file(path)?;
    let projection = render_tree(&imported.tree, orientation, &LayoutConfig::default());
    Ok(serde_json::to_string_pretty(&projection)?)
}
