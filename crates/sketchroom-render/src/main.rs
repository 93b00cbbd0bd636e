//! Replay a SketchRoom stroke log into a PNG.
//!
//! ```text
//! sketchroom-render <history.json> <out.png> [width height]
//! ```

use sketchroom_render::{RenderError, RenderResult, fit_size, load_history, render_history};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 2 && args.len() != 4 {
        eprintln!("usage: sketchroom-render <history.json> <out.png> [width height]");
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> RenderResult<()> {
    let text = std::fs::read_to_string(&args[0]).map_err(|e| RenderError::Io(format!("{}: {}", args[0], e)))?;
    let strokes = load_history(&text)?;

    let (width, height) = match args.get(2..4) {
        Some([w, h]) => (parse_dimension(w)?, parse_dimension(h)?),
        _ => fit_size(&strokes),
    };

    let surface = render_history(&strokes, width, height)?;
    surface.save_png(Path::new(&args[1]))?;
    log::info!("Wrote {}", args[1]);
    Ok(())
}

fn parse_dimension(value: &str) -> RenderResult<u32> {
    value
        .parse()
        .map_err(|_| RenderError::InvalidArgument(format!("dimension {:?}", value)))
}
