// ============================================================================
// blurbrush CLI — serve mode and one-shot headless edits
// ============================================================================
//
// Usage examples:
//   blurbrush --serve
//   blurbrush --serve --addr 0.0.0.0:8080
//   blurbrush --input photo.png --mask selection.png --output result.png
//   blurbrush -i photo.jpg -m mask.png --mode inpaint -o clean.png
//
// One-shot edits run the engine in-process; no service is contacted.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::engine;
use crate::io;
use crate::protocol::TransformMode;
use crate::service::TransformServer;

/// Region blur / object removal over a brush-painted selection mask.
#[derive(Parser, Debug)]
#[command(
    name = "blurbrush",
    about = "Blur or remove a masked region of an image",
    long_about = "Run the transform service (--serve), or apply one edit headlessly:\n\
                  give an image, a single-channel mask (any pixel > 0 counts as\n\
                  selected), a mode, and a kernel size.\n\n\
                  Example:\n  \
                  blurbrush --input photo.png --mask selection.png --kernel-size 35 --output out.png"
)]
pub struct CliArgs {
    /// Run the transform service instead of a one-shot edit.
    #[arg(long)]
    pub serve: bool,

    /// Address the service binds to.
    #[arg(long, value_name = "HOST:PORT", default_value = "127.0.0.1:5000")]
    pub addr: String,

    /// Source image for a one-shot edit.
    #[arg(short, long, value_name = "IMAGE")]
    pub input: Option<PathBuf>,

    /// Selection mask, same dimensions as the image.
    #[arg(short, long, value_name = "MASK")]
    pub mask: Option<PathBuf>,

    /// Transform to run: blur or inpaint.
    #[arg(long, default_value = "blur", value_name = "MODE")]
    pub mode: String,

    /// Blur kernel width in pixels (odd; even values are bumped up by one).
    #[arg(short = 'k', long, default_value_t = 35, value_name = "PIXELS")]
    pub kernel_size: u32,

    /// Where to write the edited image. Defaults to "<stem>_out.png" next to
    /// the input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Run CLI processing and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    if args.serve {
        return serve(&args.addr);
    }
    match run_one(&args) {
        Ok(path) => {
            println!("→ {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(addr: &str) -> ExitCode {
    let server = match TransformServer::bind(addr) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    if let Ok(bound) = server.local_addr() {
        println!("listening on http://{}", bound);
    }
    match server.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: service stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_one(args: &CliArgs) -> Result<PathBuf, String> {
    let input = args
        .input
        .as_ref()
        .ok_or_else(|| "missing --input (or use --serve)".to_string())?;
    let mask_path = args
        .mask
        .as_ref()
        .ok_or_else(|| "missing --mask".to_string())?;
    let mode = TransformMode::parse(&args.mode).map_err(|e| e.to_string())?;

    let image_bytes = std::fs::read(input)
        .map_err(|e| format!("cannot read '{}': {}", input.display(), e))?;
    let mask_bytes = std::fs::read(mask_path)
        .map_err(|e| format!("cannot read '{}': {}", mask_path.display(), e))?;
    let image = io::decode_rgba(&image_bytes).map_err(|e| e.to_string())?;
    let mask = io::decode_mask(&mask_bytes).map_err(|e| e.to_string())?;

    let started = Instant::now();
    let output = engine::transform(&image, &mask, mode, args.kernel_size)
        .map_err(|e| e.to_string())?;
    println!(
        "  {} {}x{} ({:.0}ms)",
        mode.as_str(),
        output.width(),
        output.height(),
        started.elapsed().as_secs_f64() * 1000.0
    );

    let out_path = match &args.output {
        Some(p) => p.clone(),
        None => default_output_path(input),
    };
    output
        .save(&out_path)
        .map_err(|e| format!("save failed: {}", e))?;
    Ok(out_path)
}

/// "<stem>_out.png" next to the input — never silently overwrites the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("edit");
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}_out.png", stem))
}
