//! Convert pdfmarks in a PostScript file into a PDF.
//!
//! Only the pdfmark operators and `showpage` are interpreted; page content
//! is not rendered.
//!
//! Usage:
//!   cargo run --release --bin pdfmark2pdf -- input.ps output.pdf
//!   cargo run --release --bin pdfmark2pdf -- input.ps output.pdf --config pdfmark.json
//!
//! Set `RUST_LOG=debug` to see every ignored or rejected mark.

use pdfmark_oxide::pdfmark::source;
use pdfmark_oxide::{PdfmarkConfig, PdfmarkProcessor};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

struct Args {
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
}

impl Args {
    fn from_args() -> Option<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut positional = Vec::new();
        let mut config = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                },
                "--help" | "-h" => return None,
                other => positional.push(PathBuf::from(other)),
            }
            i += 1;
        }

        if positional.len() != 2 {
            return None;
        }
        let output = positional.pop()?;
        let input = positional.pop()?;
        Some(Self {
            input,
            output,
            config,
        })
    }
}

fn usage() -> ! {
    eprintln!("Usage: pdfmark2pdf <input.ps> <output.pdf> [--config <config.json>]");
    process::exit(2);
}

fn run(args: &Args) -> pdfmark_oxide::Result<()> {
    let config = match &args.config {
        Some(path) => PdfmarkConfig::from_json(&fs::read_to_string(path)?)?,
        None => PdfmarkConfig::new(),
    };
    let input = fs::read(&args.input)?;

    let start = Instant::now();
    let mut processor = PdfmarkProcessor::new(config);
    let stats = source::run(&mut processor, &input)?;
    processor.save(&args.output)?;

    println!(
        "{} → {}: {} marks, {} rejected, {} pages in {:.1}ms",
        args.input.display(),
        args.output.display(),
        stats.marks,
        stats.errors,
        stats.pages,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let Some(args) = Args::from_args() else {
        usage();
    };
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
