//! pdf2text - extract plain text from PDF files.

use anyhow::Context;
use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tinta_core::parse_document_bytes;

/// Extract plain text from PDF files.
#[derive(Parser, Debug)]
#[command(name = "pdf2text")]
#[command(version, about, long_about = None)]
struct Args {
    /// One or more paths to PDF files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// The password to use for decrypting the PDF file
    #[arg(short = 'P', long, default_value = "")]
    password: String,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug {
            tracing::level_filters::LevelFilter::DEBUG
        } else {
            tracing::level_filters::LevelFilter::WARN
        })
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for path in &args.files {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        // Safety: the mapped file must not be modified while in use.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .with_context(|| format!("mapping {}", path.display()))?;

        let doc = parse_document_bytes(bytes::Bytes::from_owner(mmap), &args.password)
            .with_context(|| format!("parsing {}", path.display()))?;

        for fragment in doc.extract_text()? {
            writeln!(out, "{}", fragment)?;
        }
    }

    out.flush()?;
    Ok(())
}
