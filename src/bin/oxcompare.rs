//! `oxcompare compare <doc1> <doc2> [-o OUTPUT] [-a AUTHOR]`
//!
//! Compares two Office documents of the same family and writes a marked-up
//! result package plus a one-line change summary to stdout.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use oxcompare::api::{compare, CompareSettings, Family};
use oxcompare::config::{PmlSettings, SmlSettings, WmlSettings};

#[derive(Parser, Debug)]
#[command(name = "oxcompare", about = "Structural diff and revision marking for OOXML documents", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two documents of the same family (.docx, .xlsx, .pptx)
    Compare {
        /// First (old) document
        old: PathBuf,
        /// Second (new) document
        new: PathBuf,
        /// Output path for the marked-up result; defaults to `comparison-result.<ext>`
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Author name attributed to generated revisions/annotations
        #[arg(short, long, value_name = "NAME")]
        author: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(source) = e.source() {
                eprintln!("caused by: {source}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let Command::Compare { old, new, output, author } = args.command;

    if !old.is_file() {
        return Err(format!("input file does not exist: {}", old.display()).into());
    }
    if !new.is_file() {
        return Err(format!("input file does not exist: {}", new.display()).into());
    }

    let family = oxcompare::api::resolve_family(&old, &new)?;
    let settings = settings_for(family, author);
    let output = output.unwrap_or_else(|| PathBuf::from(format!("comparison-result.{}", family.default_extension())));

    let old_bytes = std::fs::read(&old)?;
    let new_bytes = std::fs::read(&new)?;

    let result = compare(&old_bytes, &new_bytes, &settings)?;
    std::fs::write(&output, &result.document)?;

    println!(
        "{} insertions, {} deletions, {} moved, {} format changes -> {}",
        result.counters.insertions,
        result.counters.deletions,
        result.counters.moved,
        result.counters.format_changes,
        output.display()
    );

    Ok(())
}

fn settings_for(family: Family, author: Option<String>) -> CompareSettings {
    match family {
        Family::Word => {
            let mut s = WmlSettings::default();
            if let Some(author) = author {
                s.author_for_revisions = author;
            }
            CompareSettings::Word(s)
        }
        Family::Excel => CompareSettings::Excel(SmlSettings::default()),
        Family::PowerPoint => {
            let mut s = PmlSettings::default();
            if let Some(author) = author {
                s.author_for_changes = author;
            }
            CompareSettings::PowerPoint(s)
        }
    }
}
